//! Bounded poll-and-wait for annotation results.
//!
//! After an initial delay the table is scanned at a fixed interval until the
//! completion rule is met or the total wait (measured from before the
//! initial delay) runs out. Timing uses `tokio::time`, so tests can drive
//! it with a paused clock.

use crate::annotation::record::AnnotationRecord;
use crate::annotation::service::AnnotationService;
use crate::config::{AnnotationConfig, PollCompletion};
use crate::error::Result;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Shortest pause between scans.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timing and stop rule of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_wait: Duration,
    pub completion: PollCompletion,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&AnnotationConfig::default())
    }
}

impl From<&AnnotationConfig> for PollSettings {
    fn from(config: &AnnotationConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            interval: Duration::from_millis(config.poll_interval_ms).max(MIN_POLL_INTERVAL),
            max_wait: Duration::from_millis(config.max_wait_ms),
            completion: config.completion,
        }
    }
}

/// What the poll loop saw last.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    /// Records of the final scan (empty if none was made or all were empty).
    pub records: Vec<AnnotationRecord>,
    pub scans: usize,
    pub elapsed: Duration,
    /// True if the completion rule was met before the wait ran out.
    pub completed: bool,
}

/// Scan until the completion rule holds or `max_wait` elapses.
///
/// `expected` is the number of submitted images and `correlation_ids` their
/// ids; under [`PollCompletion::AwaitAll`] the loop waits for every id to be
/// echoed, or for `expected` usable records when the service echoes none.
pub async fn poll_for_records(
    service: &dyn AnnotationService,
    expected: usize,
    correlation_ids: &[String],
    settings: &PollSettings,
) -> Result<PollOutcome> {
    let start = Instant::now();
    sleep(settings.initial_delay).await;

    let mut records = Vec::new();
    let mut scans = 0;
    let mut completed = false;

    while start.elapsed() < settings.max_wait {
        records = service.fetch_records().await?;
        scans += 1;
        tracing::debug!("Annotation scan {} found {} records", scans, records.len());

        if is_complete(settings.completion, &records, expected, correlation_ids) {
            completed = true;
            break;
        }

        let interval = settings.interval.max(MIN_POLL_INTERVAL);
        tracing::debug!("Waiting another {:?}", interval);
        sleep(interval).await;
    }

    if !completed {
        tracing::warn!(
            "Annotation wait ended after {} scans without completion",
            scans
        );
    }

    Ok(PollOutcome {
        records,
        scans,
        elapsed: start.elapsed(),
        completed,
    })
}

fn is_complete(
    completion: PollCompletion,
    records: &[AnnotationRecord],
    expected: usize,
    correlation_ids: &[String],
) -> bool {
    match completion {
        PollCompletion::FirstNonEmpty => !records.is_empty(),
        PollCompletion::AwaitAll => {
            let echoed: HashSet<&str> = records
                .iter()
                .filter_map(|r| r.correlation_id.as_deref())
                .collect();
            if !echoed.is_empty() && !correlation_ids.is_empty() {
                correlation_ids.iter().all(|id| echoed.contains(id.as_str()))
            } else {
                records
                    .iter()
                    .filter(|r| r.parsed_timestamp().is_some())
                    .count()
                    >= expected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::mock::MockAnnotationService;
    use crate::annotation::upload::UploadItem;

    fn settings(completion: PollCompletion) -> PollSettings {
        PollSettings {
            initial_delay: Duration::from_secs(5),
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(60),
            completion,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_non_empty_stops_early() {
        let service = MockAnnotationService::new()
            .with_labels(["HAPPY"])
            .ready_after_scans(1);
        service
            .upload(&[UploadItem::jpeg(0, "AAEC".into(), "c-0")])
            .await
            .unwrap();

        let outcome = poll_for_records(&service, 1, &[], &settings(PollCompletion::FirstNonEmpty))
            .await
            .unwrap();

        assert!(outcome.completed);
        assert_eq!(outcome.scans, 2);
        assert_eq!(outcome.records.len(), 1);
        // 5s initial delay + one 10s interval
        assert_eq!(outcome.elapsed, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_table_waits_out_the_window() {
        let service = MockAnnotationService::new();
        let outcome = poll_for_records(&service, 2, &[], &settings(PollCompletion::FirstNonEmpty))
            .await
            .unwrap();

        assert!(!outcome.completed);
        assert!(outcome.records.is_empty());
        // scans at 5, 15, 25, 35, 45, 55
        assert_eq!(outcome.scans, 6);
        assert!(outcome.elapsed >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let service = MockAnnotationService::new();
        let zero = PollSettings {
            initial_delay: Duration::ZERO,
            interval: Duration::ZERO,
            max_wait: Duration::from_secs(1),
            completion: PollCompletion::FirstNonEmpty,
        };
        let outcome = poll_for_records(&service, 1, &[], &zero).await.unwrap();

        // scans at 0, 100, ..., 900 ms
        assert_eq!(outcome.scans, 10);
        assert_eq!(service.scan_count(), 10);

        let config = AnnotationConfig {
            poll_interval_ms: 0,
            ..AnnotationConfig::default()
        };
        assert_eq!(PollSettings::from(&config).interval, MIN_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_all_waits_for_every_correlation_id() {
        let service = MockAnnotationService::new()
            .with_labels(["A"])
            .echo_correlation_ids(true);
        service
            .upload(&[UploadItem::jpeg(0, "AAEC".into(), "c-0")])
            .await
            .unwrap();

        let ids = vec!["c-0".to_string(), "c-1".to_string()];
        let outcome = poll_for_records(&service, 2, &ids, &settings(PollCompletion::AwaitAll))
            .await
            .unwrap();
        // c-1 never arrives
        assert!(!outcome.completed);
        assert_eq!(outcome.records.len(), 1);

        let ids = vec!["c-0".to_string()];
        let outcome = poll_for_records(&service, 1, &ids, &settings(PollCompletion::AwaitAll))
            .await
            .unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.scans, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_all_counts_usable_records_without_ids() {
        let service = MockAnnotationService::new()
            .with_labels(["A"])
            .ready_after_scans(0);
        let batch: Vec<UploadItem> = (0..3)
            .map(|i| UploadItem::jpeg(i, "AAEC".into(), format!("c-{}", i)))
            .collect();
        service.upload(&batch[..2]).await.unwrap();

        let outcome = poll_for_records(&service, 3, &[], &settings(PollCompletion::AwaitAll))
            .await
            .unwrap();
        assert!(!outcome.completed);
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_delay_past_window_scans_nothing() {
        let service = MockAnnotationService::new().with_labels(["A"]);
        let mut s = settings(PollCompletion::FirstNonEmpty);
        s.initial_delay = Duration::from_secs(90);
        let outcome = poll_for_records(&service, 1, &[], &s).await.unwrap();
        assert_eq!(outcome.scans, 0);
        assert_eq!(service.scan_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_propagates() {
        let service = MockAnnotationService::new().failing_fetch("scan denied");
        let result =
            poll_for_records(&service, 1, &[], &settings(PollCompletion::FirstNonEmpty)).await;
        assert!(result.is_err());
    }
}
