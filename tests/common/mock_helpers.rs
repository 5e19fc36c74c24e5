//! Mock construction helpers

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use visionflow::annotation::MockAnnotationService;
use visionflow::config::AnnotationConfig;
use visionflow::{AppConfig, FlowEngine};

/// Config with short poll timings, for tests on a paused clock
pub fn fast_config() -> AppConfig {
    AppConfig {
        annotation: AnnotationConfig {
            initial_delay_ms: 1_000,
            poll_interval_ms: 2_000,
            max_wait_ms: 10_000,
            ..AnnotationConfig::default()
        },
        ..AppConfig::default()
    }
}

/// Engine over a shared mock service, so tests can inspect the service
pub fn engine_with(service: MockAnnotationService) -> (FlowEngine, Arc<MockAnnotationService>) {
    let service = Arc::new(service);
    let engine = FlowEngine::new(fast_config(), service.clone()).expect("engine");
    (engine, service)
}

/// A tiny PNG as a `data:` URL
pub fn png_data_url(shade: u8) -> String {
    let img = RgbImage::from_pixel(3, 3, Rgb([shade, 0, 255 - shade]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    format!("data:image/png;base64,{}", STANDARD.encode(out.into_inner()))
}
