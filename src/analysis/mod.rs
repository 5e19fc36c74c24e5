//! Analysis module for annotated datasets
//!
//! This module derives the aggregates shown by the Analytics node:
//! - Label and gender distributions
//! - Age, image quality, head pose and gaze series
//! - Facial feature counts and landmark geometry
//! - Per-record emotion breakdowns

pub mod faces;

pub use faces::{analyze, Count, FaceReport, PoseCategory};
