//! Docent Core Library
//!
//! This crate provides the foundational utilities shared by every Docent crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, DistanceMetric, ScoreScale};
pub use error::{AppError, AppResult};
