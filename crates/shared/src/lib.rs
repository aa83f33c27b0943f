//! Shared errors and configuration for the custody accounting core.
//!
//! This crate provides the pieces every other crate agrees on:
//! - The error taxonomy (`ErrorKind`) and the cross-crate `AppError`
//! - Configuration management

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorKind};
