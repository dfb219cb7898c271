//! # FlexLingo Common Library
//!
//! Shared code for the FlexLingo services including:
//! - Device and model identifiers
//! - Serial port descriptors
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod device;
pub mod error;

pub use device::{DeviceId, ModelSelector, PortDescriptor, PredictionResult};
pub use error::{Error, Result};
