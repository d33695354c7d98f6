//! Core library for `sturmwacht`.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather providers
//! - Storm alert classification and business advisories
//! - A time-boxed cache and the weather service built on it
//! - AI-backed API handlers with deterministic fallbacks
//!
//! It is used by `sturmwacht-cli`, but can also be mounted by other servers.

pub mod alert;
pub mod api;
pub mod assessment;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod llm;
pub mod model;
pub mod provider;
pub mod service;

pub use alert::{classify, derive_warnings};
pub use assessment::assess;
pub use cache::TtlCache;
pub use config::{Config, LlmConfig, ProviderConfig};
pub use error::{LlmError, WeatherError};
pub use model::{
    AlertLevel, BusinessAssessment, Condition, Location, Warning, WarningLevel, WeatherReading,
    WeatherReport,
};
pub use provider::{ProviderId, WeatherProvider};
pub use service::{FetchState, WeatherService};
