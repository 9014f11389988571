//! Service wiring and the background runner for the Frontline territorial
//! control core.
//!
//! # Modules
//!
//! - [`config`] -- `frontline-config.yaml` loading, env overrides, validation.
//! - [`runner`] -- Fixed-interval background timers with stop control.
//! - [`service`] -- [`Frontline`]: every component built and subscribed.

pub mod config;
pub mod runner;
pub mod service;

pub use config::{ConfigError, FrontlineConfig, LoggingConfig, ObserverConfig, WorldConfig};
pub use runner::{BackgroundTask, RunSummary, RunnerControl, run_background};
pub use service::Frontline;
