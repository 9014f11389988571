//! Faction AI Decision Engine for the Frontline territorial control core.
//!
//! Each AI faction owns one [`FactionStrategy`] selected by a
//! [`StrategyRegistry`] keyed on faction id. The [`FactionAiManager`]
//! drives the strategies on three independent cadences (strategic,
//! tactical, threat response), queues the resulting decisions, and applies
//! them through the state manager's single write path.
//!
//! # Modules
//!
//! - [`config`] -- AI tuning and the faction roster.
//! - [`error`] -- Error types for AI operations.
//! - [`manager`] -- [`FactionAiManager`]: cadences, queueing, execution.
//! - [`queue`] -- Bounded, deduplicating decision queue.
//! - [`strategies`] -- Built-in Expansionist, Fortress and Technocrat strategies.
//! - [`strategy`] -- The [`FactionStrategy`] trait and planning context.
//! - [`threat`] -- Threat detection over recent influence updates.

pub mod config;
pub mod error;
pub mod manager;
pub mod queue;
pub mod strategies;
pub mod strategy;
pub mod threat;

pub use config::{AiConfig, FactionProfile};
pub use error::AiError;
pub use manager::{AiTickReport, CycleReport, ExecutionReport, FactionAiManager};
pub use queue::{DecisionQueue, PushOutcome};
pub use strategies::{Expansionist, Fortress, StrategyRegistry, Technocrat, builtin};
pub use strategy::{DecisionDraft, FactionStrategy, PlanningContext, territorial_value};
pub use threat::{ThreatScan, analyze_threats};
