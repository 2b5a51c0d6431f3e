//! Localization front-end: ingestion queue, worker and registration cycle.

pub mod config;
pub mod pipeline;
pub mod observation;
pub mod policy;
pub mod queue;
pub mod result;
pub mod state;
pub mod worker;

pub use config::{LocalizerConfig, OverlapRange};
pub use pipeline::Localizer;
pub use observation::Observation;
pub use policy::{CompositionPolicy, PreferCloserReference, PreferNewComposition};
pub use queue::IngestionQueue;
pub use result::{LocalizationResult, LocalizerStats, TimingStats};
pub use state::LocalizerState;
pub use worker::WorkerTask;
