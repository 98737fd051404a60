//! Configuration for relmap.
//!
//! [`DiscoveryConfig`] governs a single run; [`Settings`] loads it (plus
//! logging preferences) from a `relmap.toml` file.

mod discovery;
mod settings;

pub use discovery::{DiscoveryConfig, ThresholdBaseline};
pub use settings::{expand_env_vars, LoggingSettings, Settings};
