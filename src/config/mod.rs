//! Checks runtime configuration
//!
//! Settings are read from `checks-runtime.toml` in the agent config directory.

mod settings;

pub use settings::*;
