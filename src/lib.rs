//! Alga PSA Endpoint Agent - embedded Python checks runtime
//!
//! Boots one Python interpreter per agent process and bridges agent
//! capabilities into it so checks can run in-process. It provides:
//!
//! - Version selection (2 or 3) and Python home resolution
//! - Module search path injection before boot
//! - Host capability modules (`datadog_agent`, `aggregator`, `_util`,
//!   `tagger`, `containers`, `kubeutil`)
//! - Boot diagnostics and python version telemetry
//! - Idempotent teardown
//!
//! The native interpreter is reached through the [`embed::Embedding`] trait;
//! the `embedded-six` feature links the `six` library behind it.

pub mod capabilities;
pub mod config;
pub mod embed;
pub mod error;
pub mod platform;
pub mod runtime;
pub mod telemetry;

pub use error::{BridgeError, BridgeResult};
pub use runtime::{
    current, destroy, initialize, python_home, python_path, python_version, InitContext,
    RuntimeVersion,
};
