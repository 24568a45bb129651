//! Command implementations.

mod config;
mod inspect;
mod start;

pub use config::{run_config, ConfigArgs, ConfigCommand};
pub use inspect::{run_inspect, InspectArgs};
pub use start::{run_start, StartArgs};
