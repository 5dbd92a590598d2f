//! Command dispatch: bridges CLI args -> core store operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod util;
