//! Neptune Supervisor - lifecycle control for `neptune-core` and `neptune-cli`.

pub mod config;
pub mod handlers;
pub mod ipc;
pub mod process;
pub mod supervisor;
