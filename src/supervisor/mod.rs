//! Process supervisor for the node and its companion client.

mod cookie;
mod error;
mod manager;
mod readiness;

pub use cookie::*;
pub use error::*;
pub use manager::*;
pub use readiness::*;
