//! Child process spawning and lifecycle state.

mod child;
mod state;

pub use child::*;
pub use state::*;
