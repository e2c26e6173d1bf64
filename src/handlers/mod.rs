//! Request/response channels over the supervisor.
//!
//! Each operation is a named channel on a [`ChannelRegistry`]. Handlers never
//! fail: every error is folded into a [`Response`] with `success: false` and
//! the error's message.

mod error;
mod registry;
mod response;
mod supervisor;

pub use error::*;
pub use registry::*;
pub use response::*;
pub use supervisor::*;
