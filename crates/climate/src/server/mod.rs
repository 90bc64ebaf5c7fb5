//! Operator HTTP Server
//!
//! Read-only views of the climate state plus the set-point form endpoint.

mod handler;
mod protocol;
mod router;
mod state;

pub use handler::*;
pub use protocol::*;
pub use router::*;
pub use state::*;
