pub mod client;
pub mod error;
pub mod host;
pub mod protocol;
pub mod transport;

pub use client::*;
pub use error::Error;
pub use host::{HostInput, HostResult};
pub use protocol::*;
pub use transport::*;

/// Result type for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;
