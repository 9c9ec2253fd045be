// Application layer - use cases around the settlement engine.
// Calculations are pure; only saving and browsing history touches storage.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
