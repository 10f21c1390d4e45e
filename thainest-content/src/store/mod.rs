//! Content store backends

pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpStore;
pub use memory::{MemoryStore, RecordedBody, RecordedRequest};
pub use traits::ContentStore;
