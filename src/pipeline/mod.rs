//! Pipeline entry points for digest operations.
//!
//! - `run`: Fetch everything, then render and send one email per recipient
//! - `fetch_digest`: Fetch everything and return the assembled context

pub mod digest;

pub use digest::{PLACES_API_KEY_VAR, RunSummary, deliver, fetch_digest, run};
