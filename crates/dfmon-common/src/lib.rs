//! Types shared by the dfmon collector, storage and agent crates.

pub mod retry;
pub mod types;
