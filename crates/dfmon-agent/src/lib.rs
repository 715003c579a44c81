//! Inventory run wiring: configuration plus the per-host collection loop.

pub mod config;
pub mod run;

pub use run::{Collector, HostReport, HostStatus, RunReport};
