//! Load harness for the seat reservation service.
//!
//! Many simulated users race for the same pool; every attempt is recorded and
//! classified once all of them have finished.

pub mod audit;
pub mod client;
pub mod config;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod retry;
pub mod simulator;
