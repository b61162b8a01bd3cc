//! Syncmeter - propagation latency collector for multi-cluster control planes
//!
//! This library snapshots workload resources across the three planes of a
//! KubeStellar-style deployment (workload definition, inventory/transport,
//! workload execution), persists them as tab-separated records, and
//! reconstructs a lifecycle timeline from which named latency intervals are
//! derived.

pub mod cli;
pub mod collector;
pub mod driver;
pub mod latency;
pub mod record_store;
pub mod snapshot;
pub mod work;
