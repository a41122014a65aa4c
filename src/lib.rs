// Library for the collector and renderer binaries and for tests

pub mod aggregation;
pub mod capacity_client;
pub mod collector;
pub mod config;
pub mod logging;
pub mod models;
pub mod report;
pub mod snapshot_store;
pub mod version;
