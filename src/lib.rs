//! Physical-design advisor library: given a catalog, a recorded
//! workload, and a cluster/cost config, searches shard key / index /
//! denormalization choices for a minimal-cost `Design`.

pub mod app;
pub mod buffer;
pub mod catalog;
pub mod config;
pub mod cost;
pub mod design;
pub mod error;
pub mod estimator;
pub mod histogram;
pub mod search;
pub mod shared;
pub mod workload;
