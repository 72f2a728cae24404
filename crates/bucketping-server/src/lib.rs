//! Bucketping Server Library
//!
//! Cluster member discovery through a shared object store

pub mod config;
pub mod discovery;
pub mod error;
pub mod observability;
pub mod store;
pub mod version;
