//! Staging utilities for customer records.
//!
//! `procesar-clientes` validates the customer CSV batches and writes the
//! ones that pass into the staging directory that gets uploaded to HDFS.
//! `probe` opens a session against the warehouse and runs a few sample
//! queries to check that the tables are reachable.

pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod probe;
pub mod storage;
pub mod table;
pub mod validation;
pub mod warehouse;

pub use error::{Error, Result};
