//! uiloc library
//!
//! Command-line front end for the locator engine, exposed for integration testing

pub mod cli;
pub mod config;

pub use config::Config;
