//! Grey Eddington temperature structure of an atmosphere column
//!
//! The iteration itself lives in [`snake_core`]. This crate adds the configuration
//! file, grid output and the `snake` command line tool.

pub mod app;
pub mod config;
pub mod output;

pub use snake_core;
