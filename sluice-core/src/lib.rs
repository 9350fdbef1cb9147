//! Sluice Core
//!
//! Core types shared by the pipeline driver and the command-line front end.
//!
//! This crate contains:
//! - Domain types: runs, stages, artifacts and stage status documents
//! - Configuration: every container, volume and path name the driver touches
//! - Input handling: URL validation and the on-volume URL list format

pub mod config;
pub mod domain;
pub mod input;

pub use config::PipelineConfig;
