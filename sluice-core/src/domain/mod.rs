//! Core domain types
//!
//! These types describe one pipeline run and the containers it observes.
//! They are shared between the driver (which updates them) and the CLI
//! (which renders them).

pub mod artifact;
pub mod run;
pub mod stage;
