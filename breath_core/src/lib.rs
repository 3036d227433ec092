#![forbid(unsafe_code)]

//! Core engine for guided breathing sessions.
//!
//! This crate provides:
//! - Domain types (phases, exercises, sequences, session snapshots)
//! - Budgeted sequence generation with an injectable RNG
//! - The session controller (countdown task, pause/resume/skip, disposal)
//! - Configuration and logging setup

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod generator;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{
    Config, GeneratorConfig, PhaseRange, SessionConfig, Timing, MAX_DURATION_MINUTES,
    MAX_PHASE_SECONDS,
};
pub use generator::SequenceGenerator;
pub use session::SessionController;
