//! # Checkpoint Explorer Common Library
//!
//! Shared code for explorer front-ends including:
//! - Configuration loading
//! - API envelope and pagination types
//! - Checkpoint record type and display helpers

pub mod api;
pub mod checkpoint;
pub mod config;
pub mod error;

pub use checkpoint::{Checkpoint, CommitmentInfo, ConfirmationStatus};
pub use error::{Error, Result};
