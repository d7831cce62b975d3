//! # LessonLink Domain
//!
//! Data types shared by every LessonLink crate.
//!
//! This crate contains:
//! - Session, request and response models for the authenticated API client
//! - Error types and Result definitions
//! - Configuration structures
//! - Storage keys and header names
//!
//! ## Architecture
//! - No dependencies on other LessonLink crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
