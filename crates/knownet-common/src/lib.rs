//! knownet-common — Shared types, errors, and configuration used across all KnowNet crates.

pub mod error;
pub mod entities;
pub mod relations;
pub mod config;

// Re-export commonly used types
pub use entities::{EntityCategory, color_for_category, deterministic_color};
pub use relations::normalize_relation;
pub use config::KnownetConfig;
