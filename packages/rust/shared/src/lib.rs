//! Shared types, error model, and configuration for StepGuide.
//!
//! This crate is the foundation depended on by all other StepGuide crates.
//! It provides:
//! - [`StepGuideError`] — the unified error type, plus [`NavigationError`]
//! - Domain types ([`Article`], [`Step`], [`FallbackPath`], [`Escalation`], [`FailureReason`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, FallbackConfig, FeaturesConfig, ProviderKind, RetrievalConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{NavigationError, Result, StepGuideError};
pub use types::{
    Article, ArticleId, Escalation, FailureReason, FallbackPath, MAIN_PATH, PathId, Step,
};
