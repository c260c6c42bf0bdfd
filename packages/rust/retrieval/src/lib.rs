//! Knowledge-base store and article retrieval for StepGuide.
//!
//! - [`KnowledgeBase`] holds the loaded articles in catalog order
//! - [`catalog`] loads and validates article catalogs (JSON)
//! - [`scorer`] normalizes free-text queries and ranks articles
//! - [`provider`] and [`scanner`] are the swappable strategies the
//!   presentation layer is wired with

pub mod catalog;
pub mod normalize;
pub mod provider;
pub mod scanner;
pub mod scorer;
mod store;

pub use catalog::{Catalog, builtin_catalog, load_catalog_from, parse_catalog};
pub use normalize::{normalize, normalize_all};
pub use provider::{KeywordRetrieval, PinnedRetrieval, RetrievalProvider};
pub use scanner::{ContentScanner, HtmlPageScanner, StaticScanner};
pub use scorer::{LOW_CONFIDENCE_THRESHOLD, MatchList, ScoredMatch, SearchOutcome, search};
pub use store::KnowledgeBase;
