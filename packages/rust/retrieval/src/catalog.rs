//! Article catalog loading and validation.
//!
//! A catalog is a JSON document `{ "articles": [ ... ] }`. The sample
//! catalog under `fixtures/kb/` is compiled in as the built-in default.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stepguide_shared::{Article, MAIN_PATH, Result, StepGuideError};
use tracing::{debug, instrument};

/// Sample catalog shipped with the binary.
const BUILTIN_CATALOG: &str = include_str!("../../../../fixtures/kb/articles.json");

/// Root structure of a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub articles: Vec<Article>,
}

/// Parse and validate a catalog from JSON text.
pub fn parse_catalog(json: &str) -> Result<Vec<Article>> {
    let catalog: Catalog = serde_json::from_str(json)
        .map_err(|e| StepGuideError::parse(format!("invalid catalog JSON: {e}")))?;
    validate_articles(&catalog.articles)?;
    Ok(catalog.articles)
}

/// Load a catalog file from disk.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_catalog_from(path: &Path) -> Result<Vec<Article>> {
    let content = std::fs::read_to_string(path).map_err(|e| StepGuideError::io(path, e))?;
    let articles = parse_catalog(&content)?;
    debug!(article_count = articles.len(), "catalog loaded");
    Ok(articles)
}

/// The compiled-in sample catalog.
pub fn builtin_catalog() -> Result<Vec<Article>> {
    parse_catalog(BUILTIN_CATALOG)
}

/// Check id uniqueness rules:
/// - article ids are unique across the catalog
/// - step ids are unique within an article, across all of its paths
/// - fallback ids are unique within an article and never `"main"`
pub(crate) fn validate_articles(articles: &[Article]) -> Result<()> {
    let mut article_ids = HashSet::new();

    for article in articles {
        if article.id.as_str().trim().is_empty() {
            return Err(StepGuideError::validation("article with empty id"));
        }
        if !article_ids.insert(article.id.as_str()) {
            return Err(StepGuideError::validation(format!(
                "duplicate article id '{}'",
                article.id
            )));
        }

        let mut fallback_ids = HashSet::new();
        for fallback in &article.fallbacks {
            if fallback.id == MAIN_PATH {
                return Err(StepGuideError::validation(format!(
                    "article '{}': fallback id '{MAIN_PATH}' is reserved",
                    article.id
                )));
            }
            if !fallback_ids.insert(fallback.id.as_str()) {
                return Err(StepGuideError::validation(format!(
                    "article '{}': duplicate fallback id '{}'",
                    article.id, fallback.id
                )));
            }
        }

        let mut step_ids = HashSet::new();
        let all_steps = article
            .steps
            .iter()
            .chain(article.fallbacks.iter().flat_map(|f| f.steps.iter()));
        for step in all_steps {
            if !step_ids.insert(step.id.as_str()) {
                return Err(StepGuideError::validation(format!(
                    "article '{}': duplicate step id '{}'",
                    article.id, step.id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let articles = builtin_catalog().expect("builtin catalog parses");
        assert_eq!(articles.len(), 5);
        assert_eq!(articles[0].id.as_str(), "kb-email-not-sending");
        assert_eq!(articles[0].fallbacks[0].id, "fb-webmail");
    }

    #[test]
    fn catalog_fixture_validates() {
        let articles = load_catalog_from(Path::new("../../../fixtures/kb/articles.json"))
            .expect("load fixture catalog");
        let vpn = articles
            .iter()
            .find(|a| a.id.as_str() == "kb-vpn-connect")
            .expect("vpn article");
        assert!(vpn.fallbacks.is_empty());
        assert_eq!(
            vpn.escalation.as_ref().map(|e| e.target.as_str()),
            Some("Network Operations")
        );
    }

    #[test]
    fn rejects_duplicate_step_ids_across_paths() {
        let json = r#"{ "articles": [ {
            "id": "kb-1", "title": "t",
            "steps": [ { "id": "s1", "text": "a" } ],
            "fallbacks": [ { "id": "fb", "condition": "c", "steps": [ { "id": "s1", "text": "b" } ] } ]
        } ] }"#;
        let err = parse_catalog(json).unwrap_err();
        assert!(err.to_string().contains("duplicate step id 's1'"));
    }

    #[test]
    fn rejects_reserved_fallback_id() {
        let json = r#"{ "articles": [ {
            "id": "kb-1", "title": "t",
            "fallbacks": [ { "id": "main", "condition": "c", "steps": [] } ]
        } ] }"#;
        let err = parse_catalog(json).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_catalog("{ not json").unwrap_err();
        assert!(matches!(err, StepGuideError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_catalog_from(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, StepGuideError::Io { .. }));
    }
}
