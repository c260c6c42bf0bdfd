//! In-memory knowledge-base store.

use std::collections::HashMap;

use stepguide_shared::{Article, ArticleId, Result};
use tracing::debug;

use crate::catalog::validate_articles;

/// Ordered, immutable-per-load collection of articles.
///
/// Articles are never edited in place; [`KnowledgeBase::load`] swaps the
/// whole collection.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    articles: Vec<Article>,
    index: HashMap<ArticleId, usize>,
}

impl KnowledgeBase {
    /// Build a store from an already-validated list of articles.
    pub fn new(articles: Vec<Article>) -> Result<Self> {
        let mut kb = Self::default();
        kb.load(articles)?;
        Ok(kb)
    }

    /// Replace the in-memory collection. On validation failure the previous
    /// collection is left untouched.
    pub fn load(&mut self, articles: Vec<Article>) -> Result<()> {
        validate_articles(&articles)?;

        self.index = articles
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();
        self.articles = articles;

        debug!(article_count = self.articles.len(), "knowledge base loaded");
        Ok(())
    }

    /// All articles in catalog order.
    pub fn get_all(&self) -> &[Article] {
        &self.articles
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Article> {
        self.index
            .get(&ArticleId::from(id))
            .and_then(|&i| self.articles.get(i))
    }

    /// Case-insensitive substring browse over id, title, product, and tags.
    pub fn filter(&self, substring: &str) -> Vec<&Article> {
        let needle = substring.trim().to_lowercase();
        if needle.is_empty() {
            return self.articles.iter().collect();
        }

        self.articles
            .iter()
            .filter(|a| {
                a.id.as_str().to_lowercase().contains(&needle)
                    || a.title.to_lowercase().contains(&needle)
                    || a.product.to_lowercase().contains(&needle)
                    || a.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
