//! Retrieval provider trait and built-in providers.
//!
//! The session talks to article search only through [`RetrievalProvider`],
//! so the keyword scorer can be swapped for a fixed result list in demos
//! and tests.

use stepguide_shared::{Article, ArticleId};
use tracing::warn;

use crate::normalize::normalize;
use crate::scorer::{self, LOW_CONFIDENCE_THRESHOLD, ScoredMatch, SearchOutcome};
use crate::store::KnowledgeBase;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Capability interface for article search over a knowledge base.
pub trait RetrievalProvider: Send + Sync {
    /// Rank articles for a free-text query.
    fn search(&self, query: &str, top_n: usize) -> SearchOutcome<'_>;

    /// The knowledge base the provider searches.
    fn knowledge_base(&self) -> &KnowledgeBase;

    /// Human-readable provider name for tracing.
    fn name(&self) -> &str;

    fn get_article(&self, id: &str) -> Option<&Article> {
        self.knowledge_base().get_by_id(id)
    }

    fn articles(&self) -> &[Article] {
        self.knowledge_base().get_all()
    }

    /// Plain substring browsing, independent of scoring.
    fn filter(&self, substring: &str) -> Vec<&Article> {
        self.knowledge_base().filter(substring)
    }
}

// ---------------------------------------------------------------------------
// Keyword provider
// ---------------------------------------------------------------------------

/// Weighted keyword scoring over the loaded catalog.
pub struct KeywordRetrieval {
    kb: KnowledgeBase,
}

impl KeywordRetrieval {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb }
    }
}

impl RetrievalProvider for KeywordRetrieval {
    fn search(&self, query: &str, top_n: usize) -> SearchOutcome<'_> {
        scorer::search(self.kb.get_all(), query, top_n)
    }

    fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

// ---------------------------------------------------------------------------
// Pinned provider
// ---------------------------------------------------------------------------

/// Static provider that answers every non-empty query with the same
/// configured articles, each scored at the confidence threshold.
pub struct PinnedRetrieval {
    kb: KnowledgeBase,
    pinned: Vec<ArticleId>,
}

impl PinnedRetrieval {
    /// Ids missing from `kb` are dropped with a warning.
    pub fn new(kb: KnowledgeBase, pinned: impl IntoIterator<Item = impl Into<ArticleId>>) -> Self {
        let pinned = pinned
            .into_iter()
            .map(Into::into)
            .filter(|id: &ArticleId| {
                let known = kb.get_by_id(id.as_str()).is_some();
                if !known {
                    warn!(article_id = %id, "pinned article not in knowledge base, skipping");
                }
                known
            })
            .collect();
        Self { kb, pinned }
    }
}

impl RetrievalProvider for PinnedRetrieval {
    fn search(&self, query: &str, top_n: usize) -> SearchOutcome<'_> {
        if normalize(query).is_empty() {
            return SearchOutcome::NoMatch;
        }

        let matches = self
            .pinned
            .iter()
            .filter_map(|id| self.kb.get_by_id(id.as_str()))
            .take(top_n)
            .map(|article| ScoredMatch {
                article,
                score: LOW_CONFIDENCE_THRESHOLD,
            })
            .collect();

        SearchOutcome::from_ranked(matches)
    }

    fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    fn name(&self) -> &str {
        "pinned"
    }
}
