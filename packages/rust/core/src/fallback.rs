//! Fallback selection after a reported step failure.
//!
//! Decision order:
//! 1. the current article's first fallback path (`same-article`)
//! 2. another article related to the failure that has a fallback path
//!    (`cross-article`), found by a pluggable [`CrossArticleMatcher`]
//! 3. the current article's escalation record
//! 4. a bare escalation with no record

use std::collections::HashSet;

use serde::Serialize;
use stepguide_retrieval::{normalize, normalize_all};
use stepguide_shared::{Article, ArticleId, Escalation, FailureReason, FallbackPath};
use tracing::{debug, instrument};

/// Words too common to count as evidence that two articles are related.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "but", "can", "cannot", "didn", "does", "doesn", "for", "from",
    "has", "have", "i", "in", "is", "it", "its", "not", "of", "on", "or", "still", "t", "the",
    "they", "this", "to", "was", "with", "won",
];

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of [`select_fallback`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FallbackDecision<'a> {
    /// Use a fallback defined on the current article.
    SameArticle {
        article: &'a Article,
        fallback: &'a FallbackPath,
    },
    /// Continue on a fallback of a related article.
    CrossArticle {
        article: &'a Article,
        fallback: &'a FallbackPath,
    },
    /// No automated path left. `None` means show a generic escalation message.
    Escalation { escalation: Option<&'a Escalation> },
}

/// Owned pointer to a fallback path, detached from the knowledge base borrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackTarget {
    pub article_id: ArticleId,
    pub fallback_id: String,
}

impl FallbackDecision<'_> {
    /// `same-article`, `cross-article`, or `escalation`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SameArticle { .. } => "same-article",
            Self::CrossArticle { .. } => "cross-article",
            Self::Escalation { .. } => "escalation",
        }
    }

    /// Where to switch to; `None` for escalations.
    pub fn target(&self) -> Option<FallbackTarget> {
        match self {
            Self::SameArticle { article, fallback } | Self::CrossArticle { article, fallback } => {
                Some(FallbackTarget {
                    article_id: article.id.clone(),
                    fallback_id: fallback.id.clone(),
                })
            }
            Self::Escalation { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Policy for finding a related article when the current one has no fallback.
///
/// Implementations must be deterministic and must never return `current`.
pub trait CrossArticleMatcher: Send + Sync {
    fn find<'a>(
        &self,
        current: &Article,
        candidates: &'a [Article],
        reason: FailureReason,
        note: Option<&str>,
    ) -> Option<&'a Article>;

    /// Human-readable matcher name for tracing.
    fn name(&self) -> &str;
}

/// Counts tokens shared between the failure (reason hint words plus the
/// note) and each candidate's summary, tags, and keywords.
///
/// The highest overlap wins; ties keep catalog order. Candidates below
/// `min_overlap` (never less than 1) are not offered.
#[derive(Debug, Clone)]
pub struct TokenOverlapMatcher {
    min_overlap: usize,
}

impl TokenOverlapMatcher {
    pub fn new(min_overlap: usize) -> Self {
        Self {
            min_overlap: min_overlap.max(1),
        }
    }

    fn failure_tokens(reason: FailureReason, note: Option<&str>) -> HashSet<String> {
        reason
            .hint_terms()
            .iter()
            .map(|t| t.to_string())
            .chain(note.map(normalize).unwrap_or_default())
            .filter(|t| !STOPWORDS.contains(&t.as_str()))
            .collect()
    }

    fn article_tokens(article: &Article) -> HashSet<String> {
        normalize(&article.summary)
            .into_iter()
            .chain(normalize_all(&article.tags))
            .chain(normalize_all(&article.keywords))
            .collect()
    }
}

impl Default for TokenOverlapMatcher {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CrossArticleMatcher for TokenOverlapMatcher {
    fn find<'a>(
        &self,
        current: &Article,
        candidates: &'a [Article],
        reason: FailureReason,
        note: Option<&str>,
    ) -> Option<&'a Article> {
        let wanted = Self::failure_tokens(reason, note);
        if wanted.is_empty() {
            return None;
        }

        let mut best: Option<(&'a Article, usize)> = None;
        for candidate in candidates {
            if candidate.id == current.id || candidate.fallbacks.is_empty() {
                continue;
            }
            let overlap = Self::article_tokens(candidate)
                .iter()
                .filter(|t| wanted.contains(*t))
                .count();
            if overlap >= self.min_overlap && best.is_none_or(|(_, b)| overlap > b) {
                best = Some((candidate, overlap));
            }
        }

        if let Some((article, overlap)) = best {
            debug!(article_id = %article.id, overlap, "cross-article candidate");
        }
        best.map(|(article, _)| article)
    }

    fn name(&self) -> &str {
        "token-overlap"
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Decide where to go after a failure on `article`.
#[instrument(skip_all, fields(article_id = %article.id, reason = %reason, matcher = matcher.name()))]
pub fn select_fallback<'a>(
    article: &'a Article,
    all_articles: &'a [Article],
    reason: FailureReason,
    note: Option<&str>,
    matcher: &dyn CrossArticleMatcher,
) -> FallbackDecision<'a> {
    let decision = if let Some(fallback) = article.first_fallback() {
        FallbackDecision::SameArticle { article, fallback }
    } else if let Some((other, fallback)) = matcher
        .find(article, all_articles, reason, note)
        .filter(|other| other.id != article.id)
        .and_then(|other| other.first_fallback().map(|f| (other, f)))
    {
        FallbackDecision::CrossArticle {
            article: other,
            fallback,
        }
    } else {
        FallbackDecision::Escalation {
            escalation: article.escalation.as_ref(),
        }
    };

    debug!(kind = decision.kind(), "fallback selected");
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepguide_shared::Step;

    fn make_article(id: &str, summary: &str, tags: &[&str], fallback: Option<&str>) -> Article {
        Article {
            id: id.into(),
            title: format!("Article {id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            product: String::new(),
            summary: summary.into(),
            keywords: vec![],
            prechecks: vec![],
            steps: vec![Step {
                id: format!("{id}-s1"),
                text: "do the thing".into(),
                expected_result: None,
                say_to_customer: None,
            }],
            fallbacks: fallback
                .map(|fid| {
                    vec![FallbackPath {
                        id: fid.into(),
                        condition: "if it fails".into(),
                        steps: vec![],
                    }]
                })
                .unwrap_or_default(),
            escalation: None,
        }
    }

    #[test]
    fn same_article_fallback_wins_regardless_of_reason() {
        let article = make_article("a", "", &[], Some("fb-a"));
        let other = make_article("b", "password reset", &["password"], Some("fb-b"));
        let all = vec![article.clone(), other];

        let decision = select_fallback(
            &all[0],
            &all,
            FailureReason::NoAccess,
            Some("password"),
            &TokenOverlapMatcher::default(),
        );
        assert_eq!(decision.kind(), "same-article");
        assert_eq!(
            decision.target(),
            Some(FallbackTarget {
                article_id: "a".into(),
                fallback_id: "fb-a".into()
            })
        );
    }

    #[test]
    fn cross_article_when_note_relates() {
        let all = vec![
            make_article("a", "mail will not send", &["email"], None),
            make_article("b", "printer offline", &["printer"], Some("fb-b")),
            make_article("c", "account locked or access denied", &["password"], Some("fb-c")),
        ];

        let decision = select_fallback(
            &all[0],
            &all,
            FailureReason::Other,
            Some("Customer is locked out of the account"),
            &TokenOverlapMatcher::default(),
        );
        let FallbackDecision::CrossArticle { article, fallback } = decision else {
            panic!("expected cross-article, got {}", decision.kind());
        };
        assert_eq!(article.id.as_str(), "c");
        assert_eq!(fallback.id, "fb-c");
    }

    #[test]
    fn reason_hints_alone_can_match() {
        let all = vec![
            make_article("a", "", &[], None),
            make_article("b", "", &["permission"], Some("fb-b")),
        ];
        let decision = select_fallback(
            &all[0],
            &all,
            FailureReason::NoAccess,
            None,
            &TokenOverlapMatcher::default(),
        );
        assert_eq!(decision.kind(), "cross-article");
    }

    #[test]
    fn never_selects_current_or_fallbackless_articles() {
        let all = vec![
            make_article("a", "printer offline", &["printer"], None),
            make_article("b", "printer jam", &["printer"], None),
        ];
        let decision = select_fallback(
            &all[0],
            &all,
            FailureReason::Other,
            Some("printer"),
            &TokenOverlapMatcher::default(),
        );
        assert!(matches!(decision, FallbackDecision::Escalation { escalation: None }));
    }

    #[test]
    fn highest_overlap_wins_and_ties_keep_order() {
        let all = vec![
            make_article("a", "", &[], None),
            make_article("b", "vpn tunnel", &[], Some("fb-b")),
            make_article("c", "vpn tunnel gateway", &[], Some("fb-c")),
            make_article("d", "vpn tunnel gateway", &[], Some("fb-d")),
        ];
        let matcher = TokenOverlapMatcher::default();
        let found = matcher.find(&all[0], &all, FailureReason::Other, Some("vpn gateway tunnel"));
        assert_eq!(found.map(|a| a.id.as_str()), Some("c"));
    }

    #[test]
    fn min_overlap_and_stopwords_are_respected() {
        let all = vec![
            make_article("a", "", &[], None),
            make_article("b", "the printer is offline", &[], Some("fb-b")),
        ];
        let strict = TokenOverlapMatcher::new(2);
        assert!(strict.find(&all[0], &all, FailureReason::Other, Some("printer")).is_none());

        let lenient = TokenOverlapMatcher::default();
        assert!(lenient.find(&all[0], &all, FailureReason::Other, Some("the is")).is_none());
        assert!(lenient.find(&all[0], &all, FailureReason::Other, Some("printer")).is_some());
    }

    #[test]
    fn escalation_record_is_carried() {
        let mut article = make_article("a", "", &[], None);
        article.escalation = Some(Escalation {
            when: "always".into(),
            target: "Tier2".into(),
        });
        let all = vec![article];

        let decision = select_fallback(
            &all[0],
            &all,
            FailureReason::Other,
            Some("x"),
            &TokenOverlapMatcher::default(),
        );
        let FallbackDecision::Escalation { escalation: Some(e) } = &decision else {
            panic!("expected escalation record");
        };
        assert_eq!(e.target, "Tier2");
        assert!(decision.target().is_none());
    }
}
