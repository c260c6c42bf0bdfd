//! Keyword relevance scorer.
//!
//! Each article earns, per token occurrence in its fields that also appears
//! in the query: +3 for a tag token, +2 for a product token, +1 for a title
//! token. Results are ranked by descending score with catalog order kept
//! for ties.

use std::collections::HashSet;

use serde::Serialize;
use stepguide_shared::Article;
use tracing::{debug, instrument};

use crate::normalize::{normalize, normalize_all};

/// Top scores below this are flagged as low confidence.
pub const LOW_CONFIDENCE_THRESHOLD: u32 = 9;

const TAG_WEIGHT: u32 = 3;
const PRODUCT_WEIGHT: u32 = 2;
const TITLE_WEIGHT: u32 = 1;

/// An article paired with its relevance score for one query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMatch<'a> {
    pub article: &'a Article,
    pub score: u32,
}

/// Non-empty ranked result of a search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchList<'a> {
    pub matches: Vec<ScoredMatch<'a>>,
    pub top_score: u32,
    /// True when `top_score` is under [`LOW_CONFIDENCE_THRESHOLD`].
    pub low_confidence: bool,
}

/// Result of [`search`]. `NoMatch` is distinct from a low-confidence hit.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchOutcome<'a> {
    NoMatch,
    Matches(MatchList<'a>),
}

impl<'a> SearchOutcome<'a> {
    /// Build an outcome from already-ranked matches, deriving the top score
    /// and confidence flag.
    pub fn from_ranked(matches: Vec<ScoredMatch<'a>>) -> Self {
        let Some(top_score) = matches.first().map(|m| m.score) else {
            return Self::NoMatch;
        };
        Self::Matches(MatchList {
            matches,
            top_score,
            low_confidence: top_score < LOW_CONFIDENCE_THRESHOLD,
        })
    }

    pub fn matches(&self) -> &[ScoredMatch<'a>] {
        match self {
            Self::NoMatch => &[],
            Self::Matches(list) => &list.matches,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    pub fn low_confidence(&self) -> bool {
        match self {
            Self::NoMatch => false,
            Self::Matches(list) => list.low_confidence,
        }
    }
}

/// Rank `articles` against `query`, returning at most `top_n` positive matches.
#[instrument(skip_all, fields(query = %query, top_n = top_n, article_count = articles.len()))]
pub fn search<'a>(articles: &'a [Article], query: &str, top_n: usize) -> SearchOutcome<'a> {
    let query_tokens: HashSet<String> = normalize(query).into_iter().collect();
    if query_tokens.is_empty() {
        debug!("empty query, skipping scoring");
        return SearchOutcome::NoMatch;
    }

    let mut ranked: Vec<ScoredMatch<'a>> = articles
        .iter()
        .map(|article| ScoredMatch {
            article,
            score: score_article(article, &query_tokens),
        })
        .collect();

    // `sort_by` is stable, so equal scores keep catalog order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(top_n);
    ranked.retain(|m| m.score > 0);

    debug!(
        returned = ranked.len(),
        top_score = ranked.first().map(|m| m.score).unwrap_or(0),
        "search ranked"
    );

    SearchOutcome::from_ranked(ranked)
}

/// Score one article against a normalized query token set.
pub fn score_article(article: &Article, query_tokens: &HashSet<String>) -> u32 {
    let hits = |tokens: Vec<String>, weight: u32| -> u32 {
        tokens.iter().filter(|t| query_tokens.contains(*t)).count() as u32 * weight
    };

    hits(normalize_all(&article.tags), TAG_WEIGHT)
        + hits(normalize(&article.product), PRODUCT_WEIGHT)
        + hits(normalize(&article.title), TITLE_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_article(id: &str, title: &str, product: &str, tags: &[&str]) -> Article {
        Article {
            id: id.into(),
            title: title.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            product: product.into(),
            summary: String::new(),
            keywords: vec![],
            prechecks: vec![],
            steps: vec![],
            fallbacks: vec![],
            escalation: None,
        }
    }

    fn email_article() -> Article {
        make_article("kb-email", "Email Not Sending", "Outlook", &["email", "smtp"])
    }

    #[test]
    fn additive_scoring_example() {
        let articles = vec![email_article()];
        let outcome = search(&articles, "outlook email smtp", 3);

        let SearchOutcome::Matches(list) = outcome else {
            panic!("expected matches");
        };
        // 3 (email tag) + 3 (smtp tag) + 2 (outlook product) + 1 (email title)
        assert_eq!(list.top_score, 9);
        assert!(!list.low_confidence);
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let articles = vec![email_article()];
        let a = search(&articles, "Outlook, Email!", 3);
        let b = search(&articles, "outlook email", 3);

        let scores = |o: &SearchOutcome| o.matches().iter().map(|m| m.score).collect::<Vec<_>>();
        assert_eq!(scores(&a), scores(&b));
        assert_eq!(scores(&a), vec![6]);
        assert!(a.low_confidence());
    }

    #[test]
    fn unknown_token_returns_no_match() {
        let articles = vec![email_article()];
        assert!(search(&articles, "xyz", 3).is_no_match());
    }

    #[test]
    fn empty_query_returns_no_match() {
        let articles = vec![email_article()];
        assert!(search(&articles, "", 3).is_no_match());
        assert!(search(&articles, " ,.! ", 3).is_no_match());
    }

    #[test]
    fn multi_word_tag_scores_per_word() {
        let articles = vec![make_article("kb-1", "Other", "", &["outbound mail"])];
        let outcome = search(&articles, "mail outbound", 3);
        assert_eq!(outcome.matches()[0].score, 6);

        let outcome = search(&articles, "mail", 3);
        assert_eq!(outcome.matches()[0].score, 3);
    }

    #[test]
    fn ties_keep_catalog_order_and_truncate() {
        let articles = vec![
            make_article("first", "Printer", "", &[]),
            make_article("second", "Printer", "", &[]),
            make_article("third", "Printer Jam", "", &["printer"]),
            make_article("fourth", "Printer", "", &[]),
        ];
        let outcome = search(&articles, "printer jam", 3);
        let ids: Vec<&str> = outcome
            .matches()
            .iter()
            .map(|m| m.article.id.as_str())
            .collect();
        assert_eq!(ids, vec!["third", "first", "second"]);
    }

    #[test]
    fn zero_scores_are_dropped_even_if_under_top_n() {
        let articles = vec![
            make_article("a", "VPN Down", "", &["vpn"]),
            make_article("b", "Email", "", &["email"]),
        ];
        let outcome = search(&articles, "vpn", 3);
        assert_eq!(outcome.matches().len(), 1);
        assert_eq!(outcome.matches()[0].article.id.as_str(), "a");
    }

    #[test]
    fn repeated_token_in_fields_counts_each_occurrence() {
        let articles = vec![make_article("a", "Email Email", "Email", &["email"])];
        // tag 3 + product 2 + title 1 + title 1
        assert_eq!(search(&articles, "email", 1).matches()[0].score, 7);
    }
}
