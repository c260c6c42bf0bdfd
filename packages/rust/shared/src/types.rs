//! Core domain types for StepGuide knowledge-base articles.

use serde::{Deserialize, Serialize};

/// Reserved path name for an article's primary step list.
pub const MAIN_PATH: &str = "main";

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// Unique key of a knowledge-base article (e.g., `kb-email-not-sending`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl ArticleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ArticleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// PathId
// ---------------------------------------------------------------------------

/// Which step list of an article is being walked: the main path or a fallback.
///
/// Serialized as a plain string: `"main"` or the fallback id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PathId {
    Main,
    Fallback(String),
}

impl PathId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Main => MAIN_PATH,
            Self::Fallback(id) => id,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, Self::Main)
    }
}

impl From<String> for PathId {
    fn from(s: String) -> Self {
        if s == MAIN_PATH {
            Self::Main
        } else {
            Self::Fallback(s)
        }
    }
}

impl From<PathId> for String {
    fn from(p: PathId) -> Self {
        match p {
            PathId::Main => MAIN_PATH.to_string(),
            PathId::Fallback(id) => id,
        }
    }
}

impl std::fmt::Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Article / Step / FallbackPath / Escalation
// ---------------------------------------------------------------------------

/// A single instruction within a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Unique within the owning article (across main and fallback paths).
    pub id: String,
    /// Instruction shown to the agent.
    pub text: String,
    /// What the agent should observe once the step is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    /// Suggested wording to relay to the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub say_to_customer: Option<String>,
}

/// Alternate ordered step list scoped to one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackPath {
    /// Unique within the article; never `"main"`.
    pub id: String,
    /// Human description of when this path applies.
    pub condition: String,
    pub steps: Vec<Step>,
}

/// Where to hand the case off when no automated path remains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub when: String,
    pub target: String,
}

/// A knowledge-base procedure. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub prechecks: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub fallbacks: Vec<FallbackPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
}

impl Article {
    /// Step list for the given path, or `None` if the fallback does not exist.
    pub fn steps_for(&self, path: &PathId) -> Option<&[Step]> {
        match path {
            PathId::Main => Some(&self.steps),
            PathId::Fallback(id) => self.fallback(id).map(|f| f.steps.as_slice()),
        }
    }

    /// Look up a fallback path by id.
    pub fn fallback(&self, id: &str) -> Option<&FallbackPath> {
        self.fallbacks.iter().find(|f| f.id == id)
    }

    pub fn first_fallback(&self) -> Option<&FallbackPath> {
        self.fallbacks.first()
    }
}

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Fixed set of reasons an agent can give when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The step was performed but did not fix anything.
    DidNotWork,
    /// An error message appeared.
    ErrorMessage,
    /// Missing permissions or access.
    NoAccess,
    /// The option or screen described does not exist for this customer.
    NotApplicable,
    /// Customer could not or would not perform the step.
    CustomerUnable,
    Other,
}

impl FailureReason {
    pub const ALL: [FailureReason; 6] = [
        Self::DidNotWork,
        Self::ErrorMessage,
        Self::NoAccess,
        Self::NotApplicable,
        Self::CustomerUnable,
        Self::Other,
    ];

    /// Stable machine name (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DidNotWork => "did_not_work",
            Self::ErrorMessage => "error_message",
            Self::NoAccess => "no_access",
            Self::NotApplicable => "not_applicable",
            Self::CustomerUnable => "customer_unable",
            Self::Other => "other",
        }
    }

    /// Human-readable label for pickers.
    pub fn label(self) -> &'static str {
        match self {
            Self::DidNotWork => "Step didn't resolve the issue",
            Self::ErrorMessage => "An error message appeared",
            Self::NoAccess => "No access / permission denied",
            Self::NotApplicable => "Option not available",
            Self::CustomerUnable => "Customer unable to do this",
            Self::Other => "Other",
        }
    }

    /// Words this reason implies, used when searching other articles for a fallback.
    pub fn hint_terms(self) -> &'static [&'static str] {
        match self {
            Self::DidNotWork => &[],
            Self::ErrorMessage => &["error", "message", "code"],
            Self::NoAccess => &["access", "permission", "denied", "locked", "password"],
            Self::NotApplicable => &["missing", "option", "version"],
            Self::CustomerUnable => &["remote", "assist"],
            Self::Other => &[],
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FailureReason {
    type Err = crate::StepGuideError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| crate::StepGuideError::validation(format!("unknown failure reason '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_step(id: &str, text: &str) -> Step {
        Step {
            id: id.into(),
            text: text.into(),
            expected_result: None,
            say_to_customer: None,
        }
    }

    #[test]
    fn path_id_string_mapping() {
        assert_eq!(PathId::from("main".to_string()), PathId::Main);
        assert_eq!(
            PathId::from("fb-webmail".to_string()),
            PathId::Fallback("fb-webmail".into())
        );
        let json = serde_json::to_string(&PathId::Fallback("fb-1".into())).expect("serialize");
        assert_eq!(json, "\"fb-1\"");
        let parsed: PathId = serde_json::from_str("\"main\"").expect("deserialize");
        assert!(parsed.is_main());
    }

    #[test]
    fn article_deserializes_camel_case_with_defaults() {
        let json = r#"{
            "id": "kb-1",
            "title": "Email Not Sending",
            "steps": [
                { "id": "s1", "text": "Check outbox", "expectedResult": "Outbox empty" }
            ]
        }"#;
        let article: Article = serde_json::from_str(json).expect("deserialize");
        assert_eq!(article.id.as_str(), "kb-1");
        assert!(article.tags.is_empty());
        assert!(article.escalation.is_none());
        assert_eq!(article.steps[0].expected_result.as_deref(), Some("Outbox empty"));
    }

    #[test]
    fn steps_for_resolves_paths() {
        let article = Article {
            id: "kb-1".into(),
            title: "t".into(),
            tags: vec![],
            product: String::new(),
            summary: String::new(),
            keywords: vec![],
            prechecks: vec![],
            steps: vec![make_step("s1", "a")],
            fallbacks: vec![FallbackPath {
                id: "fb".into(),
                condition: "if a fails".into(),
                steps: vec![make_step("f1", "b"), make_step("f2", "c")],
            }],
            escalation: None,
        };

        assert_eq!(article.steps_for(&PathId::Main).map(<[Step]>::len), Some(1));
        assert_eq!(
            article.steps_for(&PathId::Fallback("fb".into())).map(<[Step]>::len),
            Some(2)
        );
        assert!(article.steps_for(&PathId::Fallback("nope".into())).is_none());
    }

    #[test]
    fn failure_reason_parses_names() {
        assert_eq!("no_access".parse::<FailureReason>().ok(), Some(FailureReason::NoAccess));
        assert_eq!("Error-Message".parse::<FailureReason>().ok(), Some(FailureReason::ErrorMessage));
        assert!("bogus".parse::<FailureReason>().is_err());
    }
}
