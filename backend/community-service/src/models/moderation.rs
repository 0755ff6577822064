use serde::{Deserialize, Serialize};

pub const DEFAULT_REJECTION_REASON: &str = "Content violates community guidelines";

/// Decision returned by the moderation gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub is_appropriate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Cleaned version of the submitted text, when the model offers one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderated_content: Option<String>,
}

impl ModerationResult {
    pub fn appropriate() -> Self {
        Self {
            is_appropriate: true,
            reason: None,
            confidence: None,
            moderated_content: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_appropriate: false,
            reason: Some(reason.into()),
            confidence: None,
            moderated_content: None,
        }
    }

    /// Reason to show the client, falling back to a generic message
    pub fn rejection_reason(&self) -> String {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON)
            .to_string()
    }
}

/// Counters for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub users: i64,
    pub posts: i64,
    pub comments: i64,
    pub reports: i64,
}
