use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Event action names as reported by the activity feed.
pub mod action {
    pub const PUSHED_NEW: &str = "pushed new";
    pub const PUSHED_TO: &str = "pushed to";
    pub const OPENED: &str = "opened";
}

/// Event target types as reported by the activity feed.
pub mod target {
    pub const MERGE_REQUEST: &str = "MergeRequest";
}

/// Messages written for each kind of reconstructed work unit.
pub mod message {
    pub const PUSHED_NEW_BRANCH: &str = "pushed new branch";
    pub const CREATED_COMMIT: &str = "created a commit";
    pub const OPENED_MERGE_REQUEST: &str = "opened merge request";
}

/// The authenticated account whose timeline is synced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub commit_email: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserInfo {
    /// Address used to filter commit-range queries down to this user's commits.
    pub fn author_email(&self) -> &str {
        self.commit_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(self.email.as_deref())
            .unwrap_or("")
    }
}

/// Push details attached to `pushed new` / `pushed to` events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PushData {
    #[serde(default)]
    pub commit_count: u32,
    /// Empty or absent for the first push of a new ref.
    #[serde(default)]
    pub commit_from: Option<String>,
    #[serde(default)]
    pub commit_to: Option<String>,
    #[serde(default, rename = "ref")]
    pub ref_name: Option<String>,
}

impl PushData {
    /// Base revision of the push, `None` when the push created the ref.
    pub fn base(&self) -> Option<&str> {
        self.commit_from.as_deref().filter(|s| !s.is_empty())
    }

    /// Git revision range covering the pushed commits.
    ///
    /// `from..to` for an existing ref, `to~count..to` when the ref is new.
    /// Returns `None` when the push carries no head revision (ref deletion).
    pub fn revision_range(&self) -> Option<String> {
        let to = self.commit_to.as_deref().filter(|s| !s.is_empty())?;
        Some(match self.base() {
            Some(from) => format!("{from}..{to}"),
            None => format!("{to}~{}..{to}", self.commit_count),
        })
    }
}

/// One entry of a user's activity timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    pub id: u64,
    pub project_id: u64,
    pub action_name: String,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub push_data: Option<PushData>,
}

impl ActivityEvent {
    /// Number of commits carried by the push, 0 for non-push events.
    pub fn commit_count(&self) -> u32 {
        self.push_data.as_ref().map_or(0, |p| p.commit_count)
    }

    /// Branch or tag a push went to.
    pub fn pushed_ref(&self) -> Option<&str> {
        self.push_data.as_ref().and_then(|p| p.ref_name.as_deref())
    }
}

/// One underlying commit of a push, as returned by the commit-range query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "authored_date", with = "time::serde::rfc3339")]
    pub authored_at: OffsetDateTime,
}

/// A reconstructed fact ready to be written and committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub message: String,
    pub occurred_at: OffsetDateTime,
}

impl WorkUnit {
    pub fn new(message: impl Into<String>, occurred_at: OffsetDateTime) -> Self {
        Self {
            message: message.into(),
            occurred_at,
        }
    }
}
