use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use glsync_core::{
    order_commit_range, ActivityEvent, ActivityFeed, CommitRef, Result, SyncConfig, SyncError,
    UserInfo,
};

use crate::retry::RetryPolicy;

/// Events requested per page.
pub const PAGE_SIZE: u32 = 100;

/// Longest response excerpt kept in an API error.
const ERROR_BODY_LIMIT: usize = 200;

/// Blocking GitLab REST client for the activity feed.
pub struct GitLabClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl GitLabClient {
    pub fn new(config: &SyncConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.request_timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            retry: RetryPolicy::new(config.retry),
        }
    }

    /// GET `path` with `query`, retried per the policy, decoded as JSON.
    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.retry.run(path, || self.get_once(path, query))
    }

    fn get_once<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.agent.get(&url).header("PRIVATE-TOKEN", &self.token);
        for (key, value) in query {
            request = request.query(*key, value);
        }
        tracing::debug!(endpoint = path, "GET");

        let transport = |e: ureq::Error| SyncError::Transport {
            endpoint: path.to_string(),
            message: e.to_string(),
        };
        let mut response = request.call().map_err(transport)?;
        let status = response.status();
        let body = response.body_mut().read_to_string().map_err(transport)?;

        if !status.is_success() {
            return Err(SyncError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| SyncError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }
}

impl ActivityFeed for GitLabClient {
    fn current_user(&self) -> Result<UserInfo> {
        self.get_json("/user", &[])
    }

    fn list_events(&self, user_id: u64, after: OffsetDateTime) -> Result<Vec<ActivityEvent>> {
        let after = after.format(&Rfc3339).map_err(|e| {
            SyncError::Config(format!("cannot format checkpoint {after}: {e}"))
        })?;
        self.get_json(&events_path(user_id), &events_query(after))
    }

    fn list_commits_in_range(
        &self,
        event: &ActivityEvent,
        committer_email: &str,
    ) -> Result<Vec<CommitRef>> {
        let Some(range) = event.push_data.as_ref().and_then(|p| p.revision_range()) else {
            tracing::warn!(event_id = event.id, "push without head revision, nothing to expand");
            return Ok(Vec::new());
        };
        let raw: Vec<CommitRef> = self.get_json(
            &commits_path(event.project_id),
            &[
                ("ref_name", range),
                ("author", committer_email.to_string()),
            ],
        )?;
        Ok(order_commit_range(raw, event.commit_count()))
    }
}

fn events_path(user_id: u64) -> String {
    format!("/users/{user_id}/events")
}

fn events_query(after: String) -> Vec<(&'static str, String)> {
    vec![
        ("sort", "asc".to_string()),
        ("per_page", PAGE_SIZE.to_string()),
        ("after", after),
    ]
}

fn commits_path(project_id: u64) -> String {
    format!("/projects/{project_id}/repository/commits")
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
