//! Event classification: how many work units an activity event produces.

use crate::error::Result;
use crate::feed::ActivityFeed;
use crate::types::{action, message, target, ActivityEvent, WorkUnit};

/// What to do with one activity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Materialize these units as-is.
    Emit(Vec<WorkUnit>),
    /// Query the push's commit range, emit one unit per commit, then the
    /// trailer (if any) after all of them.
    Expand { trailer: Option<WorkUnit> },
    /// Nothing to record for this action.
    Unhandled,
}

/// Decide how an event is reconstructed. First matching rule wins.
pub fn plan(event: &ActivityEvent) -> Plan {
    let count = event.commit_count();
    let at = event.created_at;
    match event.action_name.as_str() {
        action::PUSHED_NEW if count == 1 => {
            Plan::Emit(vec![WorkUnit::new(message::PUSHED_NEW_BRANCH, at)])
        }
        action::PUSHED_TO if count == 1 => {
            Plan::Emit(vec![WorkUnit::new(message::CREATED_COMMIT, at)])
        }
        action::PUSHED_NEW if count > 1 => Plan::Expand {
            trailer: Some(WorkUnit::new(message::PUSHED_NEW_BRANCH, at)),
        },
        action::PUSHED_TO if count > 1 => Plan::Expand { trailer: None },
        action::OPENED if event.target_type.as_deref() == Some(target::MERGE_REQUEST) => {
            Plan::Emit(vec![WorkUnit::new(message::OPENED_MERGE_REQUEST, at)])
        }
        _ => Plan::Unhandled,
    }
}

/// Turn an event into its ordered work units, expanding multi-commit
/// pushes through `feed`.
pub fn reconstruct(
    event: &ActivityEvent,
    feed: &dyn ActivityFeed,
    committer_email: &str,
) -> Result<Vec<WorkUnit>> {
    match plan(event) {
        Plan::Emit(units) => Ok(units),
        Plan::Expand { trailer } => {
            let commits = feed.list_commits_in_range(event, committer_email)?;
            tracing::debug!(
                event_id = event.id,
                ref_name = event.pushed_ref().unwrap_or("-"),
                expected = event.commit_count(),
                found = commits.len(),
                "expanded push"
            );
            let mut units: Vec<WorkUnit> = commits
                .into_iter()
                .map(|c| WorkUnit::new(message::CREATED_COMMIT, c.authored_at))
                .collect();
            units.extend(trailer);
            Ok(units)
        }
        Plan::Unhandled => Ok(Vec::new()),
    }
}
