use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use time::OffsetDateTime;

use crate::error::Result;
use crate::types::{ActivityEvent, CommitRef, UserInfo};

/// Source of a user's activity timeline. Implemented by the GitLab HTTP
/// client and by `ScriptedFeed` (tests).
pub trait ActivityFeed {
    /// The authenticated account.
    fn current_user(&self) -> Result<UserInfo>;

    /// Events created strictly after `after`, oldest first, one page.
    /// An empty page means the feed is exhausted.
    fn list_events(&self, user_id: u64, after: OffsetDateTime) -> Result<Vec<ActivityEvent>>;

    /// Commits of a push event authored by `committer_email`, oldest first,
    /// at most `commit_count` of them.
    fn list_commits_in_range(
        &self,
        event: &ActivityEvent,
        committer_email: &str,
    ) -> Result<Vec<CommitRef>>;
}

/// Shape a raw commit-range response (newest first, possibly longer than the
/// push) into the pushed commits in the order they were authored.
pub fn order_commit_range(mut newest_first: Vec<CommitRef>, commit_count: u32) -> Vec<CommitRef> {
    newest_first.truncate(commit_count as usize);
    newest_first.reverse();
    newest_first
}

// ── Scripted feed ──

/// In-memory feed serving pre-recorded pages (for testing).
///
/// Commit ranges are stored the way the platform returns them (newest
/// first) and shaped with [`order_commit_range`] on the way out.
pub struct ScriptedFeed {
    user: UserInfo,
    pages: RefCell<VecDeque<Vec<ActivityEvent>>>,
    ranges: HashMap<u64, Vec<CommitRef>>,
    event_queries: RefCell<Vec<OffsetDateTime>>,
    range_queries: RefCell<Vec<(u64, String)>>,
}

impl ScriptedFeed {
    pub fn new(user: UserInfo) -> Self {
        Self {
            user,
            pages: RefCell::new(VecDeque::new()),
            ranges: HashMap::new(),
            event_queries: RefCell::new(Vec::new()),
            range_queries: RefCell::new(Vec::new()),
        }
    }

    /// Queue a page; once all queued pages are served the feed returns
    /// empty pages.
    pub fn with_page(self, events: Vec<ActivityEvent>) -> Self {
        self.pages.borrow_mut().push_back(events);
        self
    }

    /// Register the raw (newest first) commit range for a push event.
    pub fn with_range(mut self, event_id: u64, newest_first: Vec<CommitRef>) -> Self {
        self.ranges.insert(event_id, newest_first);
        self
    }

    /// The `after` argument of every `list_events` call, in order.
    pub fn event_queries(&self) -> Vec<OffsetDateTime> {
        self.event_queries.borrow().clone()
    }

    /// `(event id, author email)` of every commit-range call, in order.
    pub fn range_queries(&self) -> Vec<(u64, String)> {
        self.range_queries.borrow().clone()
    }
}

impl ActivityFeed for ScriptedFeed {
    fn current_user(&self) -> Result<UserInfo> {
        Ok(self.user.clone())
    }

    fn list_events(&self, _user_id: u64, after: OffsetDateTime) -> Result<Vec<ActivityEvent>> {
        self.event_queries.borrow_mut().push(after);
        Ok(self.pages.borrow_mut().pop_front().unwrap_or_default())
    }

    fn list_commits_in_range(
        &self,
        event: &ActivityEvent,
        committer_email: &str,
    ) -> Result<Vec<CommitRef>> {
        self.range_queries
            .borrow_mut()
            .push((event.id, committer_email.to_string()));
        let raw = self.ranges.get(&event.id).cloned().unwrap_or_default();
        Ok(order_commit_range(raw, event.commit_count()))
    }
}
