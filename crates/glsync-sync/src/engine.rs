use std::time::Duration;

use glsync_core::{plan, reconstruct, ActivityEvent, ActivityFeed, Plan, Result};

use crate::materialize::Materializer;

/// Counters for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Pages that contained at least one new event.
    pub pages: usize,
    pub events: usize,
    /// Work units materialized (one git commit each).
    pub units: usize,
    /// Units already covered by the checkpoint the run started from.
    pub skipped: usize,
    /// Events whose action is not recorded.
    pub unhandled: usize,
}

/// Fetch → classify → materialize until the feed runs dry.
pub struct SyncEngine<'a> {
    feed: &'a dyn ActivityFeed,
    materializer: Materializer<'a>,
    pacing: Duration,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        feed: &'a dyn ActivityFeed,
        materializer: Materializer<'a>,
        pacing: Duration,
    ) -> Self {
        Self {
            feed,
            materializer,
            pacing,
        }
    }

    /// Run until a page with no new events comes back. Any error stops the
    /// run; the checkpoint stays at the last unit written.
    pub fn run(&mut self) -> Result<SyncReport> {
        let user = self.feed.current_user()?;
        tracing::info!(
            user = %user.username,
            since = %self.materializer.checkpoint(),
            "sync started"
        );

        let mut report = SyncReport::default();
        loop {
            let since = self.materializer.checkpoint();
            let page = self.feed.list_events(user.id, since)?;
            let fetched = page.len();
            let events: Vec<ActivityEvent> = page
                .into_iter()
                .filter(|e| e.created_at > since)
                .collect();
            if events.is_empty() {
                if fetched > 0 {
                    tracing::debug!(fetched, "page holds only recorded events");
                }
                break;
            }

            report.pages += 1;
            for event in &events {
                self.process(event, user.author_email(), &mut report)?;
            }
            tracing::info!(
                page = report.pages,
                events = events.len(),
                checkpoint = %self.materializer.checkpoint(),
                "page recorded"
            );
            std::thread::sleep(self.pacing);
        }

        tracing::info!(
            pages = report.pages,
            events = report.events,
            units = report.units,
            skipped = report.skipped,
            unhandled = report.unhandled,
            "sync finished"
        );
        Ok(report)
    }

    fn process(
        &mut self,
        event: &ActivityEvent,
        committer_email: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        report.events += 1;
        if matches!(plan(event), Plan::Unhandled) {
            report.unhandled += 1;
            tracing::info!(
                event_id = event.id,
                action = %event.action_name,
                target_type = event.target_type.as_deref().unwrap_or("-"),
                "not handled"
            );
            return self.materializer.complete_event(event.created_at);
        }

        let units = reconstruct(event, self.feed, committer_email)?;
        if units.is_empty() {
            tracing::info!(
                event_id = event.id,
                ref_name = event.pushed_ref().unwrap_or("-"),
                expected = event.commit_count(),
                "push expanded to no commits"
            );
        }
        for unit in &units {
            if self.materializer.materialize(unit)? {
                report.units += 1;
            } else {
                report.skipped += 1;
            }
        }
        self.materializer.complete_event(event.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::RecordingVcs;
    use glsync_core::{CommitRef, PushData, ScriptedFeed, UserInfo};
    use glsync_store::{CheckpointStore, SyncPaths};
    use time::macros::datetime;
    use time::{OffsetDateTime, UtcOffset};

    const START: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

    fn user() -> UserInfo {
        UserInfo {
            id: 11,
            username: "dev".into(),
            commit_email: Some("dev@example.com".into()),
            email: None,
        }
    }

    fn event(
        id: u64,
        action: &str,
        at: OffsetDateTime,
        push: Option<(u32, Option<&str>)>,
    ) -> ActivityEvent {
        ActivityEvent {
            id,
            project_id: 5,
            action_name: action.into(),
            target_type: None,
            created_at: at,
            push_data: push.map(|(count, from)| PushData {
                commit_count: count,
                commit_from: from.map(Into::into),
                commit_to: Some(format!("head{id}")),
                ref_name: Some("main".into()),
            }),
        }
    }

    fn commit(id: &str, at: OffsetDateTime) -> CommitRef {
        CommitRef {
            id: id.into(),
            title: String::new(),
            authored_at: at,
        }
    }

    fn paths_at(dir: &std::path::Path) -> SyncPaths {
        let paths = SyncPaths::discover(dir);
        CheckpointStore::new(paths.clone()).set(START).unwrap();
        paths
    }

    fn run(feed: &ScriptedFeed, paths: &SyncPaths, vcs: &RecordingVcs) -> SyncReport {
        let m = Materializer::new(paths.clone(), vcs, UtcOffset::UTC).unwrap();
        SyncEngine::new(feed, m, Duration::ZERO).run().unwrap()
    }

    #[test]
    fn stops_after_one_cycle_when_feed_runs_dry() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let feed = ScriptedFeed::new(user()).with_page(vec![event(
            1,
            "pushed to",
            datetime!(2024-02-01 10:00 UTC),
            Some((1, Some("base"))),
        )]);
        let vcs = RecordingVcs::new();

        let report = run(&feed, &paths, &vcs);
        assert_eq!(report.pages, 1);
        assert_eq!(report.units, 1);
        assert_eq!(feed.event_queries().len(), 2);
        // The second query starts where the first page ended.
        assert_eq!(feed.event_queries()[0], START);
        assert_eq!(feed.event_queries()[1], datetime!(2024-02-01 10:00 UTC));
    }

    #[test]
    fn second_run_with_empty_feed_records_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let first = ScriptedFeed::new(user()).with_page(vec![
            event(1, "pushed to", datetime!(2024-02-01 10:00 UTC), Some((1, Some("a")))),
            event(2, "pushed new", datetime!(2024-02-01 11:00 UTC), Some((1, None))),
        ]);
        let vcs = RecordingVcs::new();
        assert_eq!(run(&first, &paths, &vcs).units, 2);

        let second = ScriptedFeed::new(user());
        let vcs_again = RecordingVcs::new();
        let report = run(&second, &paths, &vcs_again);
        assert_eq!(report, SyncReport::default());
        assert!(vcs_again.commits().is_empty());
        assert_eq!(second.event_queries(), vec![datetime!(2024-02-01 11:00 UTC)]);
    }

    #[test]
    fn replayed_events_are_not_recorded_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let page = vec![event(
            1,
            "pushed to",
            datetime!(2024-02-01 10:00 UTC),
            Some((1, Some("a"))),
        )];
        let vcs = RecordingVcs::new();
        run(&ScriptedFeed::new(user()).with_page(page.clone()), &paths, &vcs);

        // A platform that ignores `after` serves the same page again.
        let vcs_again = RecordingVcs::new();
        let report = run(&ScriptedFeed::new(user()).with_page(page), &paths, &vcs_again);
        assert_eq!(report.units, 0);
        assert!(vcs_again.commits().is_empty());
    }

    #[test]
    fn multi_commit_push_is_recorded_oldest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let t1 = datetime!(2024-03-01 08:00 UTC);
        let t2 = datetime!(2024-03-01 09:00 UTC);
        let t3 = datetime!(2024-03-01 10:00 UTC);
        let pushed_at = datetime!(2024-03-01 10:05 UTC);
        let feed = ScriptedFeed::new(user())
            .with_page(vec![event(7, "pushed to", pushed_at, Some((3, Some("base"))))])
            .with_range(7, vec![commit("c3", t3), commit("c2", t2), commit("c1", t1)]);
        let vcs = RecordingVcs::new();

        run(&feed, &paths, &vcs);
        let times: Vec<_> = vcs.commits().into_iter().map(|(_, at)| at).collect();
        assert_eq!(times, vec![t1, t2, t3]);
        assert_eq!(feed.range_queries(), vec![(7, "dev@example.com".to_string())]);
        assert_eq!(CheckpointStore::new(paths).get().unwrap(), pushed_at);
    }

    #[test]
    fn new_branch_marker_follows_its_commits() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let t1 = datetime!(2024-03-02 08:00 UTC);
        let t2 = datetime!(2024-03-02 09:00 UTC);
        // Created before the commits' author dates.
        let created = datetime!(2024-03-01 07:00 UTC);
        let feed = ScriptedFeed::new(user())
            .with_page(vec![event(8, "pushed new", created, Some((2, None)))])
            .with_range(8, vec![commit("c2", t2), commit("c1", t1)]);
        let vcs = RecordingVcs::new();

        run(&feed, &paths, &vcs);
        assert_eq!(
            vcs.commits(),
            vec![
                ("[sync] created a commit".to_string(), t1),
                ("[sync] created a commit".to_string(), t2),
                ("[sync] pushed new branch".to_string(), created),
            ]
        );
    }

    #[test]
    fn resume_after_failed_expansion_skips_recorded_commits() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let t1 = datetime!(2024-03-01 08:00 UTC);
        let t2 = datetime!(2024-03-01 09:00 UTC);
        let t3 = datetime!(2024-03-01 10:00 UTC);
        let pushed_at = datetime!(2024-03-01 10:05 UTC);
        let feed = || {
            ScriptedFeed::new(user())
                .with_page(vec![event(7, "pushed to", pushed_at, Some((3, Some("base"))))])
                .with_range(7, vec![commit("c3", t3), commit("c2", t2), commit("c1", t1)])
        };

        // The second commit fails after its line and checkpoint are written.
        let vcs = RecordingVcs::failing_after(1);
        let m = Materializer::new(paths.clone(), &vcs, UtcOffset::UTC).unwrap();
        assert!(SyncEngine::new(&feed(), m, Duration::ZERO).run().is_err());
        assert_eq!(vcs.commits().len(), 1);
        assert_eq!(CheckpointStore::new(paths.clone()).get().unwrap(), t2);

        let vcs_again = RecordingVcs::new();
        let report = run(&feed(), &paths, &vcs_again);
        assert_eq!(
            vcs_again.commits(),
            vec![("[sync] created a commit".to_string(), t3)]
        );
        assert_eq!(report.units, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(CheckpointStore::new(paths).get().unwrap(), pushed_at);
    }

    #[test]
    fn push_with_no_matching_commits_is_not_unhandled() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let pushed_at = datetime!(2024-03-04 12:00 UTC);
        // No range scripted: the author filter matched nothing.
        let feed = ScriptedFeed::new(user()).with_page(vec![event(
            9,
            "pushed to",
            pushed_at,
            Some((2, Some("base"))),
        )]);
        let vcs = RecordingVcs::new();

        let report = run(&feed, &paths, &vcs);
        assert_eq!(report.events, 1);
        assert_eq!(report.unhandled, 0);
        assert_eq!(report.units, 0);
        assert_eq!(feed.range_queries().len(), 1);
        assert_eq!(CheckpointStore::new(paths).get().unwrap(), pushed_at);
    }

    #[test]
    fn unhandled_actions_do_not_stop_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let mut closed = event(1, "closed", datetime!(2024-04-01 09:00 UTC), None);
        closed.target_type = Some("MergeRequest".into());
        let mut opened = event(2, "opened", datetime!(2024-04-01 10:00 UTC), None);
        opened.target_type = Some("MergeRequest".into());
        let feed = ScriptedFeed::new(user()).with_page(vec![closed, opened]);
        let vcs = RecordingVcs::new();

        let report = run(&feed, &paths, &vcs);
        assert_eq!(report.events, 2);
        assert_eq!(report.unhandled, 1);
        assert_eq!(
            vcs.commits(),
            vec![(
                "[sync] opened merge request".to_string(),
                datetime!(2024-04-01 10:00 UTC)
            )]
        );
    }

    #[test]
    fn trailing_unhandled_event_still_advances_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let feed = ScriptedFeed::new(user()).with_page(vec![event(
            1,
            "joined",
            datetime!(2024-04-02 09:00 UTC),
            None,
        )]);
        let vcs = RecordingVcs::new();

        run(&feed, &paths, &vcs);
        assert!(vcs.commits().is_empty());
        assert_eq!(
            CheckpointStore::new(paths).get().unwrap(),
            datetime!(2024-04-02 09:00 UTC)
        );
    }

    #[test]
    fn commit_failure_aborts_with_checkpoint_at_last_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_at(tmp.path());
        let feed = ScriptedFeed::new(user()).with_page(vec![
            event(1, "pushed to", datetime!(2024-05-01 09:00 UTC), Some((1, Some("a")))),
            event(2, "pushed to", datetime!(2024-05-01 10:00 UTC), Some((1, Some("b")))),
            event(3, "pushed to", datetime!(2024-05-01 11:00 UTC), Some((1, Some("c")))),
        ]);
        let vcs = RecordingVcs::failing_after(1);
        let m = Materializer::new(paths.clone(), &vcs, UtcOffset::UTC).unwrap();

        let result = SyncEngine::new(&feed, m, Duration::ZERO).run();
        assert!(result.is_err());
        assert_eq!(vcs.commits().len(), 1);
        assert_eq!(
            CheckpointStore::new(paths).get().unwrap(),
            datetime!(2024-05-01 10:00 UTC)
        );
    }
}
