use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::AtelierResult;
use crate::models::{Identity, InboxFilter, LatestMessage, Thread, ThreadSummary};
use crate::repo::InboxStore;

use super::read_state::ReadStateTracker;

/// Builds a viewer's inbox: visible threads, their latest message and unread count.
pub struct InboxProjector {
    store: Arc<dyn InboxStore>,
    read_state: Arc<ReadStateTracker>,
}

impl InboxProjector {
    pub fn new(store: Arc<dyn InboxStore>, read_state: Arc<ReadStateTracker>) -> Self {
        Self { store, read_state }
    }

    pub async fn inbox_for(
        &self,
        viewer: &Identity,
        filter: &InboxFilter,
    ) -> AtelierResult<Vec<ThreadSummary>> {
        let threads: Vec<Thread> = if viewer.is_staff() {
            self.store.list_threads().await?
        } else {
            self.store.list_threads_visible_to(viewer.id).await?
        };

        let threads: Vec<Thread> = threads
            .into_iter()
            .filter(|t| filter.matches_thread(t))
            .collect();
        let ids: Vec<Uuid> = threads.iter().map(|t| t.id).collect();

        let latest: HashMap<Uuid, LatestMessage> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .latest_messages(&ids)
                .await?
                .into_iter()
                .map(|m| (m.thread_id, m))
                .collect()
        };
        let counts = self.read_state.unread_counts(viewer.id, &ids).await?;

        let mut summaries: Vec<ThreadSummary> = threads
            .into_iter()
            .map(|thread| {
                let last = latest.get(&thread.id);
                let unread = counts.get(&thread.id).copied().unwrap_or(0);
                ThreadSummary::new(thread, last, unread)
            })
            .collect();

        if filter.unread_only {
            summaries.retain(ThreadSummary::has_unread);
        }

        summaries.sort_by(inbox_order);

        debug!(
            viewer_id = %viewer.id,
            role = %viewer.role,
            count = summaries.len(),
            "Inbox projected"
        );
        Ok(summaries)
    }
}

/// Most recent activity first, then newest thread, then id.
pub fn inbox_order(a: &ThreadSummary, b: &ThreadSummary) -> Ordering {
    b.thread
        .last_message_at
        .cmp(&a.thread.last_message_at)
        .then_with(|| b.thread.created_at.cmp(&a.thread.created_at))
        .then_with(|| a.thread.id.cmp(&b.thread.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreadType;
    use chrono::{Duration, Utc};

    fn summary_at(minutes_ago: i64) -> ThreadSummary {
        let now = Utc::now();
        let mut thread = Thread::new("t", ThreadType::General, now - Duration::hours(1));
        thread.last_message_at = now - Duration::minutes(minutes_ago);
        ThreadSummary::new(thread, None, 0)
    }

    #[test]
    fn test_inbox_order_newest_activity_first() {
        let mut summaries = vec![summary_at(30), summary_at(5), summary_at(10)];
        summaries.sort_by(inbox_order);

        let times: Vec<_> = summaries.iter().map(|s| s.last_message_at()).collect();
        assert!(times.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_inbox_order_ties_break_on_created_at() {
        let now = Utc::now();
        let mut older = Thread::new("older", ThreadType::General, now - Duration::hours(2));
        older.last_message_at = now;
        let mut newer = Thread::new("newer", ThreadType::General, now - Duration::hours(1));
        newer.last_message_at = now;

        let mut summaries = vec![
            ThreadSummary::new(older, None, 0),
            ThreadSummary::new(newer, None, 0),
        ];
        summaries.sort_by(inbox_order);

        assert_eq!(summaries[0].thread.subject, "newer");
    }
}
