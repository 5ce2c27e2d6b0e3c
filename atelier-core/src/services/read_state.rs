use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AtelierResult;
use crate::models::{ArchiveFilter, Identity};
use crate::repo::InboxStore;

use super::participants::ParticipantDirectory;

/// Derives unread counts from the per-message read flag and flips it.
pub struct ReadStateTracker {
    store: Arc<dyn InboxStore>,
    clock: Arc<dyn Clock>,
    directory: ParticipantDirectory,
}

impl ReadStateTracker {
    pub fn new(store: Arc<dyn InboxStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory: ParticipantDirectory::new(store.clone()),
            store,
            clock,
        }
    }

    /// Every listed thread gets an entry; threads with nothing unread map to 0.
    pub async fn unread_counts(
        &self,
        viewer_id: Uuid,
        thread_ids: &[Uuid],
    ) -> AtelierResult<HashMap<Uuid, i64>> {
        let mut counts: HashMap<Uuid, i64> = thread_ids.iter().map(|id| (*id, 0)).collect();
        if thread_ids.is_empty() {
            return Ok(counts);
        }

        for (thread_id, count) in self.store.unread_counts(viewer_id, thread_ids).await? {
            counts.insert(thread_id, count);
        }
        Ok(counts)
    }

    /// Marks every message the reader did not send as read. Returns how many flipped.
    pub async fn mark_thread_read(&self, reader: &Identity, thread_id: Uuid) -> AtelierResult<u64> {
        let thread = self.directory.accessible_thread(reader, thread_id).await?;

        let mut tx = self.store.begin().await?;
        let marked = tx.mark_read(thread.id, reader.id, self.clock.now()).await?;
        tx.commit().await?;

        if marked > 0 {
            info!(thread_id = %thread_id, reader_id = %reader.id, marked, "Thread marked read");
        } else {
            debug!(thread_id = %thread_id, reader_id = %reader.id, "Thread already read");
        }
        Ok(marked)
    }

    /// Unread messages across the viewer's visible, non-archived threads.
    pub async fn total_unread(&self, viewer: &Identity) -> AtelierResult<i64> {
        let threads = if viewer.is_staff() {
            self.store.list_threads().await?
        } else {
            self.store.list_threads_visible_to(viewer.id).await?
        };

        let ids: Vec<Uuid> = threads
            .iter()
            .filter(|t| ArchiveFilter::Active.matches(t))
            .map(|t| t.id)
            .collect();

        let counts = self.unread_counts(viewer.id, &ids).await?;
        Ok(counts.values().sum())
    }
}
