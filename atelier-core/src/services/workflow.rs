use async_trait::async_trait;
use tracing::info;

use crate::config::WorkflowConfig;
use crate::error::{AtelierError, AtelierResult};
use crate::models::{Identity, Message, Thread, ThreadStatus};
use crate::repo::StoreTx;

use super::message_log::AppendObserver;

/// Gatekeeper for thread status changes.
#[derive(Debug, Clone, Copy)]
pub struct StatusWorkflow {
    enforce: bool,
}

impl Default for StatusWorkflow {
    fn default() -> Self {
        Self { enforce: true }
    }
}

impl StatusWorkflow {
    pub fn new(enforce: bool) -> Self {
        Self { enforce }
    }

    pub fn permissive() -> Self {
        Self { enforce: false }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::new(config.enforce_transitions)
    }

    pub fn is_enforced(&self) -> bool {
        self.enforce
    }

    pub fn allowed_next(&self, current: ThreadStatus) -> &'static [ThreadStatus] {
        current.allowed_next()
    }

    /// Setting the current status again always passes.
    pub fn check(&self, from: ThreadStatus, to: ThreadStatus) -> AtelierResult<()> {
        if !self.enforce || from.can_transition_to(to) {
            return Ok(());
        }
        Err(AtelierError::InvalidStatusTransition { from, to })
    }

    /// Status a staff reply moves a client-owned thread to, if any.
    pub fn implicit_after_append(&self, thread: &Thread, sender: &Identity) -> Option<ThreadStatus> {
        let applies = sender.is_staff()
            && thread.owner_client_id.is_some()
            && thread.status == ThreadStatus::New;
        applies.then_some(ThreadStatus::Contacted)
    }
}

/// Moves a new client thread to `contacted` on the first staff reply.
pub struct AutoContactObserver {
    workflow: StatusWorkflow,
}

impl AutoContactObserver {
    pub fn new(workflow: StatusWorkflow) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl AppendObserver for AutoContactObserver {
    fn name(&self) -> &str {
        "auto_contact"
    }

    async fn on_append(
        &self,
        tx: &mut dyn StoreTx,
        thread: &mut Thread,
        sender: &Identity,
        _message: &Message,
    ) -> AtelierResult<()> {
        let Some(next) = self.workflow.implicit_after_append(thread, sender) else {
            return Ok(());
        };

        tx.set_status(thread.id, next).await?;
        info!(
            thread_id = %thread.id,
            sender_id = %sender.id,
            from = %thread.status,
            to = %next,
            "Thread status advanced by staff reply"
        );
        thread.status = next;
        Ok(())
    }
}
