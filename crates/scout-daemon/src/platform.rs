use async_trait::async_trait;
use scout_core::error::CollaboratorError;
use scout_core::sinks::Platform;
use tracing::info;
use uuid::Uuid;

/// Platform adapter that only writes to the log.
///
/// Used when the daemon runs without a chat connection; board handles are
/// freshly generated ids so the rest of the pipeline behaves normally.
#[derive(Debug, Default, Clone)]
pub struct LogPlatform;

impl LogPlatform {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Platform for LogPlatform {
    async fn send_notification(
        &self,
        tenant_id: &str,
        channel: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        info!(tenant_id, channel, text, "notification");
        Ok(())
    }

    async fn post_board(
        &self,
        tenant_id: &str,
        channel: &str,
        text: &str,
    ) -> Result<String, CollaboratorError> {
        let handle = Uuid::new_v4().to_string();
        info!(tenant_id, channel, message_ref = %handle, lines = text.lines().count(), "board posted");
        Ok(handle)
    }

    async fn edit_board(
        &self,
        tenant_id: &str,
        channel: &str,
        message_ref: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        info!(tenant_id, channel, message_ref, lines = text.lines().count(), "board edited");
        Ok(())
    }

    async fn delete_board(
        &self,
        tenant_id: &str,
        channel: &str,
        message_ref: &str,
    ) -> Result<(), CollaboratorError> {
        info!(tenant_id, channel, message_ref, "board deleted");
        Ok(())
    }
}
