use crate::audit::AuditRecord;
use thiserror::Error;
use tokio::sync::mpsc;

/// Tags attached to every audit event.
pub const AUDIT_TAGS: [&str; 2] = ["boombox", "error"];

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Audit sink is closed")]
    Closed,
}

/// Where audit records go.
///
/// `emit` runs after the response has been handed back, on tokio's blocking
/// pool when there is a runtime. Errors and panics are swallowed by the caller.
pub trait AuditSink: Send + Sync + 'static {
    fn emit(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Emits each record as a `tracing` error event under the `boombox` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn emit(&self, record: AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(&record)?;
        tracing::error!(
            target: "boombox",
            tags = ?AUDIT_TAGS,
            request_id = %record.request.id,
            status = record.request.status_code,
            record = %json,
            "remapped server error"
        );
        Ok(())
    }
}

/// Forwards records over an unbounded channel to whoever consumes them.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelSink {
    fn emit(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.tx.send(record).map_err(|_| AuditError::Closed)
    }
}
