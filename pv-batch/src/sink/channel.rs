//! Queue-backed outreach dispatch
//!
//! Forwards drafts to a worker over a bounded `tokio` channel. Sending waits
//! for capacity, so a slow worker applies back-pressure to the batch.

use super::OutreachDispatcher;
use crate::error::SinkError;
use crate::types::OutreachDraft;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub struct ChannelDispatcher {
    tx: mpsc::Sender<OutreachDraft>,
}

impl ChannelDispatcher {
    pub fn new(tx: mpsc::Sender<OutreachDraft>) -> Self {
        Self { tx }
    }

    /// Dispatcher plus the receiving end for the worker
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutreachDraft>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl OutreachDispatcher for ChannelDispatcher {
    fn name(&self) -> &'static str {
        "Channel"
    }

    async fn dispatch(&self, draft: &OutreachDraft) -> Result<(), SinkError> {
        self.tx
            .send(draft.clone())
            .await
            .map_err(|_| SinkError::Closed("outreach worker stopped".to_string()))
    }
}
