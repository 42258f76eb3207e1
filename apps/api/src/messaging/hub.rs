use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::messaging::MessageRow;

/// Buffered messages per conversation before a slow subscriber starts lagging.
pub const CHANNEL_CAPACITY: usize = 256;

/// In-process fan-out of stored messages, one broadcast channel per conversation.
/// Channels are created on first subscribe. Channels nobody listens to are dropped
/// on the next subscribe or on a publish that reaches no one.
#[derive(Clone, Default)]
pub struct MessageHub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<MessageRow>>>>,
}

impl MessageHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, conversation_id: Uuid) -> broadcast::Receiver<MessageRow> {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
        channels
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Returns the number of live subscribers that received the message.
    pub async fn publish(&self, message: &MessageRow) -> usize {
        let delivered = {
            let channels = self.channels.read().await;
            match channels.get(&message.conversation_id) {
                Some(tx) => tx.send(message.clone()).unwrap_or(0),
                None => return 0,
            }
        };

        if delivered == 0 {
            let mut channels = self.channels.write().await;
            if channels
                .get(&message.conversation_id)
                .is_some_and(|tx| tx.receiver_count() == 0)
            {
                channels.remove(&message.conversation_id);
            }
        }
        delivered
    }

    #[cfg(test)]
    async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}
