use futures::{
    future,
    stream::{self, Stream, StreamExt},
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::warn;
use uuid::Uuid;

use crate::messaging::thread::MessageThread;
use crate::models::messaging::MessageRow;

/// Yields the stored backlog, then live messages from `rx`.
///
/// `rx` must be subscribed before the backlog is read. A live message whose id is
/// already in the backlog (or was already yielded) is skipped. A lagged receiver
/// logs the gap and keeps going; the client fills it by polling with `since`.
pub fn backlog_then_live(
    conversation_id: Uuid,
    backlog: Vec<MessageRow>,
    rx: broadcast::Receiver<MessageRow>,
) -> impl Stream<Item = MessageRow> {
    let mut thread = MessageThread::from_history(backlog.clone());

    let live = BroadcastStream::new(rx).filter_map(move |item| {
        let message = match item {
            Ok(message) => thread.apply_remote(message.clone()).then_some(message),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Stream for {conversation_id} lagged, {skipped} messages skipped");
                None
            }
        };
        future::ready(message)
    });

    stream::iter(backlog).chain(live)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn message(conversation_id: Uuid, offset_secs: i64) -> MessageRow {
        MessageRow {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Uuid::new_v4(),
            content: format!("message {offset_secs}"),
            client_id: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn ids(messages: &[MessageRow]) -> Vec<Uuid> {
        messages.iter().map(|m| m.id).collect()
    }

    #[tokio::test]
    async fn test_backlog_comes_before_live() {
        let conv = Uuid::new_v4();
        let old = message(conv, 0);
        let new = message(conv, 10);
        let (tx, rx) = broadcast::channel(8);

        tx.send(new.clone()).unwrap();
        drop(tx);

        let sent: Vec<_> = backlog_then_live(conv, vec![old.clone()], rx)
            .collect()
            .await;
        assert_eq!(ids(&sent), vec![old.id, new.id]);
    }

    #[tokio::test]
    async fn test_message_in_backlog_and_live_sent_once() {
        let conv = Uuid::new_v4();
        let raced = message(conv, 0);
        let later = message(conv, 5);
        let (tx, rx) = broadcast::channel(8);

        // Stored and published between subscribe and the backlog read.
        tx.send(raced.clone()).unwrap();
        tx.send(later.clone()).unwrap();
        tx.send(later.clone()).unwrap();
        drop(tx);

        let sent: Vec<_> = backlog_then_live(conv, vec![raced.clone()], rx)
            .collect()
            .await;
        assert_eq!(ids(&sent), vec![raced.id, later.id]);
    }

    #[tokio::test]
    async fn test_lagged_receiver_skips_gap_and_continues() {
        let conv = Uuid::new_v4();
        let (tx, rx) = broadcast::channel(2);
        let published: Vec<_> = (0..5).map(|i| message(conv, i)).collect();
        for m in &published {
            tx.send(m.clone()).unwrap();
        }
        drop(tx);

        let sent: Vec<_> = backlog_then_live(conv, Vec::new(), rx).collect().await;
        assert_eq!(ids(&sent), ids(&published[3..]));
    }
}
