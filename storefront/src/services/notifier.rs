// storefront/src/services/notifier.rs

//! Bounded background delivery queue. Request paths only ever `try_send`; one
//! worker drains the queue into the messaging channel.

use crate::services::messaging::MessagingChannel;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
  Buyer { user_id: i64, text: String },
  Operators { text: String },
}

#[derive(Clone)]
pub struct NotificationQueue {
  tx: mpsc::Sender<Notification>,
}

impl NotificationQueue {
  pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Self { tx }, rx)
  }

  /// Never waits. Returns `false` when the message was dropped.
  pub fn enqueue(&self, notification: Notification) -> bool {
    match self.tx.try_send(notification) {
      Ok(()) => true,
      Err(TrySendError::Full(dropped)) => {
        error!(notification = ?dropped, "Notification queue full; message dropped.");
        false
      }
      Err(TrySendError::Closed(dropped)) => {
        error!(notification = ?dropped, "Notification worker gone; message dropped.");
        false
      }
    }
  }

  pub fn notify_buyer(&self, user_id: i64, text: impl Into<String>) -> bool {
    self.enqueue(Notification::Buyer {
      user_id,
      text: text.into(),
    })
  }

  pub fn notify_operators(&self, text: impl Into<String>) -> bool {
    self.enqueue(Notification::Operators { text: text.into() })
  }
}

/// Runs until every [`NotificationQueue`] clone has been dropped.
pub fn spawn_notification_worker(
  mut rx: mpsc::Receiver<Notification>,
  channel: Arc<dyn MessagingChannel>,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    info!("Notification worker started.");
    while let Some(notification) = rx.recv().await {
      match notification {
        Notification::Buyer { user_id, text } => {
          if let Err(e) = channel.send_to_user(user_id, &text).await {
            error!(user_id, error = %e, "Failed to deliver buyer notification.");
          }
        }
        Notification::Operators { text } => {
          channel.send_to_operators(&text).await;
        }
      }
      debug!("Notification processed.");
    }
    info!("Notification worker stopped.");
  })
}
