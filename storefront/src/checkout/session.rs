// storefront/src/checkout/session.rs

use crate::models::PaymentMethod;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as TurnLock, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Where a buyer is in the checkout conversation. Later steps carry everything
/// collected so far, so a step can never be reached without its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
  AwaitPaymentMethod,
  AwaitPhone {
    method: PaymentMethod,
  },
  AwaitName {
    method: PaymentMethod,
    phone: String,
  },
  AwaitCity {
    method: PaymentMethod,
    phone: String,
    name: String,
  },
  AwaitDeliveryPoint {
    method: PaymentMethod,
    phone: String,
    name: String,
    city: String,
  },
}

impl CheckoutStep {
  pub fn label(&self) -> &'static str {
    match self {
      CheckoutStep::AwaitPaymentMethod => "await_payment_method",
      CheckoutStep::AwaitPhone { .. } => "await_phone",
      CheckoutStep::AwaitName { .. } => "await_name",
      CheckoutStep::AwaitCity { .. } => "await_city",
      CheckoutStep::AwaitDeliveryPoint { .. } => "await_delivery_point",
    }
  }
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
  pub order_id: Uuid,
  pub step: CheckoutStep,
  pub last_activity: Instant,
}

impl CheckoutSession {
  pub fn new(order_id: Uuid, step: CheckoutStep) -> Self {
    Self {
      order_id,
      step,
      last_activity: Instant::now(),
    }
  }
}

/// One in-progress checkout per buyer, in process memory only.
#[derive(Default)]
pub struct SessionRegistry {
  sessions: Mutex<HashMap<i64, CheckoutSession>>,
  turns: Mutex<HashMap<i64, Arc<TurnLock<()>>>>,
}

impl SessionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Serializes turns of one buyer. Hold the guard for the whole turn, including
  /// any storage or provider calls it makes.
  pub async fn begin_turn(&self, user_id: i64) -> OwnedMutexGuard<()> {
    let lock = self.turns.lock().entry(user_id).or_default().clone();
    lock.lock_owned().await
  }

  pub fn get(&self, user_id: i64) -> Option<CheckoutSession> {
    self.sessions.lock().get(&user_id).cloned()
  }

  /// Stores `session` as the buyer's only session, stamping its activity time.
  /// Returns the session it replaced, if any.
  pub fn put(&self, user_id: i64, mut session: CheckoutSession) -> Option<CheckoutSession> {
    session.last_activity = Instant::now();
    self.sessions.lock().insert(user_id, session)
  }

  pub fn remove(&self, user_id: i64) -> Option<CheckoutSession> {
    self.sessions.lock().remove(&user_id)
  }

  pub fn len(&self) -> usize {
    self.sessions.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.lock().is_empty()
  }

  /// Drops sessions idle for longer than `idle`. Orders are left untouched.
  pub fn evict_idle(&self, idle: Duration) -> usize {
    let now = Instant::now();
    let mut sessions = self.sessions.lock();
    let before = sessions.len();
    sessions.retain(|_, s| now.duration_since(s.last_activity) <= idle);
    let evicted = before - sessions.len();
    drop(sessions);
    // Locks nobody holds or waits on.
    self.turns.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    evicted
  }
}

pub fn spawn_session_janitor(registry: Arc<SessionRegistry>, idle: Duration, sweep_every: Duration) -> JoinHandle<()> {
  tokio::spawn(async move {
    info!(idle_secs = idle.as_secs(), sweep_secs = sweep_every.as_secs(), "Checkout session janitor started.");
    let mut ticker = tokio::time::interval(sweep_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      let evicted = registry.evict_idle(idle);
      if evicted > 0 {
        info!(evicted, remaining = registry.len(), "Evicted idle checkout sessions.");
      } else {
        debug!("No idle checkout sessions.");
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn one_session_per_buyer() {
    let registry = SessionRegistry::new();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    assert!(registry
      .put(5, CheckoutSession::new(first, CheckoutStep::AwaitPaymentMethod))
      .is_none());
    let replaced = registry.put(5, CheckoutSession::new(second, CheckoutStep::AwaitPaymentMethod));
    assert_eq!(replaced.map(|s| s.order_id), Some(first));
    assert_eq!(registry.get(5).map(|s| s.order_id), Some(second));
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn eviction_only_hits_idle_sessions() {
    let registry = SessionRegistry::new();
    registry.put(1, CheckoutSession::new(Uuid::new_v4(), CheckoutStep::AwaitPaymentMethod));
    registry.put(2, CheckoutSession::new(Uuid::new_v4(), CheckoutStep::AwaitPaymentMethod));
    if let Some(s) = registry.sessions.lock().get_mut(&1) {
      s.last_activity = Instant::now() - Duration::from_secs(120);
    }
    assert_eq!(registry.evict_idle(Duration::from_secs(60)), 1);
    assert!(registry.get(1).is_none());
    assert!(registry.get(2).is_some());
  }

  #[tokio::test]
  async fn turns_of_one_buyer_are_serialized() {
    let registry = Arc::new(SessionRegistry::new());
    let first = registry.begin_turn(7).await;

    let waiting = {
      let registry = registry.clone();
      tokio::spawn(async move {
        let _turn = registry.begin_turn(7).await;
      })
    };
    // Another buyer is not blocked.
    let other = tokio::time::timeout(Duration::from_secs(1), registry.begin_turn(8)).await;
    assert!(other.is_ok());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiting.is_finished());
    drop(first);
    tokio::time::timeout(Duration::from_secs(1), waiting).await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn idle_turn_locks_are_released() {
    let registry = SessionRegistry::new();
    drop(registry.begin_turn(1).await);
    let held = registry.begin_turn(2).await;
    registry.evict_idle(Duration::from_secs(60));
    assert_eq!(registry.turns.lock().len(), 1);
    drop(held);
    registry.evict_idle(Duration::from_secs(60));
    assert!(registry.turns.lock().is_empty());
  }
}
