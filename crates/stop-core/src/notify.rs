//! In-process change notification keyed by resource URI.
//!
//! The store calls [`ChangeNotifier::publish`] exactly once per committed
//! mutation, synchronously, on the caller's task. Fan-out is best-effort: each
//! observer owns an unbounded channel and nothing is replayed to observers
//! that register late.
//!
//! # Delivery policy
//!
//! An observer receives an event when its watched URI and the event URI lie on
//! the same path. Concretely:
//!
//! - equal URIs always match;
//! - an observer on a collection sees events on any item of that collection;
//! - an observer on an item sees events on its collection, because a
//!   collection-wide update or delete may have touched the item.
//!
//! Sibling items never see each other's events.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::uri::ResourceUri;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
  Insert,
  Update,
  Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
  pub uri:  ResourceUri,
  pub kind: ChangeKind,
}

/// Whether an observer watching `watched` is told about a change at `changed`.
pub fn covers(watched: &ResourceUri, changed: &ResourceUri) -> bool {
  watched.is_prefix_of(changed) || changed.is_prefix_of(watched)
}

struct Registration {
  watched: ResourceUri,
  tx:      mpsc::UnboundedSender<ChangeEvent>,
}

/// Publish/subscribe hub. Cloning is cheap and clones share registrations.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
  registrations: Arc<Mutex<Vec<Registration>>>,
}

impl ChangeNotifier {
  pub fn new() -> Self { Self::default() }

  /// Register an observer on `uri`. Registrations of observers that have
  /// since been dropped are pruned here as well as on publish.
  pub fn subscribe(&self, uri: ResourceUri) -> Observer {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut regs = self
      .registrations
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    regs.retain(|r| !r.tx.is_closed());
    regs.push(Registration { watched: uri.clone(), tx });
    Observer { watched: uri, rx }
  }

  /// Deliver `event` to every covering observer and return how many received
  /// it. Registrations whose observer has been dropped are pruned.
  pub fn publish(&self, event: ChangeEvent) -> usize {
    let mut regs = self
      .registrations
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    regs.retain(|r| !r.tx.is_closed());

    regs
      .iter()
      .filter(|r| covers(&r.watched, &event.uri))
      .filter(|r| r.tx.send(event.clone()).is_ok())
      .count()
  }

  /// Number of live registrations.
  pub fn observer_count(&self) -> usize {
    let mut regs = self
      .registrations
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    regs.retain(|r| !r.tx.is_closed());
    regs.len()
  }
}

impl std::fmt::Debug for ChangeNotifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ChangeNotifier")
      .field("observers", &self.observer_count())
      .finish()
  }
}

/// Receiving end of a subscription. Dropping it unregisters the observer.
#[derive(Debug)]
pub struct Observer {
  watched: ResourceUri,
  rx:      mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Observer {
  pub fn watched(&self) -> &ResourceUri { &self.watched }

  /// Wait for the next change. Returns `None` once the notifier is gone.
  pub async fn recv(&mut self) -> Option<ChangeEvent> { self.rx.recv().await }

  /// The next already-delivered change, if any.
  pub fn try_recv(&mut self) -> Option<ChangeEvent> { self.rx.try_recv().ok() }

  /// Every already-delivered change, oldest first.
  pub fn drain(&mut self) -> Vec<ChangeEvent> {
    std::iter::from_fn(|| self.try_recv()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::authority::Authority;

  fn game() -> ResourceUri {
    ResourceUri::collection(&Authority::resolve(&"com.aware.app.stop".into()), "table_game")
  }

  fn event(uri: ResourceUri) -> ChangeEvent { ChangeEvent { uri, kind: ChangeKind::Update } }

  #[test]
  fn collection_observer_sees_item_changes() {
    let n = ChangeNotifier::new();
    let mut obs = n.subscribe(game());

    assert_eq!(n.publish(event(game().with_id(1))), 1);
    assert_eq!(obs.drain(), vec![event(game().with_id(1))]);
  }

  #[test]
  fn item_observer_sees_collection_changes_but_not_siblings() {
    let n = ChangeNotifier::new();
    let mut obs = n.subscribe(game().with_id(1));

    n.publish(event(game()));
    n.publish(event(game().with_id(2)));
    n.publish(event(game().with_id(1)));

    let uris: Vec<_> = obs.drain().into_iter().map(|e| e.uri).collect();
    assert_eq!(uris, vec![game(), game().with_id(1)]);
  }

  #[test]
  fn other_tables_are_isolated() {
    let n = ChangeNotifier::new();
    let mut obs = n.subscribe(game());
    let medication =
      ResourceUri::collection(&Authority::resolve(&"com.aware.app.stop".into()), "medication");

    assert_eq!(n.publish(event(medication.with_id(1))), 0);
    assert!(obs.try_recv().is_none());
  }

  #[test]
  fn dropped_observers_are_pruned() {
    let n = ChangeNotifier::new();
    let obs = n.subscribe(game());
    let _kept = n.subscribe(game());
    assert_eq!(n.observer_count(), 2);

    drop(obs);
    assert_eq!(n.publish(event(game())), 1);
    assert_eq!(n.observer_count(), 1);
  }

  #[test]
  fn read_only_churn_does_not_accumulate_registrations() {
    let n = ChangeNotifier::new();
    for _ in 0..10_000 {
      drop(n.subscribe(game()));
    }
    assert!(n.registrations.lock().unwrap().len() <= 1);

    let _live = n.subscribe(game().with_id(1));
    assert_eq!(n.registrations.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn recv_waits_for_publish() {
    let n = ChangeNotifier::new();
    let mut obs = n.subscribe(game());
    let publisher = n.clone();
    tokio::spawn(async move {
      publisher.publish(ChangeEvent { uri: game().with_id(9), kind: ChangeKind::Insert });
    });
    let got = obs.recv().await.unwrap();
    assert_eq!(got.kind, ChangeKind::Insert);
    assert_eq!(got.uri, game().with_id(9));
  }
}
