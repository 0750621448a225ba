//! In-process change notification: observers are told which address changed.

use crate::router::Route;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Published after a mutating operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub route: Route,
    /// Content URI of the affected address.
    pub uri: String,
}

impl ChangeEvent {
    pub fn new(route: Route, authority: &str) -> Self {
        ChangeEvent {
            uri: route.content_uri(authority),
            route,
        }
    }
}

pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

impl<F> ChangeObserver for F
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) {
        self(event)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe seam used by the store. Implementations decide how events reach observers.
pub trait ChangeNotifier: Send + Sync {
    fn subscribe(&self, observer: Arc<dyn ChangeObserver>) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
    fn notify(&self, event: &ChangeEvent);
}

/// Synchronous broadcast in registration order. Dispatch runs on a snapshot of
/// the observer list, so observers may subscribe or unsubscribe from inside a callback.
#[derive(Default)]
pub struct BroadcastNotifier {
    next_id: AtomicU64,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn ChangeObserver>)>>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        BroadcastNotifier::default()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn subscribe(&self, observer: Arc<dyn ChangeObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    fn notify(&self, event: &ChangeEvent) {
        let snapshot: Vec<Arc<dyn ChangeObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        tracing::debug!(uri = %event.uri, observers = snapshot.len(), "notify change");
        for observer in snapshot {
            observer.on_change(event);
        }
    }
}

/// Forwards events into a tokio channel for async consumers.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelObserver { tx }, rx)
    }
}

impl ChangeObserver for ChannelObserver {
    fn on_change(&self, event: &ChangeEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!(uri = %event.uri, "change receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(route: Route) -> ChangeEvent {
        ChangeEvent::new(route, "org.example")
    }

    #[test]
    fn observers_run_in_registration_order() {
        let notifier = BroadcastNotifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            notifier.subscribe(Arc::new(move |e: &ChangeEvent| {
                log.lock().unwrap().push(format!("{}:{}", tag, e.route));
            }));
        }
        notifier.notify(&event(Route::Item(5)));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:devices/5", "second:devices/5", "third:devices/5"]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let notifier = BroadcastNotifier::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let id = notifier.subscribe(Arc::new(move |_: &ChangeEvent| {
            *counter.lock().unwrap() += 1;
        }));
        notifier.notify(&event(Route::Collection));
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&event(Route::Collection));
        assert_eq!(*hits.lock().unwrap(), 1);
        assert_eq!(notifier.observer_count(), 0);
    }

    #[test]
    fn observer_may_subscribe_during_dispatch() {
        let notifier = Arc::new(BroadcastNotifier::new());
        let inner = Arc::clone(&notifier);
        notifier.subscribe(Arc::new(move |_: &ChangeEvent| {
            inner.subscribe(Arc::new(|_: &ChangeEvent| {}));
        }));
        notifier.notify(&event(Route::Collection));
        assert_eq!(notifier.observer_count(), 2);
    }

    #[test]
    fn subscribe_unsubscribe_and_notify_from_many_threads() {
        use std::sync::atomic::AtomicUsize;

        let notifier = BroadcastNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        notifier.subscribe(Arc::new(move |_: &ChangeEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let id = notifier.subscribe(Arc::new(|_: &ChangeEvent| {}));
                        assert!(notifier.unsubscribe(id));
                    }
                });
                s.spawn(|| {
                    for _ in 0..100 {
                        notifier.notify(&event(Route::Collection));
                    }
                });
            }
        });

        assert_eq!(hits.load(Ordering::SeqCst), 400);
        assert_eq!(notifier.observer_count(), 1);
    }

    #[test]
    fn event_carries_content_uri() {
        let e = event(Route::Item(12));
        assert_eq!(e.uri, "content://org.example/devices/12");
    }

    #[tokio::test]
    async fn channel_observer_forwards_events() {
        let notifier = BroadcastNotifier::new();
        let (observer, mut rx) = ChannelObserver::new();
        notifier.subscribe(Arc::new(observer));
        notifier.notify(&event(Route::Item(1)));
        notifier.notify(&event(Route::Collection));
        assert_eq!(rx.recv().await.unwrap().route, Route::Item(1));
        assert_eq!(rx.recv().await.unwrap().route, Route::Collection);
    }
}
