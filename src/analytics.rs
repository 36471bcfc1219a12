use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::storage;
use crate::trace;

/// A single fire-and-forget notification.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub properties: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>, properties: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            properties,
            at: Utc::now(),
        }
    }
}

/// Analytics collaborator. Recording must never fail from the caller's
/// point of view; implementations swallow their own errors.
pub trait Collector: Send + Sync {
    fn record(&self, event: Event);
}

/// Stands in when analytics is disabled or unavailable. The controller
/// behaves identically with or without a real collector.
#[derive(Default)]
pub struct NullCollector;

impl Collector for NullCollector {
    fn record(&self, _event: Event) {}
}

/// Persists events through a worker thread so recording never blocks the UI
/// loop. Dropped events (full shutdown, closed channel, write failures) are
/// silently discarded.
pub struct StoreCollector {
    events: Sender<Event>,
    stop: Sender<()>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl StoreCollector {
    pub fn new(store: Arc<storage::Store>) -> Self {
        let (event_tx, event_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();
        let handle = thread::spawn(move || worker(store, event_rx, stop_rx));
        Self {
            events: event_tx,
            stop: stop_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Flushes queued events and stops the worker. Safe to call more than
    /// once.
    pub fn close(&self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Collector for StoreCollector {
    fn record(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

impl Drop for StoreCollector {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker(store: Arc<storage::Store>, events: Receiver<Event>, stop: Receiver<()>) {
    loop {
        crossbeam_channel::select! {
            recv(stop) -> _ => break,
            recv(events) -> msg => {
                match msg {
                    Ok(event) => persist(&store, event),
                    Err(_) => break,
                }
            }
        }
    }
    // Drain whatever was queued before the stop signal arrived.
    while let Ok(event) = events.try_recv() {
        persist(&store, event);
    }
}

fn persist(store: &storage::Store, event: Event) {
    if let Err(err) = store.insert_event(&event.name, &event.properties, event.at) {
        trace::debug_log(format!("analytics: dropping event {}: {err}", event.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn store_collector_persists_events() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            storage::Store::open(storage::Options {
                path: Some(dir.path().join("events.db")),
            })
            .unwrap(),
        );

        let collector = StoreCollector::new(store.clone());
        collector.record(Event::new("tab_switch", json!({"tab": "about"})));
        collector.record(Event::new(
            "video_open",
            json!({"video_id": "abc123", "title": "Title"}),
        ));
        collector.close();

        let events = store.recent_events(10).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn null_collector_is_a_no_op() {
        NullCollector.record(Event::new("tab_switch", json!({})));
    }
}
