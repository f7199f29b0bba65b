//! Key load logging tests.
//!
//! A collecting layer records every event emitted while a load runs, so the
//! level and target of load outcomes can be asserted.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use gate_test_utils::{key_document, CannedFetcher, TRUSTED_RSA_PUBLIC_PEM};
use scope_gate::Gate;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct Recorded {
    level: Level,
    target: String,
    message: String,
}

#[derive(Clone, Default)]
struct EventCollector {
    events: Arc<Mutex<Vec<Recorded>>>,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().expect("lock poisoned").push(Recorded {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}

async fn load_and_collect(document: String) -> Vec<Recorded> {
    let collector = EventCollector::default();
    let events = Arc::clone(&collector.events);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let gate = Gate::with_fetcher(Arc::new(CannedFetcher::new(document)));
    gate.load_keys("http://uaa").await.unwrap();

    let recorded = events.lock().expect("lock poisoned").clone();
    recorded
}

fn key_store_events(events: &[Recorded], level: Level) -> Vec<&Recorded> {
    events
        .iter()
        .filter(|e| e.target == "gate.key_store" && e.level == level)
        .collect()
}

#[tokio::test]
async fn test_successful_load_logs_info() {
    let events = load_and_collect(key_document(&[("RS256", TRUSTED_RSA_PUBLIC_PEM)])).await;

    let info = key_store_events(&events, Level::INFO);
    assert_eq!(info.len(), 1, "got: {events:?}");
    assert!(info.iter().all(|e| e.message.contains("Trusted keys loaded")));
    assert!(key_store_events(&events, Level::WARN).is_empty());
}

#[tokio::test]
async fn test_empty_document_load_logs_info_and_warning() {
    let events = load_and_collect(key_document(&[])).await;

    let info = key_store_events(&events, Level::INFO);
    assert_eq!(info.len(), 1, "got: {events:?}");
    assert!(info.iter().all(|e| e.message.contains("Trusted keys loaded")));

    let warn = key_store_events(&events, Level::WARN);
    assert_eq!(warn.len(), 1, "got: {events:?}");
    assert!(warn.iter().all(|e| e.message.contains("no keys")));
}
