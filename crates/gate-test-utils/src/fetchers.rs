//! Canned fetchers for driving a `Gate` without a network.

use async_trait::async_trait;
use scope_gate::{BodyFetcher, FetchError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves one body, replaceable between loads.
#[derive(Debug)]
pub struct CannedFetcher {
    body: Mutex<String>,
    calls: AtomicUsize,
}

impl CannedFetcher {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Mutex::new(body.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the body served by subsequent fetches.
    pub fn set_body(&self, body: impl Into<String>) {
        *self.body.lock().unwrap() = body.into();
    }

    /// Number of fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BodyFetcher for CannedFetcher {
    async fn fetch_body(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.lock().unwrap().clone())
    }
}

/// Serves its bodies in turn, starting over after the last one.
#[derive(Debug)]
pub struct CyclingFetcher {
    bodies: Vec<String>,
    next: AtomicUsize,
}

impl CyclingFetcher {
    pub fn new(bodies: Vec<String>) -> Self {
        assert!(!bodies.is_empty(), "CyclingFetcher needs at least one body");
        Self {
            bodies,
            next: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BodyFetcher for CyclingFetcher {
    async fn fetch_body(&self, _url: &str) -> Result<String, FetchError> {
        let index = self.next.fetch_add(1, Ordering::SeqCst) % self.bodies.len();
        Ok(self.bodies[index].clone())
    }
}

/// Always fails with the given error.
#[derive(Debug, Clone)]
pub struct FailingFetcher(pub FetchError);

#[async_trait]
impl BodyFetcher for FailingFetcher {
    async fn fetch_body(&self, _url: &str) -> Result<String, FetchError> {
        Err(self.0.clone())
    }
}
