#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use imgsweep_engine::{PayloadSink, PersistError};
use wiremock::{Request, Respond, ResponseTemplate};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(imgsweep_logging::initialize_for_tests);
}

/// Keeps stored payloads in memory, keyed by name.
#[derive(Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemorySink {
    pub fn names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }
}

impl PayloadSink for MemorySink {
    fn store(&self, name: &str, payload: &[u8]) -> Result<PathBuf, PersistError> {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), payload.to_vec());
        Ok(PathBuf::from(name))
    }

    fn remove(&self, name: &str) -> Result<bool, PersistError> {
        Ok(self.files.lock().unwrap().remove(name).is_some())
    }
}

/// Every write fails.
pub struct FailingSink;

impl PayloadSink for FailingSink {
    fn store(&self, _name: &str, _payload: &[u8]) -> Result<PathBuf, PersistError> {
        Err(PersistError::OutputDir("disk full".to_string()))
    }

    fn remove(&self, _name: &str) -> Result<bool, PersistError> {
        Ok(false)
    }
}

/// Blocks the calling thread for `delay` before every write, like a slow disk.
#[derive(Clone)]
pub struct SlowSink {
    inner: MemorySink,
    delay: Duration,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemorySink::default(),
            delay,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}

impl PayloadSink for SlowSink {
    fn store(&self, name: &str, payload: &[u8]) -> Result<PathBuf, PersistError> {
        std::thread::sleep(self.delay);
        self.inner.store(name, payload)
    }

    fn remove(&self, name: &str) -> Result<bool, PersistError> {
        self.inner.remove(name)
    }
}

/// Serves `bodies` in order, one per request, repeating the last one forever.
pub struct Sequence {
    bodies: Vec<Vec<u8>>,
    next: AtomicUsize,
}

impl Sequence {
    pub fn new(bodies: &[&str]) -> Self {
        Self {
            bodies: bodies.iter().map(|b| b.as_bytes().to_vec()).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        let body = self
            .bodies
            .get(index)
            .or_else(|| self.bodies.last())
            .cloned()
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_raw(body, "image/jpeg")
    }
}

/// A distinct body for every request.
#[derive(Default)]
pub struct AlwaysFresh {
    next: AtomicUsize,
}

impl Respond for AlwaysFresh {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_raw(format!("image-{index}").into_bytes(), "image/jpeg")
    }
}
