//! imgsweep engine: fetching, persistence, and the bounded-concurrency dispatch loop.
mod dispatcher;
mod fetch;
mod filename;
mod persist;
mod store;
mod types;
mod variant;
mod worker;

pub use dispatcher::Dispatcher;
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{image_file_name, IMAGE_EXTENSION, IMAGE_PREFIX};
pub use persist::{AtomicFileWriter, DirectorySink, PayloadSink, PersistError};
pub use store::{DedupStore, RecordOutcome};
pub use types::{FailureKind, FetchError, SweepSummary, TaskOutcome};
pub use variant::variant;
pub use worker::run_worker;
