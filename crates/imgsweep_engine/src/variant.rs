use imgsweep_core::{CacheBust, TaskId};
use url::Url;

use crate::{FailureKind, FetchError};

/// Derives the request target for `task_id` from the base endpoint.
///
/// Distinct task ids yield distinct targets so that caches between us and the
/// endpoint see a fresh request each time.
pub fn variant(base: &str, task_id: TaskId, strategy: &CacheBust) -> Result<String, FetchError> {
    match strategy {
        CacheBust::QueryParam { name } => {
            let mut url = Url::parse(base)
                .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
            url.query_pairs_mut()
                .append_pair(name, &task_id.to_string());
            Ok(url.into())
        }
        CacheBust::RepeatedMarker => {
            let mut target = String::with_capacity(base.len() + task_id as usize);
            target.push_str(base);
            target.extend(std::iter::repeat('?').take(task_id as usize));
            Ok(target)
        }
    }
}
