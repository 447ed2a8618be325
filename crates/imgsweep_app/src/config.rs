//! Start-up configuration: the target endpoint from the environment and the
//! sweep tunables from an optional RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use imgsweep_core::{CacheBust, SweepSettings};
use imgsweep_engine::FetchSettings;
use imgsweep_logging::{sweep_debug, sweep_info, sweep_warn};
use ron::extensions::Extensions;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const ENDPOINT_VAR: &str = "URL";
pub const CONFIG_PATH_VAR: &str = "IMGSWEEP_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "imgsweep.ron";
pub const DEFAULT_OUTPUT_DIR: &str = "./images";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("URL is not defined")]
    MissingEndpoint,
    #[error("endpoint is neither a URL nor base64: {0}")]
    UndecodableEndpoint(String),
    #[error("endpoint {value:?} is not a usable http(s) URL: {reason}")]
    InvalidEndpoint { value: String, reason: String },
    #[error("failed to read tunables from {path:?}: {message}")]
    TunablesFile { path: PathBuf, message: String },
    #[error("invalid tunables: {0}")]
    InvalidTunables(String),
}

/// Everything the binary needs to run one sweep.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoint: String,
    pub sweep: SweepSettings,
    pub fetch: FetchSettings,
    pub output_dir: PathBuf,
}

/// On-disk shape of the tunables file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Tunables {
    pub max_concurrency: Option<usize>,
    pub repeat_limit: Option<u64>,
    pub unique_cap: Option<u64>,
    pub pacing_interval_ms: Option<u64>,
    pub enforce_cap_strictly: Option<bool>,
    pub cache_bust: Option<CacheBustTunable>,
    pub output_dir: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub enum CacheBustTunable {
    QueryParam(String),
    RepeatedMarker,
}

impl Tunables {
    /// Parses RON; plain values are accepted for the optional fields.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        ron::Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .from_str(text)
            .map_err(|err| ConfigError::InvalidTunables(err.to_string()))
    }

    /// Overlays the file values on the defaults and validates the result.
    pub fn resolve(self) -> Result<(SweepSettings, FetchSettings, PathBuf), ConfigError> {
        let defaults = SweepSettings::default();
        let sweep = SweepSettings {
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            repeat_limit: self.repeat_limit.unwrap_or(defaults.repeat_limit),
            unique_cap: self.unique_cap.unwrap_or(defaults.unique_cap),
            pacing_interval: self
                .pacing_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing_interval),
            enforce_cap_strictly: self
                .enforce_cap_strictly
                .unwrap_or(defaults.enforce_cap_strictly),
            cache_bust: match self.cache_bust {
                Some(CacheBustTunable::QueryParam(name)) => CacheBust::QueryParam { name },
                Some(CacheBustTunable::RepeatedMarker) => CacheBust::RepeatedMarker,
                None => defaults.cache_bust,
            },
        };

        if sweep.max_concurrency == 0 {
            return Err(ConfigError::InvalidTunables(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if sweep.repeat_limit == 0 {
            return Err(ConfigError::InvalidTunables(
                "repeat_limit must be at least 1".into(),
            ));
        }
        if let CacheBust::QueryParam { name } = &sweep.cache_bust {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidTunables(
                    "cache_bust query parameter name is empty".into(),
                ));
            }
        }

        let fetch_defaults = FetchSettings::default();
        let fetch = FetchSettings {
            connect_timeout: self
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(fetch_defaults.connect_timeout),
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(fetch_defaults.request_timeout),
            max_bytes: self.max_bytes.unwrap_or(fetch_defaults.max_bytes),
            ..fetch_defaults
        };

        let output_dir = self
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok((sweep, fetch, output_dir))
    }
}

/// Accepts a literal http(s) URL or the standard base64 encoding of one.
pub fn decode_endpoint(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::MissingEndpoint);
    }

    if let Ok(url) = Url::parse(raw) {
        if is_http(&url) {
            return Ok(raw.to_string());
        }
    }

    let bytes = STANDARD
        .decode(raw)
        .map_err(|err| ConfigError::UndecodableEndpoint(err.to_string()))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|err| ConfigError::UndecodableEndpoint(err.to_string()))?;
    let decoded = decoded.trim().to_string();

    let url = Url::parse(&decoded).map_err(|err| ConfigError::InvalidEndpoint {
        value: decoded.clone(),
        reason: err.to_string(),
    })?;
    if !is_http(&url) {
        return Err(ConfigError::InvalidEndpoint {
            value: decoded,
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(decoded)
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Loads `env_path` into the process environment if the file exists.
/// Variables that are already set win.
pub fn load_dotenv(env_path: &Path) {
    if env_path.exists() {
        if let Err(err) = dotenvy::from_path(env_path) {
            sweep_warn!("Failed to load {:?}: {}", env_path, err);
        }
    } else {
        sweep_debug!("No .env file; using the process environment");
    }
}

/// Reads the tunables file. An explicitly named file must exist; the default
/// file in `dir` is optional.
pub fn load_tunables(dir: &Path, explicit: Option<&Path>) -> Result<Tunables, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => dir.join(DEFAULT_CONFIG_FILE),
    };
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
            sweep_debug!("No {} found; using default tunables", DEFAULT_CONFIG_FILE);
            return Ok(Tunables::default());
        }
        Err(err) => {
            return Err(ConfigError::TunablesFile {
                path,
                message: err.to_string(),
            })
        }
    };
    let tunables = Tunables::parse(&text)?;
    sweep_info!("Loaded tunables from {:?}", path);
    Ok(tunables)
}

/// Builds the full configuration from `.env`, the process environment and
/// the tunables file, all relative to the working directory.
pub fn load() -> Result<AppConfig, ConfigError> {
    load_from(Path::new("."))
}

/// Same as [`load`] with `.env` and the default tunables file looked up in `dir`.
pub fn load_from(dir: &Path) -> Result<AppConfig, ConfigError> {
    load_dotenv(&dir.join(".env"));

    let raw = std::env::var(ENDPOINT_VAR).map_err(|_| ConfigError::MissingEndpoint)?;
    let endpoint = decode_endpoint(&raw)?;

    let explicit = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    let (sweep, fetch, output_dir) = load_tunables(dir, explicit.as_deref())?.resolve()?;

    Ok(AppConfig {
        endpoint,
        sweep,
        fetch,
        output_dir,
    })
}
