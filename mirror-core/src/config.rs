//! Run configuration: YAML file, command-line overrides and environment
//! credentials.
//!
//! # Precedence
//!
//! ```text
//! defaults  <  config file  <  command-line overrides
//! ```
//!
//! Credentials come only from `S3_ACCESS_KEY` / `S3_SECRET_KEY`.
//!
//! # API pattern
//!
//! Functions that touch ambient process state have two forms:
//! - `fn_at(dir: &Path, …)` / `resolve_with_env(…, env)`: explicit context, used in tests
//! - `fn(…)`: derives the context from `dirs` / `std::env`, delegates
//!
//! Tests must never mutate the process environment; always use the explicit forms.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::BucketName;

pub const ACCESS_KEY_VAR: &str = "S3_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "S3_SECRET_KEY";
pub const DEFAULT_REGION: &str = "us-east-1";

const DEFAULT_MAX_ATTEMPTS: u32 = 1;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;
const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

// ---------------------------------------------------------------------------
// 1. Resolved configuration
// ---------------------------------------------------------------------------

/// Static access/secret key pair for the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Retry settings for individual upload/delete actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per action, including the first. `1` disables retrying.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Fully resolved configuration for one mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub credentials: Credentials,
    pub endpoint_url: String,
    pub bucket: BucketName,
    pub local_path: PathBuf,
    pub create_bucket: bool,
    pub region: String,
    /// Optional extension allow-list, as written by the user.
    pub extensions: Option<Vec<String>>,
    pub retry: RetrySettings,
}

// ---------------------------------------------------------------------------
// 2. Partial sources
// ---------------------------------------------------------------------------

/// Retry section of the config file; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryFile {
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
}

/// On-disk YAML config. Every field is optional; requirements are enforced
/// only after all sources are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub endpoint_url: Option<String>,
    pub bucket_name: Option<String>,
    pub local_path: Option<PathBuf>,
    pub create_bucket: Option<bool>,
    pub region: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub retry: RetryFile,
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub endpoint_url: Option<String>,
    pub bucket_name: Option<String>,
    pub local_path: Option<PathBuf>,
    pub create_bucket: Option<bool>,
    pub region: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// 3. Config file location and loading
// ---------------------------------------------------------------------------

/// `<config_dir>/mirror/config.yaml`, pure, no I/O.
pub fn default_config_path_at(config_dir: &Path) -> PathBuf {
    config_dir.join("mirror").join("config.yaml")
}

/// `default_config_path_at` using the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| default_config_path_at(&dir))
}

/// Load a config file that the user named explicitly.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed.
pub fn load_file_at(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `<config_dir>/mirror/config.yaml` if it exists; absence is not an error.
pub fn load_default_file_at(config_dir: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let path = default_config_path_at(config_dir);
    if !path.exists() {
        return Ok(None);
    }
    load_file_at(&path).map(Some)
}

/// `load_default_file_at` convenience wrapper.
pub fn load_default_file() -> Result<Option<ConfigFile>, ConfigError> {
    match dirs::config_dir() {
        Some(dir) => load_default_file_at(&dir),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// 4. Resolution
// ---------------------------------------------------------------------------

impl MirrorConfig {
    /// Merge `file` and `overrides`, read credentials through `env`, and
    /// enforce required fields.
    ///
    /// Every missing field is reported in a single `ConfigError::MissingFields`.
    pub fn resolve_with_env<F>(
        file: Option<ConfigFile>,
        overrides: ConfigOverrides,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let mut missing = Vec::new();

        let access_key = non_empty(env(ACCESS_KEY_VAR));
        let secret_key = non_empty(env(SECRET_KEY_VAR));
        if access_key.is_none() {
            missing.push(ACCESS_KEY_VAR);
        }
        if secret_key.is_none() {
            missing.push(SECRET_KEY_VAR);
        }

        let endpoint_url = non_empty(overrides.endpoint_url.or(file.endpoint_url));
        if endpoint_url.is_none() {
            missing.push("endpoint_url");
        }
        let bucket_name = non_empty(overrides.bucket_name.or(file.bucket_name));
        if bucket_name.is_none() {
            missing.push("bucket_name");
        }
        let local_path = overrides
            .local_path
            .or(file.local_path)
            .filter(|p| !p.as_os_str().is_empty());
        if local_path.is_none() {
            missing.push("local_path");
        }

        let (
            Some(access_key),
            Some(secret_key),
            Some(endpoint_url),
            Some(bucket_name),
            Some(local_path),
        ) = (access_key, secret_key, endpoint_url, bucket_name, local_path)
        else {
            return Err(ConfigError::MissingFields { fields: missing });
        };

        if !(endpoint_url.starts_with("http://") || endpoint_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "endpoint_url",
                reason: format!("expected an http:// or https:// URL, got '{endpoint_url}'"),
            });
        }

        let defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_attempts: overrides
                .max_attempts
                .or(file.retry.max_attempts)
                .unwrap_or(defaults.max_attempts),
            initial_backoff_ms: overrides
                .initial_backoff_ms
                .or(file.retry.initial_backoff_ms)
                .unwrap_or(defaults.initial_backoff_ms),
            max_backoff_ms: file.retry.max_backoff_ms.unwrap_or(defaults.max_backoff_ms),
        };
        if retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        let extensions = overrides
            .extensions
            .filter(|exts| !exts.is_empty())
            .or(file.extensions)
            .filter(|exts| !exts.is_empty());

        Ok(Self {
            credentials: Credentials {
                access_key,
                secret_key,
            },
            endpoint_url,
            bucket: BucketName::from(bucket_name),
            local_path,
            create_bucket: overrides
                .create_bucket
                .or(file.create_bucket)
                .unwrap_or(false),
            region: non_empty(overrides.region.or(file.region))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            extensions,
            retry,
        })
    }

    /// `resolve_with_env` reading the process environment.
    pub fn resolve(file: Option<ConfigFile>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(file, overrides, |name| std::env::var(name).ok())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_with_credentials() -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ACCESS_KEY_VAR, "AKIA123"), (SECRET_KEY_VAR, "s3cr3t")]);
        move |name| vars.get(name).map(|v| v.to_string())
    }

    fn full_overrides() -> ConfigOverrides {
        ConfigOverrides {
            endpoint_url: Some("http://localhost:9000".to_string()),
            bucket_name: Some("backups".to_string()),
            local_path: Some(PathBuf::from("/data/photos")),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn default_config_path_is_correct() {
        let dir = TempDir::new().expect("tempdir");
        let path = default_config_path_at(dir.path());
        assert!(path.ends_with("mirror/config.yaml"));
    }

    #[test]
    fn resolves_with_defaults() {
        let config =
            MirrorConfig::resolve_with_env(None, full_overrides(), env_with_credentials())
                .expect("resolve");
        assert_eq!(config.bucket, BucketName::from("backups"));
        assert_eq!(config.region, DEFAULT_REGION);
        assert!(!config.create_bucket);
        assert_eq!(config.retry, RetrySettings::default());
        assert!(config.extensions.is_none());
        assert_eq!(config.credentials.access_key, "AKIA123");
    }

    #[test]
    fn overrides_win_over_file() {
        let file = ConfigFile {
            bucket_name: Some("from-file".to_string()),
            region: Some("eu-west-3".to_string()),
            create_bucket: Some(true),
            ..ConfigFile::default()
        };
        let config =
            MirrorConfig::resolve_with_env(Some(file), full_overrides(), env_with_credentials())
                .expect("resolve");
        assert_eq!(config.bucket, BucketName::from("backups"));
        assert_eq!(config.region, "eu-west-3");
        assert!(config.create_bucket);
    }

    #[test]
    fn missing_fields_are_all_listed() {
        let err = MirrorConfig::resolve_with_env(None, ConfigOverrides::default(), |_| None)
            .unwrap_err();
        match &err {
            ConfigError::MissingFields { fields } => assert_eq!(
                fields,
                &vec![
                    ACCESS_KEY_VAR,
                    SECRET_KEY_VAR,
                    "endpoint_url",
                    "bucket_name",
                    "local_path"
                ]
            ),
            other => panic!("expected missing fields, got {other:?}"),
        }
        assert!(err.to_string().contains("S3_SECRET_KEY, endpoint_url"));
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let env = |name: &str| match name {
            ACCESS_KEY_VAR => Some("AKIA123".to_string()),
            _ => Some("   ".to_string()),
        };
        let err = MirrorConfig::resolve_with_env(None, full_overrides(), env).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingFields { ref fields } if fields == &vec![SECRET_KEY_VAR])
        );
    }

    #[test]
    fn zero_attempts_rejected() {
        let overrides = ConfigOverrides {
            max_attempts: Some(0),
            ..full_overrides()
        };
        let err =
            MirrorConfig::resolve_with_env(None, overrides, env_with_credentials()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "retry.max_attempts", .. }));
    }

    #[test]
    fn non_http_endpoint_rejected() {
        let overrides = ConfigOverrides {
            endpoint_url: Some("localhost:9000".to_string()),
            ..full_overrides()
        };
        let err =
            MirrorConfig::resolve_with_env(None, overrides, env_with_credentials()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "endpoint_url", .. }));
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials {
            access_key: "AKIA123".to_string(),
            secret_key: "s3cr3t".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("AKIA123"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn load_missing_explicit_file_returns_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_file_at(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn default_file_absent_is_none() {
        let dir = TempDir::new().expect("tempdir");
        assert!(load_default_file_at(dir.path()).expect("load").is_none());
    }
}
