//! Loader for `scitter.yaml` with environment overlays.
//!
//! Sources, lowest precedence first: files / inline YAML in the order they
//! were added, then `SCITTER_`-prefixed environment variables
//! (`SCITTER_SERVICE__BASE_URL` sets `service.base_url`). String values may
//! reference `${VAR}`; references are expanded after merging.
use config::{Config, ConfigError, Environment, File, FileFormat};
use scitter_common::observability::{LogConfig, LogFormat};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "SCITTER";

#[derive(Debug, Deserialize)]
pub struct ScitterConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub service: ServiceConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the service lives. Unset values keep the client defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub endpoints: EndpointOverrides,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndpointOverrides {
    #[serde(default)]
    pub verify_credentials: Option<String>,
    #[serde(default)]
    pub friends_timeline: Option<String>,
    #[serde(default)]
    pub user_timeline: Option<String>,
    #[serde(default)]
    pub public_timeline: Option<String>,
    /// Must contain `{id}`.
    #[serde(default)]
    pub show_status: Option<String>,
}

/// Either a username/password pair or a bearer token.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AccountConfig {
    Basic {
        #[serde(deserialize_with = "text")]
        username: String,
        #[serde(deserialize_with = "text")]
        password: String,
    },
    Token {
        #[serde(deserialize_with = "text")]
        token: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default, deserialize_with = "lenient")]
    pub emit_stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            emit_stderr: false,
            filter: default_filter(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self, app_name: &str) -> LogConfig {
        LogConfig {
            app_name: app_name.to_string(),
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

fn default_filter() -> String {
    "info".into()
}

/// Values coming from the environment are always strings; accept those for
/// scalar fields too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar<T> {
    Native(T),
    Text(String),
}

impl<T> Scalar<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn resolve<E: serde::de::Error>(self) -> Result<T, E> {
        match self {
            Scalar::Native(v) => Ok(v),
            Scalar::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

fn lenient<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    Scalar::<T>::deserialize(d)?.resolve()
}

fn lenient_option<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    Option::<Scalar<T>>::deserialize(d)?
        .map(Scalar::resolve)
        .transpose()
}

/// Secrets such as `password: 1234` arrive as YAML numbers; keep them as text.
fn text<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => break,
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// `<config dir>/scitter/scitter.yaml`, e.g. `~/.config/scitter/scitter.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scitter").join("scitter.yaml"))
}

/// Builder hiding the `config` crate wiring (files + env overrides).
pub struct ScitterConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ScitterConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScitterConfigLoader {
    /// ```
    /// use scitter_config::{AccountConfig, ScitterConfigLoader};
    ///
    /// let cfg = ScitterConfigLoader::new()
    ///     .with_yaml_str("account:\n  token: 'abc'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert!(matches!(cfg.account, AccountConfig::Token { .. }));
    /// assert!(cfg.service.base_url.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`Self::with_file`], but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, overlay the environment, expand `${VAR}` and
    /// deserialize.
    ///
    /// ```
    /// use scitter_config::{AccountConfig, ScitterConfigLoader};
    ///
    /// temp_env::with_var("SCITTER_TEST_PASSWORD", Some("injected"), || {
    ///     let cfg = ScitterConfigLoader::new()
    ///         .with_yaml_str(
    ///             r#"
    /// version: "1"
    /// service:
    ///   timeout_secs: 5
    /// account:
    ///   username: "bob"
    ///   password: "${SCITTER_TEST_PASSWORD}"
    /// "#,
    ///         )
    ///         .load()
    ///         .expect("valid configuration");
    ///
    ///     assert_eq!(cfg.service.timeout_secs, Some(5));
    ///     match cfg.account {
    ///         AccountConfig::Basic { username, password } => {
    ///             assert_eq!(username, "bob");
    ///             assert_eq!(password, "injected");
    ///         }
    ///         _ => panic!("expected basic account"),
    ///     }
    /// });
    /// ```
    pub fn load(self) -> Result<ScitterConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
