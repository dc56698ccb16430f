//! Loader for pagegrab configuration with YAML + environment overlays.
//!
//! Sources are merged in order: explicit files / inline YAML first, then
//! `PAGEGRAB_`-prefixed environment variables (`__` separates nested keys,
//! e.g. `PAGEGRAB_HTTP__MAX_ATTEMPTS=5`). String values may reference other
//! environment variables with `${VAR}`; those are expanded after merging.
//! Every field has a default, so an empty configuration is valid.
use config::{Config, ConfigError, Environment, File};
use pagegrab_common::observability::{LogConfig, LogFormat};
use pagegrab_common::DEFAULT_USER_AGENT;
use pagegrab_common::paths::expand_home;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagegrabConfig {
    /// Destination root; each scrape creates one folder below it.
    pub output_dir: PathBuf,
    pub http: HttpSettings,
    pub browser: BrowserSettings,
    pub logging: LoggingSettings,
}

impl Default for PagegrabConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            http: HttpSettings::default(),
            browser: BrowserSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PagegrabConfig {
    /// Destination root with `~` expanded.
    pub fn output_dir(&self) -> PathBuf {
        expand_home(&self.output_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub image_timeout_secs: u64,
    pub image_concurrency: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 3,
            read_timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 1000,
            image_timeout_secs: 15,
            image_concurrency: 4,
        }
    }
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Allows both the explicit `browser` strategy and the automatic fallback.
    pub enabled: bool,
    pub webdriver_url: String,
    pub headless: bool,
    pub page_load_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            page_load_timeout_secs: 30,
            settle_delay_ms: 3000,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl BrowserSettings {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: true,
            filter: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: self.format,
            default_filter: self.filter.clone(),
            ..LogConfig::default()
        }
    }
}

fn default_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
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

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct PagegrabConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for PagegrabConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PagegrabConfigLoader {
    /// Start with defaults plus `PAGEGRAB_` env overrides.
    ///
    /// ```
    /// use pagegrab_config::PagegrabConfigLoader;
    ///
    /// let config = PagegrabConfigLoader::new()
    ///     .with_yaml_str("output_dir: /tmp/snapshots")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.output_dir(), std::path::PathBuf::from("/tmp/snapshots"));
    /// assert_eq!(config.http.max_attempts, 3);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    /// A missing file is an error at [`load`](Self::load) time.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file) but silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use pagegrab_config::PagegrabConfigLoader;
    ///
    /// let cfg = PagegrabConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// browser:
    ///   enabled: false
    ///   settle_delay_ms: 0
    /// logging:
    ///   format: json
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(!cfg.browser.enabled);
    /// assert_eq!(cfg.browser.settle_delay_ms, 0);
    /// assert_eq!(cfg.browser.webdriver_url, "http://localhost:9515");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources (environment last), expand `${VAR}` placeholders and
    /// deserialize into [`PagegrabConfig`].
    pub fn load(self) -> Result<PagegrabConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("PAGEGRAB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_nested_objects() {
        temp_env::with_vars([("SNAP_ROOT", Some("/data")), ("UA", Some("bot/1.0"))], || {
            let mut v = json!({
                "output_dir": "${SNAP_ROOT}/pages",
                "http": { "user_agent": "$UA", "max_attempts": 3 }
            });
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!({
                    "output_dir": "/data/pages",
                    "http": { "user_agent": "bot/1.0", "max_attempts": 3 }
                })
            );
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${PAGEGRAB_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${PAGEGRAB_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_match_documented_policy() {
        let cfg = PagegrabConfig::default();
        assert_eq!(cfg.http.connect_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.http.read_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.http.max_attempts, 3);
        assert_eq!(cfg.http.backoff_base(), Duration::from_secs(1));
        assert_eq!(cfg.browser.settle_delay(), Duration::from_secs(3));
        assert!(cfg.browser.enabled);
    }

    #[test]
    fn logging_settings_map_to_log_config() {
        let settings = LoggingSettings {
            dir: Some(PathBuf::from("/tmp/pg-logs")),
            format: LogFormat::Json,
            stderr: false,
            filter: "debug".into(),
        };
        let log = settings.to_log_config();
        assert_eq!(log.app_name, "pagegrab");
        assert_eq!(log.log_dir, Some(PathBuf::from("/tmp/pg-logs")));
        assert_eq!(log.format, LogFormat::Json);
        assert!(!log.emit_stderr);
        assert_eq!(log.default_filter, "debug");
    }
}
