use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

/// Environment variable prefix shared by every override.
pub const ENV_PREFIX: &str = "DOC2MD";

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub cors: Option<CorsSection>,
    #[serde(default)]
    pub store: Option<StoreSection>,
    #[serde(default)]
    pub tasks: Option<TasksSection>,
    #[serde(default)]
    pub security: Option<SecuritySection>,
    #[serde(default)]
    pub stats: Option<StatsSection>,
    #[serde(default)]
    pub converter: Option<ConverterSection>,
    #[serde(default)]
    pub worker: Option<WorkerSection>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct CorsSection {
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub db: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TasksSection {
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SecuritySection {
    #[serde(default)]
    pub deploy_token: Option<String>,
    #[serde(default)]
    pub deploy_script: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsSection {
    #[serde(default)]
    pub database_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConverterSection {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub builtin_html: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerSection {
    #[serde(default)]
    pub queue_name: Option<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
    #[serde(default)]
    pub embedded: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

/// Parse configuration from a string with optional format hint
#[inline]
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try to parse config by attempting each enabled format
#[inline]
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s;
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub store: StoreConfig,
    pub tasks: TasksConfig,
    pub security: SecurityConfig,
    pub stats: StatsConfig,
    pub converter: ConverterConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Which key-value store implementation backs tasks and the job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("redis") {
            Ok(Self::Redis)
        } else if s.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else {
            Err(ConfigError::Validation(format!(
                "unsupported store backend: {s}"
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub db: u32,
}

impl StoreConfig {
    /// Connection URL for the redis backend.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TasksConfig {
    pub ttl_secs: u64,
    pub job_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityConfig {
    /// Shared secret for `/deploy`, `/stats` and `/jobs/failed`. Empty means unset.
    #[serde(skip_serializing)]
    pub deploy_token: String,
    pub deploy_script: String,
}

impl SecurityConfig {
    pub fn deploy_token(&self) -> Option<&str> {
        if self.deploy_token.is_empty() {
            None
        } else {
            Some(&self.deploy_token)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsConfig {
    pub database_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConverterConfig {
    pub program: String,
    pub args: Vec<String>,
    pub builtin_html: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerConfig {
    pub queue_name: String,
    pub concurrency: usize,
    pub poll_timeout_secs: u64,
    pub embedded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            store: StoreConfig {
                backend: StoreBackend::Redis,
                host: "localhost".to_string(),
                port: 6379,
                db: 0,
            },
            tasks: TasksConfig {
                ttl_secs: 300,
                job_timeout_secs: 300,
                max_upload_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                deploy_token: String::new(),
                deploy_script: "/app/scripts/deploy.sh".to_string(),
            },
            stats: StatsConfig {
                database_url: "sqlite://data/stats.db".to_string(),
            },
            converter: ConverterConfig {
                program: "markitdown".to_string(),
                args: Vec::new(),
                builtin_html: false,
            },
            worker: WorkerConfig {
                queue_name: "default".to_string(),
                concurrency: 1,
                poll_timeout_secs: 5,
                embedded: false,
            },
        }
    }
}

#[inline]
fn parse_bool(s: &str) -> Result<bool, ()> {
    let bytes = s.as_bytes();
    match bytes {
        b"1" | b"true" | b"TRUE" | b"True" | b"yes" | b"YES" | b"Yes" | b"y" | b"Y" => Ok(true),
        b"0" | b"false" | b"FALSE" | b"False" | b"no" | b"NO" | b"No" | b"n" | b"N" => Ok(false),
        _ => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(true),
            "false" | "no" | "n" => Ok(false),
            _ => Err(()),
        },
    }
}

#[inline]
fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .filter_map(|p| {
            let trimmed = p.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        apply_raw(&mut cfg, raw)?;
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw(cfg: &mut Config, raw: RawConfigFile) -> Result<(), ConfigError> {
    if let Some(server) = raw.server {
        apply_opt!(cfg.server.host, server.host);
        apply_opt!(cfg.server.port, server.port);
    }
    if let Some(logging) = raw.logging {
        apply_opt!(cfg.logging.level, logging.level);
        apply_opt!(cfg.logging.json, logging.json);
    }
    if let Some(cors) = raw.cors {
        apply_opt!(cfg.cors.allowed_origins, cors.allowed_origins);
    }
    if let Some(store) = raw.store {
        if let Some(backend) = store.backend {
            cfg.store.backend = backend.parse()?;
        }
        apply_opt!(cfg.store.host, store.host);
        apply_opt!(cfg.store.port, store.port);
        apply_opt!(cfg.store.db, store.db);
    }
    if let Some(tasks) = raw.tasks {
        apply_opt!(cfg.tasks.ttl_secs, tasks.ttl_secs);
        apply_opt!(cfg.tasks.job_timeout_secs, tasks.job_timeout_secs);
        apply_opt!(cfg.tasks.max_upload_bytes, tasks.max_upload_bytes);
    }
    if let Some(security) = raw.security {
        apply_opt!(cfg.security.deploy_token, security.deploy_token);
        apply_opt!(cfg.security.deploy_script, security.deploy_script);
    }
    if let Some(stats) = raw.stats {
        apply_opt!(cfg.stats.database_url, stats.database_url);
    }
    if let Some(converter) = raw.converter {
        apply_opt!(cfg.converter.program, converter.program);
        apply_opt!(cfg.converter.args, converter.args);
        apply_opt!(cfg.converter.builtin_html, converter.builtin_html);
    }
    if let Some(worker) = raw.worker {
        apply_opt!(cfg.worker.queue_name, worker.queue_name);
        apply_opt!(cfg.worker.concurrency, worker.concurrency);
        apply_opt!(cfg.worker.poll_timeout_secs, worker.poll_timeout_secs);
        apply_opt!(cfg.worker.embedded, worker.embedded);
    }
    Ok(())
}

#[inline]
fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}_{suffix}")
}

/// Helper to parse env var as a specific type
#[inline]
fn env_parse<T: std::str::FromStr>(suffix: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let key = env_key(suffix);
    match env::var(&key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Helper to parse env var as bool
#[inline]
fn env_bool(suffix: &str) -> Result<Option<bool>, ConfigError> {
    let key = env_key(suffix);
    match env::var(&key) {
        Ok(v) => parse_bool(v.trim())
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_str(suffix: &str) -> Option<String> {
    env::var(env_key(suffix)).ok()
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Server
    if let Some(v) = env_str("SERVER_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("SERVER_PORT")? {
        cfg.server.port = v;
    }

    // Logging
    if let Some(v) = env_str("LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("LOG_JSON")? {
        cfg.logging.json = v;
    }

    // CORS
    if let Some(v) = env_str("ALLOWED_ORIGINS") {
        cfg.cors.allowed_origins = split_csv(&v);
    }

    // Store
    if let Some(v) = env_str("STORE_BACKEND") {
        cfg.store.backend = v.parse()?;
    }
    if let Some(v) = env_str("REDIS_HOST") {
        cfg.store.host = v;
    }
    if let Some(v) = env_parse::<u16>("REDIS_PORT")? {
        cfg.store.port = v;
    }
    if let Some(v) = env_parse::<u32>("REDIS_DB")? {
        cfg.store.db = v;
    }

    // Tasks
    if let Some(v) = env_parse::<u64>("TASK_TTL")? {
        cfg.tasks.ttl_secs = v;
    }
    if let Some(v) = env_parse::<u64>("JOB_TIMEOUT")? {
        cfg.tasks.job_timeout_secs = v;
    }
    if let Some(v) = env_parse::<usize>("MAX_UPLOAD_BYTES")? {
        cfg.tasks.max_upload_bytes = v;
    }

    // Security
    if let Some(v) = env_str("DEPLOY_TOKEN") {
        cfg.security.deploy_token = v;
    }
    if let Some(v) = env_str("DEPLOY_SCRIPT") {
        cfg.security.deploy_script = v;
    }

    // Stats
    if let Some(v) = env_str("STATS_DATABASE_URL") {
        cfg.stats.database_url = v;
    }

    // Converter
    if let Some(v) = env_str("CONVERTER_PROGRAM") {
        cfg.converter.program = v;
    }
    if let Some(v) = env_str("CONVERTER_ARGS") {
        cfg.converter.args = v.split_whitespace().map(str::to_string).collect();
    }
    if let Some(v) = env_bool("CONVERTER_BUILTIN_HTML")? {
        cfg.converter.builtin_html = v;
    }

    // Worker
    if let Some(v) = env_str("QUEUE_NAME") {
        cfg.worker.queue_name = v;
    }
    if let Some(v) = env_parse::<usize>("WORKER_CONCURRENCY")? {
        cfg.worker.concurrency = v;
    }
    if let Some(v) = env_parse::<u64>("WORKER_POLL_TIMEOUT")? {
        cfg.worker.poll_timeout_secs = v;
    }
    if let Some(v) = env_bool("WORKER_EMBEDDED")? {
        cfg.worker.embedded = v;
    }

    Ok(())
}

/// Validate higher-level constraints on the resolved configuration.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.port == 0 {
        return Err(ConfigError::Validation("server.port must be > 0".into()));
    }
    let host_ok = cfg.server.host.parse::<std::net::IpAddr>().is_ok()
        || HOSTNAME_REGEX.is_match(&cfg.server.host);
    if !host_ok {
        return Err(ConfigError::Validation(format!(
            "invalid server.host: {}",
            cfg.server.host
        )));
    }

    if cfg.store.backend == StoreBackend::Redis && !HOSTNAME_REGEX.is_match(&cfg.store.host) {
        return Err(ConfigError::Validation(format!(
            "invalid store.host: {}",
            cfg.store.host
        )));
    }

    if cfg.tasks.ttl_secs == 0 {
        return Err(ConfigError::Validation("tasks.ttl_secs must be > 0".into()));
    }
    if cfg.tasks.job_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "tasks.job_timeout_secs must be > 0".into(),
        ));
    }
    if cfg.worker.concurrency == 0 {
        return Err(ConfigError::Validation(
            "worker.concurrency must be > 0".into(),
        ));
    }
    if cfg.worker.queue_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "worker.queue_name must not be empty".into(),
        ));
    }
    if cfg.converter.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "converter.program must not be empty".into(),
        ));
    }
    // memory-store jobs are only visible inside this process
    if cfg.store.backend == StoreBackend::Memory && !cfg.worker.embedded {
        return Err(ConfigError::Validation(
            "store.backend = memory requires worker.embedded = true".into(),
        ));
    }

    for origin in &cfg.cors.allowed_origins {
        if origin == "*" {
            continue;
        }
        match url::Url::parse(origin) {
            Ok(u) => {
                let scheme = u.scheme();
                if scheme != "http" && scheme != "https" {
                    return Err(ConfigError::Validation(format!(
                        "CORS origin must be http or https: {}",
                        origin
                    )));
                }
            }
            Err(_) => {
                return Err(ConfigError::Validation(format!(
                    "invalid CORS origin: {}",
                    origin
                )))
            }
        }
    }
    Ok(())
}
