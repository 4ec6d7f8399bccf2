//! Configuration for azdo-remote.
//!
//! Values come from, in order of precedence:
//! - CLI flags
//! - `AZDO_*` environment variables
//! - `$XDG_CONFIG_HOME/azdo-remote/config.toml` (or `~/.config/...`)
//! - Built-in defaults
//!
//! Every value remembers where it came from, see [`Setting`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use azdo_remote::config::Config;
//!
//! let config = Config::load_from_file()
//!     .unwrap()
//!     .merge(Config::load_from_env().unwrap());
//! let options = config.client_options();
//! println!("API version: {}", options.api_version);
//! ```

use crate::api::{AccountTokenProvider, ClientOptions, StaticTokenProvider, TokenProvider};
use crate::cli::GlobalArgs;
use crate::error::ConfigError;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const CONFIG_DIR_NAME: &str = "azdo-remote";
const CONFIG_FILE_NAME: &str = "config.toml";

pub const PAT_ENV: &str = "AZDO_PAT";
pub const ENDPOINT_ENV: &str = "AZDO_ENDPOINT";
pub const API_VERSION_ENV: &str = "AZDO_API_VERSION";
pub const ALLOW_RETRIES_ENV: &str = "AZDO_ALLOW_RETRIES";
pub const RETRY_COUNT_ENV: &str = "AZDO_RETRY_COUNT";
pub const RETRY_DELAY_ENV: &str = "AZDO_RETRY_DELAY_MS";
pub const TIMEOUT_ENV: &str = "AZDO_TIMEOUT_SECS";
pub const GIT_EXECUTABLE_ENV: &str = "AZDO_GIT_EXECUTABLE";
pub const TEMP_REPO_PATH_ENV: &str = "AZDO_TEMP_REPO_PATH";
pub const AUTHOR_NAME_ENV: &str = "AZDO_AUTHOR_NAME";
pub const AUTHOR_EMAIL_ENV: &str = "AZDO_AUTHOR_EMAIL";

/// A configuration value and its origin.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting<T> {
    Cli(T),
    /// Value and the variable it was read from.
    Env(T, String),
    File(T, PathBuf),
    Default(T),
}

impl<T> Setting<T> {
    pub fn value(&self) -> &T {
        match self {
            Setting::Cli(value) | Setting::Env(value, _) | Setting::File(value, _) | Setting::Default(value) => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Setting::Cli(value) | Setting::Env(value, _) | Setting::File(value, _) | Setting::Default(value) => value,
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            Setting::Cli(_) => "cli",
            Setting::Env(_, _) => "env",
            Setting::File(_, _) => "file",
            Setting::Default(_) => "default",
        }
    }
}

impl<T> Deref for Setting<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value()
    }
}

/// Shape of `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    pat: Option<String>,
    /// Account name to PAT, for credentials that differ per account.
    accounts: Option<BTreeMap<String, String>>,
    endpoint: Option<String>,
    api_version: Option<String>,
    allow_retries: Option<bool>,
    retry_count: Option<u32>,
    retry_delay_ms: Option<u64>,
    timeout_secs: Option<u64>,
    git_executable: Option<String>,
    temporary_repository_path: Option<String>,
    author_name: Option<String>,
    author_email: Option<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub pat: Option<Setting<SecretString>>,
    pub accounts: Option<Setting<BTreeMap<String, SecretString>>>,
    pub endpoint: Option<Setting<String>>,
    pub api_version: Option<Setting<String>>,
    pub allow_retries: Option<Setting<bool>>,
    pub retry_count: Option<Setting<u32>>,
    pub retry_delay_ms: Option<Setting<u64>>,
    pub timeout_secs: Option<Setting<u64>>,
    pub git_executable: Option<Setting<String>>,
    pub temporary_repository_path: Option<Setting<PathBuf>>,
    pub author_name: Option<Setting<String>>,
    pub author_email: Option<Setting<String>>,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = ClientOptions::default();
        Self {
            pat: None,
            accounts: None,
            endpoint: None,
            api_version: Some(Setting::Default(defaults.api_version)),
            allow_retries: Some(Setting::Default(defaults.allow_retries)),
            retry_count: Some(Setting::Default(defaults.retry_count)),
            retry_delay_ms: Some(Setting::Default(defaults.retry_delay.as_millis() as u64)),
            timeout_secs: Some(Setting::Default(defaults.timeout.as_secs())),
            git_executable: Some(Setting::Default(defaults.git_executable)),
            temporary_repository_path: None,
            author_name: Some(Setting::Default(defaults.author_name)),
            author_email: Some(Setting::Default(defaults.author_email)),
        }
    }
}

impl Config {
    /// A config with no values at all, the identity of [`Config::merge`].
    fn empty() -> Self {
        Self {
            pat: None,
            accounts: None,
            endpoint: None,
            api_version: None,
            allow_retries: None,
            retry_count: None,
            retry_delay_ms: None,
            timeout_secs: None,
            git_executable: None,
            temporary_repository_path: None,
            author_name: None,
            author_email: None,
        }
    }

    /// Path of the config file, without creating anything.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or_else(|| ConfigError::DirectoryCreationError {
                    path: PathBuf::from("~/.config"),
                    message: "could not determine the home directory".to_string(),
                })?
                .join(".config"),
        };
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Defaults overlaid with the config file, when there is one.
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!("Loaded config file {}", path.display());

        let from_file = Self {
            pat: file.pat.map(|p| in_file(SecretString::from(p), &path)),
            accounts: file.accounts.map(|accounts| {
                let accounts = accounts
                    .into_iter()
                    .map(|(account, pat)| (account, SecretString::from(pat)))
                    .collect();
                in_file(accounts, &path)
            }),
            endpoint: file.endpoint.map(|v| in_file(v, &path)),
            api_version: file.api_version.map(|v| in_file(v, &path)),
            allow_retries: file.allow_retries.map(|v| in_file(v, &path)),
            retry_count: file.retry_count.map(|v| in_file(v, &path)),
            retry_delay_ms: file.retry_delay_ms.map(|v| in_file(v, &path)),
            timeout_secs: file.timeout_secs.map(|v| in_file(v, &path)),
            git_executable: file.git_executable.map(|v| in_file(v, &path)),
            temporary_repository_path: file
                .temporary_repository_path
                .map(|v| in_file(PathBuf::from(v), &path)),
            author_name: file.author_name.map(|v| in_file(v, &path)),
            author_email: file.author_email.map(|v| in_file(v, &path)),
        };

        Ok(Self::default().merge(from_file))
    }

    /// Values of the `AZDO_*` variables that are set.
    ///
    /// A variable that is set but does not parse is an error rather than
    /// being silently ignored.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            pat: env_string(PAT_ENV).map(|s| s.map_to(SecretString::from(s.value().clone()))),
            accounts: None,
            endpoint: env_string(ENDPOINT_ENV),
            api_version: env_string(API_VERSION_ENV),
            allow_retries: env_parsed(ALLOW_RETRIES_ENV, "allow_retries")?,
            retry_count: env_parsed(RETRY_COUNT_ENV, "retry_count")?,
            retry_delay_ms: env_parsed(RETRY_DELAY_ENV, "retry_delay_ms")?,
            timeout_secs: env_parsed(TIMEOUT_ENV, "timeout_secs")?,
            git_executable: env_string(GIT_EXECUTABLE_ENV),
            temporary_repository_path: env_string(TEMP_REPO_PATH_ENV)
                .map(|s| s.map_to(PathBuf::from(s.value()))),
            author_name: env_string(AUTHOR_NAME_ENV),
            author_email: env_string(AUTHOR_EMAIL_ENV),
        })
    }

    /// Values given as CLI flags.
    pub fn from_cli(args: &GlobalArgs) -> Self {
        Self {
            pat: args.pat.clone().map(|p| Setting::Cli(SecretString::from(p))),
            endpoint: args.endpoint.clone().map(Setting::Cli),
            api_version: args.api_version.clone().map(Setting::Cli),
            allow_retries: args.no_retries.then_some(Setting::Cli(false)),
            retry_count: args.retry_count.map(Setting::Cli),
            timeout_secs: args.timeout_secs.map(Setting::Cli),
            git_executable: args.git_executable.clone().map(Setting::Cli),
            temporary_repository_path: args.temp_repo_path.clone().map(Setting::Cli),
            ..Self::empty()
        }
    }

    /// File, then environment, then CLI flags over the defaults.
    pub fn resolve(args: &GlobalArgs) -> Result<Self, ConfigError> {
        Ok(Self::load_from_file()?
            .merge(Self::load_from_env()?)
            .merge(Self::from_cli(args)))
    }

    /// Merge with another config, preferring the other's values.
    pub fn merge(self, other: Self) -> Self {
        Self {
            pat: other.pat.or(self.pat),
            accounts: other.accounts.or(self.accounts),
            endpoint: other.endpoint.or(self.endpoint),
            api_version: other.api_version.or(self.api_version),
            allow_retries: other.allow_retries.or(self.allow_retries),
            retry_count: other.retry_count.or(self.retry_count),
            retry_delay_ms: other.retry_delay_ms.or(self.retry_delay_ms),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            git_executable: other.git_executable.or(self.git_executable),
            temporary_repository_path: other
                .temporary_repository_path
                .or(self.temporary_repository_path),
            author_name: other.author_name.or(self.author_name),
            author_email: other.author_email.or(self.author_email),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            endpoint: self.endpoint.as_ref().map(|e| e.value().clone()),
            api_version: value_or(&self.api_version, defaults.api_version),
            allow_retries: value_or(&self.allow_retries, defaults.allow_retries),
            retry_count: value_or(&self.retry_count, defaults.retry_count),
            retry_delay: self
                .retry_delay_ms
                .as_ref()
                .map(|ms| Duration::from_millis(**ms))
                .unwrap_or(defaults.retry_delay),
            timeout: self
                .timeout_secs
                .as_ref()
                .map(|s| Duration::from_secs(**s))
                .unwrap_or(defaults.timeout),
            git_executable: value_or(&self.git_executable, defaults.git_executable),
            temporary_repository_path: self
                .temporary_repository_path
                .as_ref()
                .map(|p| p.value().clone()),
            author_name: value_or(&self.author_name, defaults.author_name),
            author_email: value_or(&self.author_email, defaults.author_email),
            ..defaults
        }
    }

    /// Token provider for the configured PATs.
    ///
    /// Per-account PATs take precedence, with the default PAT as fallback.
    pub fn token_provider(&self) -> Result<Arc<dyn TokenProvider>, ConfigError> {
        match (&self.accounts, &self.pat) {
            (Some(accounts), pat) if !accounts.is_empty() => {
                let mut provider = AccountTokenProvider::new();
                for (account, token) in accounts.value() {
                    provider = provider.with_account(account, token.clone());
                }
                if let Some(pat) = pat {
                    provider = provider.with_fallback(pat.value().clone());
                }
                Ok(Arc::new(provider))
            }
            (_, Some(pat)) => Ok(Arc::new(StaticTokenProvider::new(pat.value().clone()))),
            _ => Err(ConfigError::MissingRequired {
                field: "pat".to_string(),
                env_var: PAT_ENV.to_string(),
            }),
        }
    }

    /// Write a commented sample config unless one exists. Returns its path.
    pub fn create_sample_config() -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::DirectoryCreationError {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let sample = r#"# azdo-remote configuration
# Location: $XDG_CONFIG_HOME/azdo-remote/config.toml or ~/.config/azdo-remote/config.toml

# Default Personal Access Token (prefer the AZDO_PAT environment variable)
# pat = "your-pat"

# Per-account tokens; the default PAT is used for other accounts
# [accounts]
# dnceng = "pat-for-dnceng"

# API version sent when an operation does not pin one
api_version = "5.0"

# Retry transient failures (429, 5xx, network errors) with exponential backoff
allow_retries = true
retry_count = 15
retry_delay_ms = 500

# Request timeout in seconds
timeout_secs = 100

# Git used to push commits
git_executable = "git"
# temporary_repository_path = "/tmp/azdo-remote"
author_name = "DotNet-Bot"
author_email = "dn-bot@microsoft.com"
"#;

        fs::write(&path, sample).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(path)
    }
}

impl Setting<String> {
    fn map_to<U>(&self, value: U) -> Setting<U> {
        match self {
            Setting::Cli(_) => Setting::Cli(value),
            Setting::Env(_, var) => Setting::Env(value, var.clone()),
            Setting::File(_, path) => Setting::File(value, path.clone()),
            Setting::Default(_) => Setting::Default(value),
        }
    }
}

fn in_file<T>(value: T, path: &Path) -> Setting<T> {
    Setting::File(value, path.to_path_buf())
}

fn value_or<T: Clone>(setting: &Option<Setting<T>>, default: T) -> T {
    setting.as_ref().map(|s| s.value().clone()).unwrap_or(default)
}

fn env_string(var: &str) -> Option<Setting<String>> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| Setting::Env(v, var.to_string()))
}

fn env_parsed<T: FromStr>(var: &str, field: &str) -> Result<Option<Setting<T>>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_string(var) else {
        return Ok(None);
    };
    raw.value()
        .trim()
        .parse::<T>()
        .map(|value| Some(raw.map_to(value)))
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("{var}={}: {e}", raw.value()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::file_serial;
    use std::env;
    use tempfile::TempDir;

    const ALL_ENV: [&str; 11] = [
        PAT_ENV,
        ENDPOINT_ENV,
        API_VERSION_ENV,
        ALLOW_RETRIES_ENV,
        RETRY_COUNT_ENV,
        RETRY_DELAY_ENV,
        TIMEOUT_ENV,
        GIT_EXECUTABLE_ENV,
        TEMP_REPO_PATH_ENV,
        AUTHOR_NAME_ENV,
        AUTHOR_EMAIL_ENV,
    ];

    fn clear_env() {
        for var in ALL_ENV {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    /// Points XDG_CONFIG_HOME at a temp dir for the duration of `f`.
    fn with_config_home<R>(content: Option<&str>, f: impl FnOnce(&TempDir) -> R) -> R {
        let temp_dir = TempDir::new().unwrap();
        if let Some(content) = content {
            let dir = temp_dir.path().join(CONFIG_DIR_NAME);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
        }

        let original = env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }
        let result = f(&temp_dir);
        match original {
            Some(val) => unsafe { env::set_var("XDG_CONFIG_HOME", val) },
            None => unsafe { env::remove_var("XDG_CONFIG_HOME") },
        }
        result
    }

    /// # Defaults Match Client Options
    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.pat.is_none());
        assert_eq!(config.api_version, Some(Setting::Default("5.0".to_string())));
        assert_eq!(config.retry_count, Some(Setting::Default(15)));

        let options = config.client_options();
        assert_eq!(options.retry_delay, Duration::from_millis(500));
        assert_eq!(options.timeout, Duration::from_secs(100));
        assert_eq!(options.author_name, "DotNet-Bot");
    }

    #[test]
    fn test_setting_source() {
        let setting = Setting::Env(3u32, RETRY_COUNT_ENV.to_string());
        assert_eq!(*setting, 3);
        assert_eq!(setting.source_name(), "env");
        assert_eq!(Setting::File(1, PathBuf::new()).source_name(), "file");
        assert_eq!(Setting::Cli("x").into_value(), "x");
    }

    /// # Environment Variables
    ///
    /// ## Test Scenario
    /// - Every AZDO_* variable is set
    ///
    /// ## Expected Outcome
    /// - Each value is parsed and tagged with its variable
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_env_all_variables() {
        clear_env();
        unsafe {
            env::set_var(PAT_ENV, "env-pat");
            env::set_var(ENDPOINT_ENV, "http://localhost:8080");
            env::set_var(API_VERSION_ENV, "7.1");
            env::set_var(ALLOW_RETRIES_ENV, "false");
            env::set_var(RETRY_COUNT_ENV, "3");
            env::set_var(RETRY_DELAY_ENV, "250");
            env::set_var(TIMEOUT_ENV, "30");
            env::set_var(GIT_EXECUTABLE_ENV, "/usr/bin/git");
            env::set_var(TEMP_REPO_PATH_ENV, "/tmp/azdo");
            env::set_var(AUTHOR_NAME_ENV, "Env Bot");
            env::set_var(AUTHOR_EMAIL_ENV, "env@example.com");
        }

        let config = Config::load_from_env().unwrap();
        clear_env();

        assert_eq!(config.pat.as_ref().unwrap().expose_secret(), "env-pat");
        assert_eq!(
            config.retry_count,
            Some(Setting::Env(3, RETRY_COUNT_ENV.to_string()))
        );
        let options = config.client_options();
        assert_eq!(options.endpoint.as_deref(), Some("http://localhost:8080"));
        assert_eq!(options.api_version, "7.1");
        assert!(!options.allow_retries);
        assert_eq!(options.retry_delay, Duration::from_millis(250));
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.git_executable, "/usr/bin/git");
        assert_eq!(options.temporary_repository_path, Some(PathBuf::from("/tmp/azdo")));
        assert_eq!(options.author_email, "env@example.com");
    }

    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_env_no_variables() {
        clear_env();
        let config = Config::load_from_env().unwrap();
        assert!(config.pat.is_none());
        assert!(config.retry_count.is_none());
        assert!(config.api_version.is_none());
    }

    /// # Invalid Environment Value
    ///
    /// ## Expected Outcome
    /// - A malformed number is reported with the variable name
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_env_invalid_numeric_value() {
        clear_env();
        unsafe {
            env::set_var(RETRY_COUNT_ENV, "lots");
        }
        let err = Config::load_from_env().unwrap_err();
        clear_env();

        match err {
            ConfigError::InvalidValue { field, message } => {
                assert_eq!(field, "retry_count");
                assert!(message.contains(RETRY_COUNT_ENV));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// # Config File
    ///
    /// ## Test Scenario
    /// - A config file sets the PAT, per-account PATs and some options
    ///
    /// ## Expected Outcome
    /// - File values are tagged with the file path
    /// - Unset values keep their defaults
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_file_valid_toml() {
        let toml_content = r#"
pat = "file-pat"
api_version = "6.0"
retry_count = 4
timeout_secs = 20

[accounts]
dnceng = "dnceng-pat"
devdiv = "devdiv-pat"
"#;

        let (config, temp_dir) = with_config_home(Some(toml_content), |dir| {
            (Config::load_from_file().unwrap(), dir.path().to_path_buf())
        });
        let path = temp_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        assert_eq!(config.api_version, Some(Setting::File("6.0".to_string(), path.clone())));
        assert_eq!(config.retry_count, Some(Setting::File(4, path)));
        assert_eq!(config.allow_retries, Some(Setting::Default(true)));
        assert_eq!(config.accounts.as_ref().unwrap().len(), 2);
        assert_eq!(config.client_options().timeout, Duration::from_secs(20));
    }

    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_file_missing_file_returns_default() {
        let config = with_config_home(None, |_| Config::load_from_file().unwrap());
        assert_eq!(config.api_version, Some(Setting::Default("5.0".to_string())));
        assert!(config.pat.is_none());
    }

    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_file_invalid_toml() {
        let result = with_config_home(Some("retry_count = \"many\""), |_| Config::load_from_file());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));

        let result = with_config_home(Some("colour = \"blue\""), |_| Config::load_from_file());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    #[file_serial(env_tests)]
    fn test_config_path_uses_xdg_config_home() {
        let (path, root) = with_config_home(None, |dir| {
            (Config::config_path().unwrap(), dir.path().to_path_buf())
        });
        assert_eq!(path, root.join("azdo-remote").join("config.toml"));
    }

    /// # Precedence
    ///
    /// ## Test Scenario
    /// - The file, environment and CLI all set the API version
    ///
    /// ## Expected Outcome
    /// - CLI wins over env, env wins over file
    #[test]
    #[file_serial(env_tests)]
    fn test_resolve_precedence() {
        clear_env();
        unsafe {
            env::set_var(API_VERSION_ENV, "env-version");
            env::set_var(RETRY_COUNT_ENV, "7");
        }
        let args = GlobalArgs {
            api_version: Some("cli-version".to_string()),
            no_retries: true,
            ..GlobalArgs::default()
        };

        let config = with_config_home(Some("api_version = \"file-version\"\nretry_count = 2\ntimeout_secs = 9"), |_| {
            Config::resolve(&args).unwrap()
        });
        clear_env();

        assert_eq!(config.api_version, Some(Setting::Cli("cli-version".to_string())));
        assert_eq!(*config.retry_count.unwrap(), 7);
        assert_eq!(config.timeout_secs.as_ref().unwrap().source_name(), "file");
        assert_eq!(config.allow_retries, Some(Setting::Cli(false)));
    }

    /// # Token Provider Selection
    ///
    /// ## Expected Outcome
    /// - No PAT at all is a missing-required error naming AZDO_PAT
    /// - Per-account PATs are preferred, the default PAT is the fallback
    #[tokio::test]
    async fn test_token_provider() {
        match Config::default().token_provider() {
            Err(err) => assert_eq!(
                err.to_string(),
                "pat is required (use --pat, AZDO_PAT env var, or config file)"
            ),
            Ok(_) => panic!("a token provider without any PAT"),
        }

        let config = Config {
            pat: Some(Setting::Cli(SecretString::from("default".to_string()))),
            ..Config::default()
        };
        let provider = config.token_provider().unwrap();
        let token = provider.token_for_account("any").await.unwrap();
        assert_eq!(token.expose_secret(), "default");

        let mut accounts = BTreeMap::new();
        accounts.insert("dnceng".to_string(), SecretString::from("dnceng-pat".to_string()));
        let config = Config {
            accounts: Some(Setting::File(accounts, PathBuf::from("config.toml"))),
            ..config
        };
        let provider = config.token_provider().unwrap();
        assert_eq!(provider.token_for_account("dnceng").await.unwrap().expose_secret(), "dnceng-pat");
        assert_eq!(provider.token_for_account("devdiv").await.unwrap().expose_secret(), "default");
    }

    #[test]
    #[file_serial(env_tests)]
    fn test_create_sample_config() {
        let (path, content, second) = with_config_home(None, |_| {
            let path = Config::create_sample_config().unwrap();
            let content = fs::read_to_string(&path).unwrap();
            fs::write(&path, "pat = \"mine\"").unwrap();
            let second = Config::create_sample_config().unwrap();
            (path.clone(), content, fs::read_to_string(second).unwrap())
        });

        assert!(path.ends_with("azdo-remote/config.toml"));
        assert!(content.contains("retry_count = 15"));
        // An existing file is left alone.
        assert_eq!(second, "pat = \"mine\"");
        // The sample itself parses.
        assert!(toml::from_str::<ConfigFile>(&content).is_ok());
    }
}
