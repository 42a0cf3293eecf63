use clap::builder::TypedValueParser as _;
use clap::{Args, Parser};
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_GOOGLE_VALIDATE_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
pub const DEFAULT_BLOGGER_API_URL: &str = "https://www.googleapis.com/blogger/v3/blogs";
pub const DEFAULT_WPCOM_AUTHORIZE_URL: &str = "https://public-api.wordpress.com/oauth2/authorize";
pub const DEFAULT_WPCOM_TOKEN_URL: &str = "https://public-api.wordpress.com/oauth2/token";
pub const DEFAULT_WPCOM_VALIDATE_URL: &str = "https://public-api.wordpress.com/oauth2/token-info";
pub const DEFAULT_WPCOM_API_URL: &str = "https://public-api.wordpress.com";
pub const DEFAULT_PROTOCOL_REDIRECT_URI: &str = "obsidian://blogger-oauth2";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Process configuration. Every flag can also be set through the environment or a
/// `.env` file.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// JSON file holding profiles, tokens and publishing preferences
    #[arg(long, env, default_value = "blogger-settings.json")]
    pub settings_path: PathBuf,

    /// Root directory that notes and attachments are resolved against
    #[arg(long, env, default_value = ".")]
    pub vault_path: PathBuf,

    /// Google OAuth2 client ID (overrides the one stored in settings)
    #[arg(long, env)]
    google_client_id: Option<String>,

    /// Google OAuth2 client secret (overrides the one stored in settings)
    #[arg(long, env, hide_env_values = true)]
    google_client_secret: Option<String>,

    /// WordPress.com OAuth2 client ID (overrides the one stored in settings)
    #[arg(long, env)]
    wpcom_client_id: Option<String>,

    /// WordPress.com OAuth2 client secret (overrides the one stored in settings)
    #[arg(long, env, hide_env_values = true)]
    wpcom_client_secret: Option<String>,

    #[command(flatten)]
    pub endpoints: EndpointConfig,

    /// Timeout in seconds for each HTTP request
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Retries for read-only API requests. Publish and media upload are never retried.
    #[arg(long, env, default_value_t = 3)]
    pub http_max_retries: u32,

    /// Seconds to wait for the browser to come back from the authorize page
    #[arg(long, env, default_value_t = 300)]
    pub authorize_timeout_secs: u64,

    /// Receive OAuth redirects through the custom URI scheme instead of a loopback port
    #[arg(long, env, default_value_t = false)]
    pub mobile: bool,

    /// Redirect URI registered for the custom URI scheme strategy
    #[arg(long, env, default_value = DEFAULT_PROTOCOL_REDIRECT_URI)]
    pub protocol_redirect_uri: String,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap_or(RustEnv::Development)),
    )]
    pub runtime_env: RustEnv,
}

/// Provider endpoints. Overridable so tests can point at a mock server.
#[derive(Clone, Debug, Args)]
pub struct EndpointConfig {
    #[arg(long, env, default_value = DEFAULT_GOOGLE_AUTHORIZE_URL)]
    pub google_authorize_url: String,

    #[arg(long, env, default_value = DEFAULT_GOOGLE_TOKEN_URL)]
    pub google_token_url: String,

    #[arg(long, env, default_value = DEFAULT_GOOGLE_VALIDATE_URL)]
    pub google_validate_url: String,

    /// Base URL of the Blogger v3 `blogs` collection
    #[arg(long, env, default_value = DEFAULT_BLOGGER_API_URL)]
    pub blogger_api_url: String,

    #[arg(long, env, default_value = DEFAULT_WPCOM_AUTHORIZE_URL)]
    pub wpcom_authorize_url: String,

    #[arg(long, env, default_value = DEFAULT_WPCOM_TOKEN_URL)]
    pub wpcom_token_url: String,

    #[arg(long, env, default_value = DEFAULT_WPCOM_VALIDATE_URL)]
    pub wpcom_validate_url: String,

    /// Origin of the WordPress.com REST API
    #[arg(long, env, default_value = DEFAULT_WPCOM_API_URL)]
    pub wpcom_api_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            google_authorize_url: DEFAULT_GOOGLE_AUTHORIZE_URL.to_string(),
            google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
            google_validate_url: DEFAULT_GOOGLE_VALIDATE_URL.to_string(),
            blogger_api_url: DEFAULT_BLOGGER_API_URL.to_string(),
            wpcom_authorize_url: DEFAULT_WPCOM_AUTHORIZE_URL.to_string(),
            wpcom_token_url: DEFAULT_WPCOM_TOKEN_URL.to_string(),
            wpcom_validate_url: DEFAULT_WPCOM_VALIDATE_URL.to_string(),
            wpcom_api_url: DEFAULT_WPCOM_API_URL.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("blogger-settings.json"),
            vault_path: PathBuf::from("."),
            google_client_id: None,
            google_client_secret: None,
            wpcom_client_id: None,
            wpcom_client_secret: None,
            endpoints: EndpointConfig::default(),
            http_timeout_secs: 30,
            http_max_retries: 3,
            authorize_timeout_secs: 300,
            mobile: false,
            protocol_redirect_uri: DEFAULT_PROTOCOL_REDIRECT_URI.to_string(),
            log_level_filter: LevelFilter::Info,
            runtime_env: RustEnv::Development,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        load_dotenv();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn set_google_credentials(mut self, client_id: String, client_secret: String) -> Self {
        self.google_client_id = Some(client_id);
        self.google_client_secret = Some(client_secret);
        self
    }

    pub fn set_wpcom_credentials(mut self, client_id: String, client_secret: String) -> Self {
        self.wpcom_client_id = Some(client_id);
        self.wpcom_client_secret = Some(client_secret);
        self
    }

    pub fn google_client_id(&self) -> Option<String> {
        self.google_client_id.clone()
    }

    pub fn google_client_secret(&self) -> Option<String> {
        self.google_client_secret.clone()
    }

    pub fn wpcom_client_id(&self) -> Option<String> {
        self.wpcom_client_id.clone()
    }

    pub fn wpcom_client_secret(&self) -> Option<String> {
        self.wpcom_client_secret.clone()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn authorize_timeout(&self) -> Duration {
        Duration::from_secs(self.authorize_timeout_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

/// Load a `.env` file from the working directory, if any.
pub fn load_dotenv() {
    dotenv().ok();
}
