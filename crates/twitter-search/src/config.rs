//! Service configuration.

use clap::Args;
use std::fmt;
use std::path::PathBuf;

use crate::auth::DEFAULT_COOKIES_FILE;
use crate::twitter::DEFAULT_API_BASE;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Upstream account credentials.
#[derive(Clone)]
pub struct Credentials {
    /// Account handle or login identifier.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Email used to answer identity challenges during login.
    pub email: Option<String>,
}

impl Credentials {
    /// Build credentials when both username and password are present and non-empty.
    #[must_use]
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
        email: Option<String>,
    ) -> Option<Self> {
        let username = username.filter(|u| !u.is_empty())?;
        let password = password.filter(|p| !p.is_empty())?;
        Some(Self {
            username,
            password,
            email: email.filter(|e| !e.is_empty()),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Upstream username
    #[arg(long, env = "TWITTER_USERNAME", hide_env_values = true)]
    pub username: Option<String>,

    /// Upstream password
    #[arg(long, env = "TWITTER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Email for login identity challenges
    #[arg(long, env = "TWITTER_EMAIL", hide_env_values = true)]
    pub email: Option<String>,

    /// Session cookie file
    #[arg(long, env = "TWITTER_COOKIES_FILE", default_value = DEFAULT_COOKIES_FILE)]
    pub cookies_file: PathBuf,

    /// Upstream API base URL
    #[arg(long, env = "TWITTER_API_BASE", default_value = DEFAULT_API_BASE, hide = true)]
    pub api_base: String,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credentials for fresh logins, if configured.
    pub credentials: Option<Credentials>,
    /// Session cookie file.
    pub cookies_file: PathBuf,
    /// Upstream API base URL.
    pub api_base: String,
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Self {
            credentials: Credentials::from_parts(args.username, args.password, args.email),
            cookies_file: args.cookies_file,
            api_base: args.api_base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: None,
            cookies_file: PathBuf::from(DEFAULT_COOKIES_FILE),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}
