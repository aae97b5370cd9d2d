//! Configuration for the mailbox connection.
//!
//! Use [`ImapConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use streamcode_scan::ImapConfig;
//!
//! let config = ImapConfig::builder()
//!     .username("store@gmail.com")
//!     .password("app-password")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.server_address(), "imap.gmail.com:993");
//! assert_eq!(config.folder, "INBOX");
//! ```
//!
//! Username and password are required. A missing one is reported as
//! [`Error::MissingConfig`] before any connection is attempted.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Default IMAPS port.
pub const DEFAULT_PORT: u16 = 993;

/// Default mailbox folder.
pub const DEFAULT_FOLDER: &str = "INBOX";

/// Environment variable names read by [`ImapConfig::from_env`].
pub mod env_vars {
    /// IMAP server hostname.
    pub const HOST: &str = "MAILBOX_HOST";
    /// IMAP server port.
    pub const PORT: &str = "MAILBOX_PORT";
    /// Login username.
    pub const USERNAME: &str = "MAILBOX_USERNAME";
    /// Login password (app password for Gmail).
    pub const PASSWORD: &str = "MAILBOX_PASSWORD";
    /// Folder to scan.
    pub const FOLDER: &str = "MAILBOX_FOLDER";
}

/// Configuration for connecting to the shared mailbox.
///
/// Create using [`ImapConfig::builder()`] or [`ImapConfig::from_env()`].
///
/// The `password` field is stored as a [`SecretString`] and redacted from `Debug`.
#[derive(Clone)]
pub struct ImapConfig {
    username: String,
    password: SecretString,
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port (default: 993 for IMAPS).
    pub port: u16,
    /// Folder to scan (default: `INBOX`).
    pub folder: String,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("folder", &self.folder)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl ImapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ImapConfigBuilder {
        ImapConfigBuilder::default()
    }

    /// Builds a configuration from `MAILBOX_*` environment variables.
    ///
    /// See [`env_vars`] for the names. `MAILBOX_USERNAME` and `MAILBOX_PASSWORD` are required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] if a required variable is unset and
    /// [`Error::InvalidConfig`] if `MAILBOX_PORT` is not a valid port.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup using the [`env_vars`] names.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(username) = lookup(env_vars::USERNAME) {
            builder = builder.username(username);
        }
        if let Some(password) = lookup(env_vars::PASSWORD) {
            builder = builder.password(password);
        }
        if let Some(host) = lookup(env_vars::HOST).filter(|h| !h.trim().is_empty()) {
            builder = builder.host(host);
        }
        if let Some(port) = lookup(env_vars::PORT).filter(|p| !p.trim().is_empty()) {
            let port = port.trim().parse::<u16>().map_err(|_| Error::InvalidConfig {
                message: format!("{} is not a valid port: {port}", env_vars::PORT),
            })?;
            builder = builder.port(port);
        }
        if let Some(folder) = lookup(env_vars::FOLDER).filter(|f| !f.trim().is_empty()) {
            builder = builder.folder(folder);
        }

        builder.build()
    }

    /// Returns the login username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password as a string slice.
    ///
    /// Only pass this to authentication; the password is intentionally kept out of logs.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Timeout configuration for each step of a mailbox session.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for opening the folder.
    pub select: Duration,
    /// Timeout for the date-bounded search.
    pub search: Duration,
    /// Timeout for fetching one message.
    pub fetch: Duration,
    /// Timeout for logout.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            search: Duration::from_secs(10),
            fetch: Duration::from_secs(30),
            logout: Duration::from_secs(5),
        }
    }
}

/// Returns the IMAP host for well-known providers, or `imap.{domain}` otherwise.
///
/// ```
/// use streamcode_scan::config::discover_imap_host;
///
/// assert_eq!(discover_imap_host("gmail.com"), "imap.gmail.com");
/// assert_eq!(discover_imap_host("Example.ORG"), "imap.example.org");
/// ```
#[must_use]
pub fn discover_imap_host(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();

    let known = match domain.as_str() {
        "gmail.com" | "googlemail.com" => Some("imap.gmail.com"),
        "hotmail.com" | "outlook.com" | "live.com" => Some("imap-mail.outlook.com"),
        "yahoo.com" | "yahoo.com.br" => Some("imap.mail.yahoo.com"),
        "icloud.com" | "me.com" | "mac.com" => Some("imap.mail.me.com"),
        "aol.com" => Some("imap.aol.com"),
        "gmx.com" | "gmx.net" | "gmx.de" => Some("imap.gmx.net"),
        _ => None,
    };

    known.map_or_else(|| format!("imap.{domain}"), str::to_string)
}

/// Builder for [`ImapConfig`].
#[derive(Debug, Default)]
pub struct ImapConfigBuilder {
    username: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    folder: Option<String>,
    timeouts: Option<TimeoutConfig>,
}

impl ImapConfigBuilder {
    /// Sets the login username (required).
    ///
    /// When it is an email address and no host is set, the host is derived from its domain.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password (required).
    ///
    /// For Gmail/Outlook, use an app-specific password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the IMAP server hostname explicitly.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the IMAP server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the folder to scan.
    #[must_use]
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Sets the per-message fetch timeout.
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .fetch = timeout;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] if the username or password is absent or blank,
    /// or if no host is set and none can be derived from the username.
    /// Returns [`Error::InvalidConfig`] for a zero port or blank folder.
    pub fn build(self) -> Result<ImapConfig> {
        let username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(Error::MissingConfig { field: "username" })?;

        let password = self
            .password
            .filter(|p| !p.trim().is_empty())
            .ok_or(Error::MissingConfig { field: "password" })?;

        // Explicit host > derived from username domain
        let host = match self.host.map(|h| h.trim().to_string()) {
            Some(host) if !host.is_empty() => host,
            _ => username
                .rsplit_once('@')
                .map(|(_, domain)| domain)
                .filter(|domain| !domain.is_empty())
                .map(discover_imap_host)
                .ok_or(Error::MissingConfig { field: "host" })?,
        };

        let port = self.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(Error::InvalidConfig {
                message: "port must be non-zero".into(),
            });
        }

        let folder = self.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        if folder.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "folder must not be blank".into(),
            });
        }

        Ok(ImapConfig {
            username,
            password: SecretString::from(password),
            host,
            port,
            folder,
            timeouts: self.timeouts.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_minimal() {
        let config = ImapConfig::builder()
            .username("store@gmail.com")
            .password("secret")
            .build()
            .unwrap();

        assert_eq!(config.username(), "store@gmail.com");
        assert_eq!(config.password(), "secret");
        assert_eq!(config.host, "imap.gmail.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.folder, "INBOX");
    }

    #[test]
    fn test_builder_full() {
        let config = ImapConfig::builder()
            .username("scanner")
            .password("secret")
            .host("mail.example.com")
            .port(1993)
            .folder("Codes")
            .connect_timeout(Duration::from_secs(60))
            .fetch_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.server_address(), "mail.example.com:1993");
        assert_eq!(config.folder, "Codes");
        assert_eq!(config.timeouts.connect, Duration::from_secs(60));
        assert_eq!(config.timeouts.fetch, Duration::from_secs(5));
        assert_eq!(config.timeouts.auth, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_missing_username() {
        let result = ImapConfig::builder().password("secret").build();
        assert!(matches!(
            result,
            Err(Error::MissingConfig { field: "username" })
        ));
    }

    #[test]
    fn test_builder_missing_password() {
        let result = ImapConfig::builder().username("a@example.com").build();
        assert!(matches!(
            result,
            Err(Error::MissingConfig { field: "password" })
        ));

        let result = ImapConfig::builder()
            .username("a@example.com")
            .password("")
            .build();
        assert!(matches!(
            result,
            Err(Error::MissingConfig { field: "password" })
        ));
    }

    #[test]
    fn test_builder_missing_host_without_domain() {
        let result = ImapConfig::builder()
            .username("scanner")
            .password("secret")
            .build();
        assert!(matches!(result, Err(Error::MissingConfig { field: "host" })));
    }

    #[test]
    fn test_builder_rejects_zero_port() {
        let result = ImapConfig::builder()
            .username("a@example.com")
            .password("secret")
            .port(0)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_unknown_domain_fallback() {
        let config = ImapConfig::builder()
            .username("codes@henrique-store.com.br")
            .password("secret")
            .build()
            .unwrap();
        assert_eq!(config.host, "imap.henrique-store.com.br");
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = ImapConfig::builder()
            .username("user@example.com")
            .password("super-secret-password")
            .build()
            .unwrap();

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret-password"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env_vars::USERNAME, "store@gmail.com"),
            (env_vars::PASSWORD, "muvm dnyn"),
            (env_vars::PORT, "993"),
            (env_vars::FOLDER, "[Gmail]/All Mail"),
        ]);

        let config = ImapConfig::from_vars(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(config.host, "imap.gmail.com");
        assert_eq!(config.folder, "[Gmail]/All Mail");
        assert_eq!(config.password(), "muvm dnyn");
    }

    #[test]
    fn test_from_vars_missing_password() {
        let result = ImapConfig::from_vars(|k| {
            (k == env_vars::USERNAME).then(|| "store@gmail.com".to_string())
        });
        assert!(matches!(
            result,
            Err(Error::MissingConfig { field: "password" })
        ));
    }

    #[test]
    fn test_from_vars_invalid_port() {
        let result = ImapConfig::from_vars(|k| match k {
            env_vars::USERNAME => Some("a@example.com".into()),
            env_vars::PASSWORD => Some("x".into()),
            env_vars::PORT => Some("imaps".into()),
            _ => None,
        });
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
