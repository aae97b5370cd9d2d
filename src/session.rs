//! IMAP session management.
//!
//! This module wraps async-imap operations with timeouts and error mapping, and
//! exposes them through the [`Connector`]/[`Mailbox`] traits. The folder is opened
//! with `EXAMINE` and messages are fetched with `BODY.PEEK[]`, so a scan never
//! changes flags in the shared mailbox.

use crate::config::{ImapConfig, TimeoutConfig};
use crate::connection::{self, TlsStream};
use crate::error::{Error, Result};
use crate::mailbox::{Connector, Mailbox};
use async_imap::Session;
use chrono::NaiveDate;
use futures::StreamExt;
use tracing::{debug, instrument, warn};

/// Type alias for IMAP session over TLS.
pub(crate) type ImapSession = Session<TlsStream>;

/// Opens IMAP sessions for an [`ImapConfig`].
///
/// ```no_run
/// use streamcode_scan::{Connector, ImapConfig, ImapConnector, Mailbox};
///
/// # async fn example() -> streamcode_scan::Result<()> {
/// let config = ImapConfig::builder()
///     .username("store@gmail.com")
///     .password("app-password")
///     .build()?;
///
/// let mut mailbox = ImapConnector::new(config).open().await?;
/// mailbox.logout().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: ImapConfig,
}

impl ImapConnector {
    /// Creates a connector for the given configuration.
    #[must_use]
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ImapConfig {
        &self.config
    }
}

impl Connector for ImapConnector {
    type Mailbox = ImapMailbox;

    #[instrument(
        name = "ImapConnector::open",
        skip_all,
        fields(
            username = %self.config.username(),
            host = %self.config.host,
            folder = %self.config.folder
        )
    )]
    async fn open(&self) -> Result<ImapMailbox> {
        let config = &self.config;
        let target_addr = config.server_address();
        let timeouts = &config.timeouts;

        let tls_stream = tokio::time::timeout(
            timeouts.connect,
            connection::establish_tls_connection(&config.host, &target_addr),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: target_addr.clone(),
            timeout: timeouts.connect,
        })??;

        debug!("TLS connection established");

        let session = tokio::time::timeout(
            timeouts.auth,
            authenticate(tls_stream, config.username(), config.password()),
        )
        .await
        .map_err(|_| Error::AuthTimeout {
            username: config.username().to_string(),
            timeout: timeouts.auth,
        })??;

        debug!("Authenticated");

        let mut mailbox = ImapMailbox {
            session: Box::new(session),
            timeouts: timeouts.clone(),
        };

        let examined = tokio::time::timeout(
            timeouts.select,
            examine_mailbox(&mut mailbox.session, &config.folder),
        )
        .await
        .map_err(|_| Error::SelectTimeout {
            mailbox: config.folder.clone(),
            timeout: timeouts.select,
        })
        .and_then(|result| result);

        release_on_error(&mut mailbox, examined).await?;

        debug!("Folder opened read-only");

        Ok(mailbox)
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.config.server_address(), self.config.folder)
    }
}

/// An authenticated IMAP session with the scan folder opened read-only.
pub struct ImapMailbox {
    session: Box<ImapSession>,
    timeouts: TimeoutConfig,
}

impl std::fmt::Debug for ImapMailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapMailbox")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Mailbox for ImapMailbox {
    async fn search_since(&mut self, since: NaiveDate) -> Result<Vec<u32>> {
        let timeout = self.timeouts.search;

        tokio::time::timeout(timeout, search_emails_since(&mut self.session, since))
            .await
            .map_err(|_| Error::SearchTimeout { timeout })?
    }

    async fn fetch_raw(&mut self, uid: u32) -> Result<Option<Vec<u8>>> {
        let timeout = self.timeouts.fetch;

        tokio::time::timeout(timeout, fetch_message(&mut self.session, uid))
            .await
            .map_err(|_| Error::FetchTimeout { uid, timeout })?
    }

    async fn logout(&mut self) -> Result<()> {
        let timeout = self.timeouts.logout;

        tokio::time::timeout(timeout, logout(&mut self.session))
            .await
            .map_err(|_| Error::LogoutTimeout { timeout })?
    }
}

/// Authenticates to IMAP server and returns a session.
#[instrument(name = "session::authenticate", skip_all, fields(username = %username))]
async fn authenticate(tls_stream: TlsStream, username: &str, password: &str) -> Result<ImapSession> {
    let client = async_imap::Client::new(tls_stream);

    debug!("Authenticating to IMAP server");

    client
        .login(username, password)
        .await
        .map_err(|e| Error::ImapLogin {
            username: username.to_string(),
            source: e.0,
        })
}

/// Opens a folder read-only (`EXAMINE`).
#[instrument(name = "session::examine", skip(session), fields(mailbox = %mailbox))]
async fn examine_mailbox(session: &mut ImapSession, mailbox: &str) -> Result<()> {
    let info = session
        .examine(mailbox)
        .await
        .map_err(|source| Error::SelectMailbox {
            mailbox: mailbox.to_string(),
            source,
        })?;

    debug!(exists = info.exists, "Folder opened");

    Ok(())
}

/// Searches for email UIDs since a given date.
#[instrument(
    name = "session::search_since",
    skip(session),
    fields(since_date = %since_date)
)]
async fn search_emails_since(session: &mut ImapSession, since_date: NaiveDate) -> Result<Vec<u32>> {
    // IMAP SINCE format: "DD-Mon-YYYY" (e.g., "07-Dec-2025")
    let query = format!("SINCE {}", since_date.format("%d-%b-%Y"));

    let uids = session
        .uid_search(&query)
        .await
        .map_err(|source| Error::ImapSearch { source })?;

    let uids: Vec<u32> = uids.into_iter().collect();

    debug!(uid_count = uids.len(), "Found emails");

    Ok(uids)
}

/// Fetches one message by UID, leaving its `\Seen` flag untouched.
#[instrument(name = "session::fetch", skip(session))]
async fn fetch_message(session: &mut ImapSession, uid: u32) -> Result<Option<Vec<u8>>> {
    let uid_str = uid.to_string();

    let mut stream = session
        .uid_fetch(&uid_str, "BODY.PEEK[]")
        .await
        .map_err(|source| Error::ImapFetch { uid, source })?
        .boxed();

    // Drain the whole stream so the session is ready for the next command
    let mut raw = None;
    while let Some(item) = stream.next().await {
        let fetch = item.map_err(|source| Error::ImapFetch { uid, source })?;
        if raw.is_none() {
            raw = fetch.body().map(<[u8]>::to_vec);
        }
    }

    debug!(found = raw.is_some(), "Fetched message");

    Ok(raw)
}

/// Logs out from IMAP session.
#[instrument(name = "session::logout", skip(session))]
async fn logout(session: &mut ImapSession) -> Result<()> {
    debug!("Logging out");

    session
        .logout()
        .await
        .map_err(|source| Error::ImapLogout { source })?;

    Ok(())
}

/// Logs the session out if `result` is an error, then returns `result`.
///
/// A logout failure is logged; the original error is what the caller sees.
async fn release_on_error<M: Mailbox, T>(mailbox: &mut M, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        debug!(error = %e, "Releasing session after failed setup");
        if let Err(logout_err) = mailbox.logout().await {
            warn!(error = %logout_err, "Logout after failed setup failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingMailbox {
        logouts: usize,
        fail_logout: bool,
    }

    impl Mailbox for CountingMailbox {
        async fn search_since(&mut self, _since: NaiveDate) -> Result<Vec<u32>> {
            Ok(Vec::new())
        }

        async fn fetch_raw(&mut self, _uid: u32) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn logout(&mut self) -> Result<()> {
            self.logouts += 1;
            if self.fail_logout {
                return Err(Error::LogoutTimeout {
                    timeout: Duration::from_secs(5),
                });
            }
            Ok(())
        }
    }

    fn select_timeout() -> Error {
        Error::SelectTimeout {
            mailbox: "INBOX".into(),
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn test_failed_examine_logs_out() {
        let mut mailbox = CountingMailbox::default();

        let result = release_on_error(&mut mailbox, Err::<(), _>(select_timeout())).await;

        assert!(matches!(result, Err(Error::SelectTimeout { .. })));
        assert_eq!(mailbox.logouts, 1);
    }

    #[tokio::test]
    async fn test_logout_failure_keeps_original_error() {
        let mut mailbox = CountingMailbox {
            fail_logout: true,
            ..CountingMailbox::default()
        };

        let result = release_on_error(&mut mailbox, Err::<(), _>(select_timeout())).await;

        assert!(matches!(result, Err(Error::SelectTimeout { .. })));
        assert_eq!(mailbox.logouts, 1);
    }

    #[tokio::test]
    async fn test_successful_examine_keeps_session() {
        let mut mailbox = CountingMailbox::default();

        release_on_error(&mut mailbox, Ok(())).await.unwrap();

        assert_eq!(mailbox.logouts, 0);
    }
}
