//! The mailbox code scanner.
//!
//! [`Scanner`] opens a session through its [`Connector`], searches the lookback
//! window, and walks candidates most-recent-first until one passes every filter.
//! The session is logged out on every exit path.
//!
//! # Example
//!
//! ```no_run
//! use streamcode_scan::{ImapConfig, ScanOutcome, ScanQuery, Scanner, Service};
//! use streamcode_scan::render::render_fragment;
//!
//! # async fn example() -> streamcode_scan::Result<()> {
//! let config = ImapConfig::builder()
//!     .username("store@gmail.com")
//!     .password("app-password")
//!     .build()?;
//!
//! let scanner = Scanner::new(config);
//! let query = ScanQuery::new(Service::Netflix, "client@example.com").lookback_days(2);
//!
//! match scanner.scan(&query).await? {
//!     ScanOutcome::Found(found) => println!("{}", render_fragment(&found)),
//!     ScanOutcome::NotFound => println!("nothing yet"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::ImapConfig;
use crate::error::{Error, Result};
use crate::filter::{MessageFilter, RecipientPolicy, SubjectFilter};
use crate::mailbox::{Connector, ImapConnector, Mailbox};
use crate::matcher::CodeExtractor;
use crate::parser::{self, ParsedMessage};
use crate::services::{Service, ServiceRegistry};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use email_address::EmailAddress;
use tracing::{debug, info, instrument, warn};

/// Default lookback window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Default number of most-recent candidates examined.
pub const DEFAULT_MAX_SCAN: usize = 50;

/// What to look for in one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanQuery {
    /// Service whose emails are wanted.
    pub service: Service,
    /// Account address the message must be associated with.
    pub target_email: String,
    /// Messages older than `now - lookback_days` are ignored.
    pub lookback_days: u32,
    /// Upper bound on candidates examined.
    pub max_scan: usize,
    /// Constraint on the subject line.
    pub subject_filter: SubjectFilter,
}

impl ScanQuery {
    /// Creates a query with default window, scan budget and no subject constraint.
    #[must_use]
    pub fn new(service: Service, target_email: impl Into<String>) -> Self {
        Self {
            service,
            target_email: target_email.into(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            max_scan: DEFAULT_MAX_SCAN,
            subject_filter: SubjectFilter::Any,
        }
    }

    /// Sets the lookback window.
    #[must_use]
    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Sets the scan budget.
    #[must_use]
    pub fn max_scan(mut self, max_scan: usize) -> Self {
        self.max_scan = max_scan;
        self
    }

    /// Sets the subject constraint.
    #[must_use]
    pub fn subject_filter(mut self, filter: SubjectFilter) -> Self {
        self.subject_filter = filter;
        self
    }

    /// Oldest acceptable message date.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.lookback_days))
    }

    /// Date used for the server-side `SINCE` search.
    ///
    /// Servers compare `SINCE` against dates in their own timezone, so the search
    /// starts one day before the cutoff. The exact cutoff is checked per message.
    #[must_use]
    pub fn since_date(&self, now: DateTime<Utc>) -> NaiveDate {
        (self.cutoff(now) - Duration::days(1)).date_naive()
    }
}

/// Body of a found message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Decoded `text/html` part.
    Html(String),
    /// Decoded `text/plain` part, used when no HTML part exists.
    Text(String),
}

impl MessageBody {
    /// Returns the raw decoded body.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            MessageBody::Html(s) | MessageBody::Text(s) => s,
        }
    }
}

/// The message a scan settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundMessage {
    /// IMAP UID of the message.
    pub uid: u32,
    /// Decoded subject.
    pub subject: String,
    /// Sender address.
    pub from: String,
    /// Message date (scan time if the header was unusable).
    pub date: DateTime<Utc>,
    /// Decoded body, HTML preferred.
    pub body: MessageBody,
    /// Extracted verification codes in order of appearance.
    pub codes: Vec<String>,
}

/// Result of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A message passed every filter.
    Found(FoundMessage),
    /// No message passed within the window and scan budget.
    NotFound,
}

impl ScanOutcome {
    /// Returns the found message, if any.
    #[must_use]
    pub fn found(&self) -> Option<&FoundMessage> {
        match self {
            ScanOutcome::Found(found) => Some(found),
            ScanOutcome::NotFound => None,
        }
    }

    /// Returns `true` for [`ScanOutcome::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScanOutcome::NotFound)
    }
}

/// Scans a mailbox for a service's most recent sign-in email.
#[derive(Debug, Clone)]
pub struct Scanner<C = ImapConnector> {
    connector: C,
    services: ServiceRegistry,
    recipient_policy: RecipientPolicy,
    extractor: CodeExtractor,
}

impl Scanner<ImapConnector> {
    /// Creates a scanner for an IMAP mailbox.
    #[must_use]
    pub fn new(config: ImapConfig) -> Self {
        Self::with_connector(ImapConnector::new(config))
    }

    /// Creates a scanner from `MAILBOX_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] if credentials are not configured.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ImapConfig::from_env()?))
    }
}

impl<C: Connector> Scanner<C> {
    /// Creates a scanner that opens sessions through `connector`.
    #[must_use]
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            services: ServiceRegistry::with_defaults(),
            recipient_policy: RecipientPolicy::default(),
            extractor: CodeExtractor::default(),
        }
    }

    /// Replaces the service profiles.
    #[must_use]
    pub fn services(mut self, services: ServiceRegistry) -> Self {
        self.services = services;
        self
    }

    /// Sets how strictly messages must be associated with the target address.
    #[must_use]
    pub fn recipient_policy(mut self, policy: RecipientPolicy) -> Self {
        self.recipient_policy = policy;
        self
    }

    /// Replaces the code extractor.
    #[must_use]
    pub fn code_extractor(mut self, extractor: CodeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Returns the connector.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs a scan, reporting mailbox failures as [`ScanOutcome::NotFound`].
    ///
    /// # Errors
    ///
    /// Only configuration errors (such as an invalid target address or TLS host name)
    /// are returned. Everything else is logged and collapsed into `NotFound`.
    #[instrument(
        name = "Scanner::scan",
        skip_all,
        fields(service = %query.service, target = %query.target_email)
    )]
    pub async fn scan(&self, query: &ScanQuery) -> Result<ScanOutcome> {
        match self.try_scan(query).await {
            Err(e) if e.is_soft_failure() => {
                warn!(error = %e, category = %e.category(), "Scan failed, reporting not found");
                Ok(ScanOutcome::NotFound)
            }
            other => other,
        }
    }

    /// Runs a scan without collapsing mailbox failures.
    ///
    /// # Errors
    ///
    /// Returns connection, protocol and timeout errors as well as configuration errors.
    pub async fn try_scan(&self, query: &ScanQuery) -> Result<ScanOutcome> {
        if !EmailAddress::is_valid(query.target_email.trim()) {
            return Err(Error::InvalidEmailFormat {
                email: query.target_email.clone(),
            });
        }

        debug!(mailbox = %self.connector.describe(), "Opening mailbox");
        let mut mailbox = self.connector.open().await?;

        let result = self.scan_mailbox(&mut mailbox, query, Utc::now()).await;

        if let Err(e) = mailbox.logout().await {
            warn!(error = %e, "Logout failed");
        }

        result
    }

    /// Scans an already open mailbox as of `now`. The caller owns the session.
    ///
    /// # Errors
    ///
    /// Returns the first search or fetch error. Messages that fail to parse are skipped.
    pub async fn scan_mailbox<M: Mailbox>(
        &self,
        mailbox: &mut M,
        query: &ScanQuery,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome> {
        if query.max_scan == 0 {
            debug!("Scan budget is zero");
            return Ok(ScanOutcome::NotFound);
        }

        let mut uids = mailbox.search_since(query.since_date(now)).await?;
        if uids.is_empty() {
            debug!("No messages in window");
            return Ok(ScanOutcome::NotFound);
        }

        // Most recent first
        uids.sort_unstable_by(|a, b| b.cmp(a));
        uids.dedup();
        uids.truncate(query.max_scan);

        let filter = MessageFilter::new(
            self.services.profile(query.service),
            &query.subject_filter,
            &query.target_email,
            self.recipient_policy,
            query.cutoff(now),
            now,
        );

        debug!(candidates = uids.len(), "Scanning candidates");

        for uid in uids {
            let Some(raw) = mailbox.fetch_raw(uid).await? else {
                debug!(uid, "Message vanished or has no body");
                continue;
            };

            let message = match parser::parse_message(&raw) {
                Ok(message) => message,
                Err(e) => {
                    warn!(uid, error = %e, "Failed to parse email, skipping message");
                    continue;
                }
            };

            match filter.check(&message) {
                Ok(date) => {
                    let found = self.build_found(uid, message, date);
                    info!(uid, codes = found.codes.len(), "Found matching email");
                    return Ok(ScanOutcome::Found(found));
                }
                Err(reason) => debug!(uid, %reason, "Message rejected"),
            }
        }

        Ok(ScanOutcome::NotFound)
    }

    fn build_found(&self, uid: u32, message: ParsedMessage, date: DateTime<Utc>) -> FoundMessage {
        let body = match (message.html, message.text) {
            (Some(html), _) => MessageBody::Html(html),
            (None, Some(text)) => MessageBody::Text(text),
            (None, None) => MessageBody::Text(String::new()),
        };
        let codes = match &body {
            MessageBody::Html(html) => self.extractor.extract_html(html),
            MessageBody::Text(text) => self.extractor.extract(text),
        };

        FoundMessage {
            uid,
            subject: message.subject,
            from: message.from,
            date,
            body,
            codes,
        }
    }
}
