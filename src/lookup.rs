//! The customer-facing flow: check the account password, then look for its code.
//!
//! ```no_run
//! use streamcode_scan::credentials::{CredentialRecord, CredentialStore};
//! use streamcode_scan::lookup::{CodeLookup, LookupOutcome, LookupRequest};
//! use streamcode_scan::{Scanner, Service};
//!
//! # async fn example() -> streamcode_scan::Result<()> {
//! let mut store = CredentialStore::new();
//! store.insert(CredentialRecord::new(Service::Netflix, "client@example.com", "senha123")?)?;
//!
//! let lookup = CodeLookup::new(store, Scanner::from_env()?);
//! let request = LookupRequest::new(Service::Netflix, "client@example.com", "senha123");
//!
//! if let LookupOutcome::Found(html) = lookup.lookup(&request).await? {
//!     println!("{html}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::filter::SubjectFilter;
use crate::mailbox::{Connector, ImapConnector};
use crate::render::render_fragment;
use crate::scanner::{ScanOutcome, ScanQuery, Scanner, DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_SCAN};
use crate::services::Service;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

/// A submitted lookup form.
pub struct LookupRequest {
    /// Service selected by the user.
    pub service: Service,
    /// Account email.
    pub email: String,
    password: SecretString,
}

impl LookupRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(service: Service, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            service,
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl std::fmt::Debug for LookupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupRequest")
            .field("service", &self.service)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Result of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Rendered HTML fragment of the matching email.
    Found(String),
    /// The password checked out but no matching email was found.
    NotFound,
    /// Unknown account or wrong password. The mailbox was not touched.
    IncorrectPassword,
}

/// Verifies credentials and runs scans on behalf of account holders.
#[derive(Debug)]
pub struct CodeLookup<C = ImapConnector> {
    store: CredentialStore,
    scanner: Scanner<C>,
    lookback_days: u32,
    max_scan: usize,
    subject_filter: SubjectFilter,
}

impl<C: Connector> CodeLookup<C> {
    /// Creates a lookup with the default scan window and budget.
    #[must_use]
    pub fn new(store: CredentialStore, scanner: Scanner<C>) -> Self {
        Self {
            store,
            scanner,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            max_scan: DEFAULT_MAX_SCAN,
            subject_filter: SubjectFilter::Any,
        }
    }

    /// Sets the lookback window used for every scan.
    #[must_use]
    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Sets the scan budget used for every scan.
    #[must_use]
    pub fn max_scan(mut self, max_scan: usize) -> Self {
        self.max_scan = max_scan;
        self
    }

    /// Sets the subject constraint used for every scan.
    #[must_use]
    pub fn subject_filter(mut self, filter: SubjectFilter) -> Self {
        self.subject_filter = filter;
        self
    }

    /// Returns the credential store.
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns the credential store for adding or removing accounts.
    pub fn store_mut(&mut self) -> &mut CredentialStore {
        &mut self.store
    }

    /// Verifies the request and, if it checks out, scans for the account's latest email.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from [`Scanner::scan`].
    #[instrument(
        name = "CodeLookup::lookup",
        skip_all,
        fields(service = %request.service, email = %request.email)
    )]
    pub async fn lookup(&self, request: &LookupRequest) -> Result<LookupOutcome> {
        if !self.store.verify(
            request.service,
            &request.email,
            request.password.expose_secret(),
        ) {
            info!("Rejected lookup: incorrect password");
            return Ok(LookupOutcome::IncorrectPassword);
        }

        let query = ScanQuery::new(request.service, request.email.trim())
            .lookback_days(self.lookback_days)
            .max_scan(self.max_scan)
            .subject_filter(self.subject_filter.clone());

        Ok(match self.scanner.scan(&query).await? {
            ScanOutcome::Found(found) => LookupOutcome::Found(render_fragment(&found)),
            ScanOutcome::NotFound => LookupOutcome::NotFound,
        })
    }
}
