//! # streamcode-scan
//!
//! Finds the latest sign-in / one-time-code email a streaming service sent to an
//! account, by scanning a shared IMAP mailbox.
//!
//! This crate provides an async API for:
//! - Opening a read-only IMAP session (`EXAMINE` + `BODY.PEEK[]`)
//! - Walking recent messages newest-first within a lookback window and scan budget
//! - Matching them by service, subject and recipient, folding case and accents
//! - Extracting verification codes and rendering the message as an HTML fragment
//! - Checking an account's password before scanning on its behalf
//!
//! ## Quick Start
//!
//! ```no_run
//! use streamcode_scan::{ImapConfig, ScanOutcome, ScanQuery, Scanner, Service};
//!
//! # async fn example() -> streamcode_scan::Result<()> {
//! let config = ImapConfig::builder()
//!     .username("store@gmail.com")
//!     .password("app-password")  // Use app-specific password for Gmail
//!     .build()?;
//!
//! let scanner = Scanner::new(config);
//! let query = ScanQuery::new(Service::Netflix, "client@example.com").lookback_days(1);
//!
//! if let ScanOutcome::Found(found) = scanner.scan(&query).await? {
//!     println!("{}: {:?}", found.subject, found.codes);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Subject Filters
//!
//! ```
//! use streamcode_scan::{ScanQuery, Service, SubjectFilter};
//!
//! let query = ScanQuery::new(Service::Disney, "client@example.com")
//!     .subject_filter(SubjectFilter::Keywords(vec!["código".into(), "code".into()]))
//!     .max_scan(20);
//!
//! assert!(query.subject_filter.accepts("Seu CODIGO de acesso único"));
//! ```
//!
//! ## Error Handling
//!
//! [`Scanner::scan`] only returns configuration errors; an unreachable mailbox is
//! reported the same way as an absent message. Use [`Scanner::try_scan`] to see the
//! underlying failure:
//!
//! ```
//! use streamcode_scan::Error;
//!
//! fn describe(error: &Error) {
//!     if error.is_soft_failure() {
//!         println!("mailbox problem ({}): {}", error.category(), error);
//!     } else {
//!         println!("fix the configuration: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing`. Spans:
//!
//! - `Scanner::scan` - One scan (`service`, `target`)
//! - `CodeLookup::lookup` - Password check plus scan
//! - `ImapConnector::open` - Connect, authenticate, open folder
//! - `session::authenticate`, `session::examine`, `session::search_since`,
//!   `session::fetch`, `session::logout` - Individual IMAP commands
//! - `connection::establish_tls` - TCP + TLS handshake

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod lookup;
pub mod mailbox;
pub mod matcher;
pub mod normalize;
pub mod parser;
pub mod render;
pub mod scanner;
pub mod services;

// Internal modules
mod connection;
mod session;

// Re-exports for ergonomic API
pub use config::{ImapConfig, ImapConfigBuilder, TimeoutConfig};
pub use error::{Error, ErrorCategory, Result};
pub use filter::{RecipientPolicy, SubjectFilter};
pub use mailbox::{Connector, ImapConnector, ImapMailbox, Mailbox};
pub use scanner::{FoundMessage, MessageBody, ScanOutcome, ScanQuery, Scanner};
pub use services::{Service, ServiceProfile, ServiceRegistry};
