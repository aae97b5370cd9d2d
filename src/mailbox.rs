//! The seam between the scanner and a mail store.
//!
//! [`Connector`] acquires a [`Mailbox`] session; the scanner drives it through a
//! date-bounded search and per-message fetches, then always calls
//! [`Mailbox::logout`]. The IMAP implementation lives in [`ImapConnector`]; tests and
//! alternative stores (a pooled connector, a local maildir) plug in here.

use crate::error::Result;
use chrono::NaiveDate;

/// An open, read-only mailbox session.
#[allow(async_fn_in_trait)]
pub trait Mailbox {
    /// Returns the UIDs of messages received on or after `since`, in any order.
    async fn search_since(&mut self, since: NaiveDate) -> Result<Vec<u32>>;

    /// Fetches the full RFC 822 content of one message without marking it as read.
    ///
    /// Returns `Ok(None)` if the message no longer exists or has no body.
    async fn fetch_raw(&mut self, uid: u32) -> Result<Option<Vec<u8>>>;

    /// Ends the session.
    async fn logout(&mut self) -> Result<()>;
}

/// Opens mailbox sessions.
#[allow(async_fn_in_trait)]
pub trait Connector {
    /// Session type produced by this connector.
    type Mailbox: Mailbox;

    /// Opens a new session, authenticated and with the target folder selected.
    async fn open(&self) -> Result<Self::Mailbox>;

    /// Short label for logs (typically `host:port/folder`).
    fn describe(&self) -> String;
}

pub use crate::session::{ImapConnector, ImapMailbox};
