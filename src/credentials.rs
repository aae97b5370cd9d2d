//! In-memory store of streaming-service account credentials.
//!
//! Each record is keyed by (platform, email); the email part is compared
//! case-insensitively. Records are created and deleted, never updated.
//!
//! ```
//! use streamcode_scan::credentials::{CredentialRecord, CredentialStore};
//! use streamcode_scan::Service;
//!
//! let mut store = CredentialStore::new();
//! store.insert(CredentialRecord::new(Service::Netflix, "client@example.com", "s3nha")?)?;
//!
//! assert!(store.verify(Service::Netflix, "CLIENT@example.com", "s3nha"));
//! assert!(!store.verify(Service::Disney, "client@example.com", "s3nha"));
//! # Ok::<(), streamcode_scan::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::services::Service;
use chrono::{DateTime, Utc};
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tracing::debug;

/// A stored account.
#[derive(Clone)]
pub struct CredentialRecord {
    /// Streaming platform.
    pub platform: Service,
    email: EmailAddress,
    password: SecretString,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("platform", &self.platform)
            .field("email", &self.email.as_str())
            .field("password", &"[REDACTED]")
            .field("notes", &self.notes)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl CredentialRecord {
    /// Creates a record stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmailFormat`] if `email` is not a valid address.
    pub fn new(platform: Service, email: &str, password: impl Into<String>) -> Result<Self> {
        let email = email
            .trim()
            .parse::<EmailAddress>()
            .map_err(|_| Error::InvalidEmailFormat {
                email: email.to_string(),
            })?;

        Ok(Self {
            platform,
            email,
            password: SecretString::from(password.into()),
            notes: None,
            created_at: Utc::now(),
        })
    }

    /// Attaches notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns the account email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns `true` if `password` matches the stored one.
    #[must_use]
    pub fn password_matches(&self, password: &str) -> bool {
        let stored = self.password.expose_secret().as_bytes();
        let given = password.as_bytes();

        // Compare every byte regardless of where the first difference is
        stored.len() == given.len()
            && stored
                .iter()
                .zip(given)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    fn key(&self) -> (Service, String) {
        key(self.platform, self.email.as_str())
    }
}

fn key(platform: Service, email: &str) -> (Service, String) {
    (platform, email.trim().to_lowercase())
}

/// Credential records keyed by (platform, email).
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    records: HashMap<(Service, String), CredentialRecord>,
}

impl CredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateCredential`] if the (platform, email) pair exists.
    pub fn insert(&mut self, record: CredentialRecord) -> Result<()> {
        let key = record.key();
        if self.records.contains_key(&key) {
            return Err(Error::DuplicateCredential {
                platform: record.platform,
                email: record.email().to_string(),
            });
        }

        debug!(platform = %record.platform, email = %record.email(), "Credential stored");
        self.records.insert(key, record);
        Ok(())
    }

    /// Returns the record for a platform and email.
    #[must_use]
    pub fn get(&self, platform: Service, email: &str) -> Option<&CredentialRecord> {
        self.records.get(&key(platform, email))
    }

    /// Removes a record, returning `true` if it existed.
    pub fn delete(&mut self, platform: Service, email: &str) -> bool {
        self.records.remove(&key(platform, email)).is_some()
    }

    /// Returns `true` if the record exists and the password matches.
    #[must_use]
    pub fn verify(&self, platform: Service, email: &str, password: &str) -> bool {
        self.get(platform, email)
            .is_some_and(|record| record.password_matches(password))
    }

    /// Iterates over records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &CredentialRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by_key(|r| r.created_at);
        records.into_iter()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(platform: Service, email: &str, password: &str) -> CredentialRecord {
        CredentialRecord::new(platform, email, password).unwrap()
    }

    #[test]
    fn test_insert_and_verify() {
        let mut store = CredentialStore::new();
        store
            .insert(record(Service::Netflix, "client@example.com", "senha123"))
            .unwrap();

        assert!(store.verify(Service::Netflix, "client@example.com", "senha123"));
        assert!(!store.verify(Service::Netflix, "client@example.com", "senha124"));
        assert!(!store.verify(Service::Netflix, "client@example.com", "senha12"));
        assert!(!store.verify(Service::Netflix, "unknown@example.com", "senha123"));
    }

    #[test]
    fn test_platform_email_pair_is_unique() {
        let mut store = CredentialStore::new();
        store
            .insert(record(Service::Netflix, "client@example.com", "a"))
            .unwrap();

        let err = store
            .insert(record(Service::Netflix, "Client@Example.com", "b"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCredential { .. }));

        // Same email on another platform is a different account
        store
            .insert(record(Service::Disney, "client@example.com", "c"))
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_delete() {
        let mut store = CredentialStore::new();
        store
            .insert(record(Service::Prime, "client@example.com", "a"))
            .unwrap();

        assert!(store.delete(Service::Prime, "CLIENT@example.com"));
        assert!(!store.delete(Service::Prime, "client@example.com"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let result = CredentialRecord::new(Service::Netflix, "not-an-email", "x");
        assert!(matches!(result, Err(Error::InvalidEmailFormat { .. })));
    }

    #[test]
    fn test_password_not_in_debug() {
        let rec = record(Service::Netflix, "client@example.com", "hunter2").with_notes("vip");
        let debug_str = format!("{rec:?}");
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("vip"));
    }

    #[test]
    fn test_records_iterates_all() {
        let mut store = CredentialStore::new();
        store.insert(record(Service::Netflix, "a@example.com", "x")).unwrap();
        store.insert(record(Service::Disney, "b@example.com", "y")).unwrap();
        assert_eq!(store.records().count(), 2);
    }
}
