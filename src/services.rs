//! Streaming services and the heuristics used to recognise their emails.
//!
//! Each [`Service`] has a [`ServiceProfile`] made of subject hints and sender hints.
//! A message belongs to a service when its subject contains a subject hint or its
//! sender address contains a sender hint. Both comparisons are folded (see
//! [`crate::normalize`]).
//!
//! # Example
//!
//! ```
//! use streamcode_scan::services::{Service, ServiceProfile, ServiceRegistry};
//!
//! let mut registry = ServiceRegistry::with_defaults();
//! assert!(registry.profile(Service::Netflix).matches("Netflix: Your sign-in code", ""));
//!
//! // Override the built-in hints for one service
//! registry.register(Service::Prime, ServiceProfile::new(["Prime Vídeo"], ["primevideo.com"]));
//! assert!(registry.profile(Service::Prime).matches("Seu código do Prime Video", ""));
//! ```

use crate::error::Error;
use crate::normalize::{contains_folded, fold};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

/// A supported streaming service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    /// Disney+.
    Disney,
    /// Netflix.
    Netflix,
    /// Amazon Prime Video.
    Prime,
}

impl Service {
    /// All supported services.
    pub const ALL: [Service; 3] = [Service::Disney, Service::Netflix, Service::Prime];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Disney => "disney",
            Service::Netflix => "netflix",
            Service::Prime => "prime",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s.trim()).as_str() {
            "disney" | "disney+" | "disneyplus" | "disney plus" => Ok(Service::Disney),
            "netflix" => Ok(Service::Netflix),
            "prime" | "prime video" | "primevideo" | "amazon" => Ok(Service::Prime),
            _ => Err(Error::UnknownService {
                name: s.to_string(),
            }),
        }
    }
}

/// Subject and sender hints that identify a service's emails.
///
/// Hints are folded on construction, so they may be written with any case or accents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProfile {
    subject_hints: Vec<String>,
    sender_hints: Vec<String>,
}

impl ServiceProfile {
    /// Creates a profile from subject hints and sender-address hints.
    #[must_use]
    pub fn new<S, D>(subject_hints: S, sender_hints: D) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            subject_hints: subject_hints.into_iter().map(|h| fold(h.as_ref())).collect(),
            sender_hints: sender_hints.into_iter().map(|h| fold(h.as_ref())).collect(),
        }
    }

    /// Returns `true` if the subject or sender identifies this service.
    #[must_use]
    pub fn matches(&self, subject: &str, sender: &str) -> bool {
        self.matches_subject(subject) || self.matches_sender(sender)
    }

    /// Returns `true` if the subject contains one of the subject hints.
    #[must_use]
    pub fn matches_subject(&self, subject: &str) -> bool {
        self.subject_hints
            .iter()
            .any(|hint| contains_folded(subject, hint))
    }

    /// Returns `true` if the sender address contains one of the sender hints.
    #[must_use]
    pub fn matches_sender(&self, sender: &str) -> bool {
        !sender.is_empty()
            && self
                .sender_hints
                .iter()
                .any(|hint| contains_folded(sender, hint))
    }

    /// Folded subject hints.
    #[must_use]
    pub fn subject_hints(&self) -> &[String] {
        &self.subject_hints
    }

    /// Folded sender hints.
    #[must_use]
    pub fn sender_hints(&self) -> &[String] {
        &self.sender_hints
    }
}

/// Built-in profiles.
static DEFAULT_PROFILES: LazyLock<HashMap<Service, ServiceProfile>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(
        Service::Netflix,
        ServiceProfile::new(["netflix"], ["netflix.com", "netflix"]),
    );
    m.insert(
        Service::Disney,
        ServiceProfile::new(
            ["disney+", "disney plus", "disney"],
            ["disneyplus.com", "disney.com", "bamgrid.com"],
        ),
    );
    m.insert(
        Service::Prime,
        ServiceProfile::new(["prime video", "amazon"], ["amazon.", "primevideo.com"]),
    );

    m
});

/// A customizable table of service profiles.
///
/// Resolution order for [`profile`](Self::profile):
/// 1. Custom profiles (added via [`register`](Self::register))
/// 2. Built-in defaults (if [`with_defaults`](Self::with_defaults) was used)
/// 3. A minimal profile using the service name as its only hint
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    custom: HashMap<Service, ServiceProfile>,
    use_defaults: bool,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ServiceRegistry {
    /// Creates a registry without built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            use_defaults: false,
        }
    }

    /// Creates a registry that includes the built-in profiles.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            custom: HashMap::new(),
            use_defaults: true,
        }
    }

    /// Registers a profile, overriding any existing one for the service.
    pub fn register(&mut self, service: Service, profile: ServiceProfile) {
        self.custom.insert(service, profile);
    }

    /// Removes a custom profile. Built-in defaults are unaffected.
    pub fn unregister(&mut self, service: Service) -> Option<ServiceProfile> {
        self.custom.remove(&service)
    }

    /// Returns the profile for a service.
    #[must_use]
    pub fn profile(&self, service: Service) -> ServiceProfile {
        if let Some(profile) = self.custom.get(&service) {
            return profile.clone();
        }

        if self.use_defaults {
            if let Some(profile) = DEFAULT_PROFILES.get(&service) {
                return profile.clone();
            }
        }

        ServiceProfile::new([service.as_str()], [service.as_str()])
    }
}
