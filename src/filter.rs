//! Per-message filtering.
//!
//! A candidate passes when, in order:
//! 1. its subject or sender identifies the service,
//! 2. its subject satisfies the [`SubjectFilter`],
//! 3. the target address is a recipient (or, under [`RecipientPolicy::HeadersOrBody`],
//!    appears in the body),
//! 4. its date lies inside the lookback window.

use crate::normalize::{contains_folded, fold};
use crate::parser::ParsedMessage;
use crate::services::ServiceProfile;
use chrono::{DateTime, Utc};

/// Constraint on the subject line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubjectFilter {
    /// No constraint.
    #[default]
    Any,
    /// The subject must contain this substring (case- and accent-insensitive).
    Contains(String),
    /// The subject must contain at least one of these keywords.
    Keywords(Vec<String>),
}

impl SubjectFilter {
    /// Returns `true` if the subject satisfies the filter.
    ///
    /// An empty keyword list accepts every subject.
    #[must_use]
    pub fn accepts(&self, subject: &str) -> bool {
        match self {
            SubjectFilter::Any => true,
            SubjectFilter::Contains(needle) => contains_folded(subject, needle),
            SubjectFilter::Keywords(keywords) => {
                if keywords.is_empty() {
                    return true;
                }
                let subject = fold(subject);
                keywords.iter().any(|k| subject.contains(&fold(k)))
            }
        }
    }
}

/// How strictly a message must be associated with the target address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecipientPolicy {
    /// The address must appear in a recipient header.
    HeadersOnly,
    /// Recipient headers first, then anywhere in the decoded body.
    ///
    /// Shared and aliased inboxes often rewrite recipients, so this is the default.
    #[default]
    HeadersOrBody,
}

/// Why a candidate message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Neither subject nor sender identified the service.
    Service,
    /// The subject filter did not accept the subject.
    Subject,
    /// The target address was not associated with the message.
    Recipient,
    /// The message is older than the lookback window.
    Stale,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Service => write!(f, "service"),
            Rejection::Subject => write!(f, "subject"),
            Rejection::Recipient => write!(f, "recipient"),
            Rejection::Stale => write!(f, "stale"),
        }
    }
}

/// The filters of one scan, bound to its query.
#[derive(Debug, Clone)]
pub struct MessageFilter<'a> {
    profile: ServiceProfile,
    subject_filter: &'a SubjectFilter,
    target_email: String,
    policy: RecipientPolicy,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl<'a> MessageFilter<'a> {
    /// Creates a filter accepting messages dated at or after `cutoff`.
    ///
    /// Messages without a usable date are treated as dated `now`.
    #[must_use]
    pub fn new(
        profile: ServiceProfile,
        subject_filter: &'a SubjectFilter,
        target_email: &str,
        policy: RecipientPolicy,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            profile,
            subject_filter,
            target_email: target_email.trim().to_lowercase(),
            policy,
            cutoff,
            now,
        }
    }

    /// Checks a message, returning its effective date when it passes.
    ///
    /// # Errors
    ///
    /// Returns the first filter that rejected the message.
    pub fn check(&self, message: &ParsedMessage) -> Result<DateTime<Utc>, Rejection> {
        if !self.profile.matches(&message.subject, &message.from) {
            return Err(Rejection::Service);
        }

        if !self.subject_filter.accepts(&message.subject) {
            return Err(Rejection::Subject);
        }

        if !self.is_associated(message) {
            return Err(Rejection::Recipient);
        }

        let date = message.date.unwrap_or(self.now);
        if date < self.cutoff {
            return Err(Rejection::Stale);
        }

        Ok(date)
    }

    fn is_associated(&self, message: &ParsedMessage) -> bool {
        if message.has_recipient(&self.target_email) {
            return true;
        }

        match self.policy {
            RecipientPolicy::HeadersOnly => false,
            RecipientPolicy::HeadersOrBody => contains_folded(&message.body_text(), &self.target_email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Service, ServiceRegistry};
    use chrono::Duration;

    fn message(subject: &str, to: &str, body: &str, date: Option<DateTime<Utc>>) -> ParsedMessage {
        ParsedMessage {
            subject: subject.into(),
            from: "info@account.netflix.com".into(),
            recipients: vec![to.into()],
            date,
            html: None,
            text: Some(body.into()),
        }
    }

    fn filter(subject_filter: &SubjectFilter, policy: RecipientPolicy) -> MessageFilter<'_> {
        let now = Utc::now();
        MessageFilter::new(
            ServiceRegistry::with_defaults().profile(Service::Netflix),
            subject_filter,
            "Client@Example.com",
            policy,
            now - Duration::days(7),
            now,
        )
    }

    #[test]
    fn test_subject_filter_contains_is_folded() {
        let f = SubjectFilter::Contains("codigo de acesso".into());
        assert!(f.accepts("Seu CÓDIGO DE ACESSO Netflix"));
        assert!(!f.accepts("Bem-vindo"));
    }

    #[test]
    fn test_subject_filter_keywords() {
        let f = SubjectFilter::Keywords(vec!["sign-in".into(), "Código".into()]);
        assert!(f.accepts("Netflix: Your sign-in code"));
        assert!(f.accepts("Seu codigo"));
        assert!(!f.accepts("Your monthly receipt"));
        assert!(SubjectFilter::Keywords(vec![]).accepts("anything"));
        assert!(SubjectFilter::Any.accepts(""));
    }

    #[test]
    fn test_accepts_matching_message() {
        let sf = SubjectFilter::Any;
        let msg = message("Netflix: Your sign-in code", "client@example.com", "code 1234", None);
        assert!(filter(&sf, RecipientPolicy::HeadersOrBody).check(&msg).is_ok());
    }

    #[test]
    fn test_rejection_order() {
        let sf = SubjectFilter::Contains("sign-in".into());
        let f = filter(&sf, RecipientPolicy::HeadersOrBody);

        let mut msg = message("Disney+ code", "other@example.com", "", None);
        msg.from = "disney@disneyplus.com".into();
        assert_eq!(f.check(&msg), Err(Rejection::Service));

        let msg = message("Netflix receipt", "other@example.com", "", None);
        assert_eq!(f.check(&msg), Err(Rejection::Subject));

        let msg = message("Netflix sign-in", "other@example.com", "nothing", None);
        assert_eq!(f.check(&msg), Err(Rejection::Recipient));

        let old = Utc::now() - Duration::days(8);
        let msg = message("Netflix sign-in", "client@example.com", "", Some(old));
        assert_eq!(f.check(&msg), Err(Rejection::Stale));
    }

    #[test]
    fn test_body_fallback_respects_policy() {
        let sf = SubjectFilter::Any;
        let msg = message(
            "Netflix: Your sign-in code",
            "store@gmail.com",
            "This code was requested for CLIENT@example.com",
            None,
        );

        assert!(filter(&sf, RecipientPolicy::HeadersOrBody).check(&msg).is_ok());
        assert_eq!(
            filter(&sf, RecipientPolicy::HeadersOnly).check(&msg),
            Err(Rejection::Recipient)
        );
    }

    #[test]
    fn test_missing_date_counts_as_now() {
        let sf = SubjectFilter::Any;
        let now = Utc::now();
        let f = MessageFilter::new(
            ServiceRegistry::with_defaults().profile(Service::Netflix),
            &sf,
            "client@example.com",
            RecipientPolicy::HeadersOnly,
            now,
            now,
        );
        let msg = message("Netflix", "client@example.com", "", None);
        assert_eq!(f.check(&msg), Ok(now));
    }
}
