//! Integration tests for streamcode-scan.
//!
//! The tests that talk to a real IMAP server are disabled by default.
//! To run them:
//!
//! ```bash
//! # Mailbox that receives the streaming-service emails
//! export MAILBOX_USERNAME="store@gmail.com"
//! export MAILBOX_PASSWORD="your-app-password"
//!
//! # Optional: host is derived from the username domain when unset
//! export MAILBOX_HOST="imap.gmail.com"
//!
//! # Account whose codes to look for
//! export MAILBOX_TEST_TARGET="client@example.com"
//!
//! cargo test --features integration-tests -- --ignored
//! ```

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use streamcode_scan::config::env_vars;
use streamcode_scan::render::render_fragment;
use streamcode_scan::{
    Connector, Error, ErrorCategory, ImapConfig, ImapConnector, Mailbox, ScanOutcome, ScanQuery,
    Scanner, Service,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn get_test_config() -> Option<ImapConfig> {
    dotenvy::dotenv().ok();
    ImapConfig::from_env().ok()
}

fn get_test_target() -> String {
    env::var("MAILBOX_TEST_TARGET").unwrap_or_else(|_| "client@example.com".to_string())
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_open_and_logout() {
    let config = get_test_config().expect("Test config from environment variables");
    let connector = ImapConnector::new(config);

    let mut mailbox = connector.open().await.expect("Failed to open mailbox");
    mailbox.logout().await.expect("Failed to logout");
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_search_is_date_bounded() {
    let config = get_test_config().expect("Test config from environment variables");
    let connector = ImapConnector::new(config);
    let mut mailbox = connector.open().await.expect("Failed to open mailbox");

    let today = chrono::Utc::now().date_naive();
    let week = mailbox
        .search_since(today - chrono::Duration::days(7))
        .await
        .expect("Search failed");
    let tomorrow = mailbox
        .search_since(today + chrono::Duration::days(1))
        .await
        .expect("Search failed");

    assert!(tomorrow.len() <= week.len());

    mailbox.logout().await.expect("Failed to logout");
}

// ─────────────────────────────────────────────────────────────────────────────
// Scan Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_scan_each_service() {
    let config = get_test_config().expect("Test config from environment variables");
    let scanner = Scanner::new(config);
    let target = get_test_target();

    for service in Service::ALL {
        let query = ScanQuery::new(service, &target).lookback_days(7);

        // Result depends on what the mailbox holds
        match scanner.try_scan(&query).await.expect("Scan failed") {
            ScanOutcome::Found(found) => {
                println!("{service}: {} {:?}", found.subject, found.codes);
                assert!(found.codes.len() <= 3);
                assert!(render_fragment(&found).starts_with("<div class=\"mail-result\">"));
            }
            ScanOutcome::NotFound => println!("{service}: no email in the last 7 days"),
        }
    }
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_scan_unknown_target_not_found() {
    let config = get_test_config().expect("Test config from environment variables");
    let scanner = Scanner::new(config);

    let query = ScanQuery::new(Service::Netflix, "nobody-1f3a9c@nonexistent.invalid");
    let outcome = scanner.scan(&query).await.expect("Scan failed");

    assert!(outcome.is_not_found());
}

#[tokio::test]
#[ignore = "requires intentionally wrong credentials"]
async fn test_invalid_credentials() {
    let config = ImapConfig::builder()
        .username("test@gmail.com")
        .password("wrong-password")
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("valid config structure");

    let scanner = Scanner::new(config);
    let query = ScanQuery::new(Service::Netflix, "client@example.com");

    // Collapsed into NotFound by scan, visible through try_scan
    assert!(scanner.scan(&query).await.unwrap().is_not_found());

    let err = scanner.try_scan(&query).await.unwrap_err();
    println!("Connection error: {err}");
    println!("Category: {}", err.category());
    assert!(err.is_soft_failure());
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_required_fields() {
    // Missing username
    let err = ImapConfig::builder().password("password").build().unwrap_err();
    assert!(matches!(err, Error::MissingConfig { field: "username" }));

    // Missing password
    let err = ImapConfig::builder()
        .username("store@gmail.com")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::MissingConfig { field: "password" }));

    // Blank password
    let err = ImapConfig::builder()
        .username("store@gmail.com")
        .password("   ")
        .build()
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn test_from_vars() {
    let env = vars(&[
        (env_vars::USERNAME, "store@outlook.com"),
        (env_vars::PASSWORD, "secret"),
        (env_vars::FOLDER, "Streaming"),
    ]);
    let config = ImapConfig::from_vars(|k| env.get(k).cloned()).unwrap();

    assert_eq!(config.username(), "store@outlook.com");
    assert_eq!(config.host, "imap-mail.outlook.com");
    assert_eq!(config.port, 993);
    assert_eq!(config.folder, "Streaming");
}

#[test]
fn test_from_vars_rejects_bad_port() {
    let env = vars(&[
        (env_vars::USERNAME, "store@gmail.com"),
        (env_vars::PASSWORD, "secret"),
        (env_vars::PORT, "imaps"),
    ]);
    let err = ImapConfig::from_vars(|k| env.get(k).cloned()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn test_from_vars_missing_credentials() {
    let err = ImapConfig::from_vars(|_| None).unwrap_err();
    assert!(matches!(err, Error::MissingConfig { .. }));
    assert!(!err.is_soft_failure());
}

#[tokio::test]
async fn test_refused_connection_collapses_to_not_found() {
    let config = ImapConfig::builder()
        .username("store")
        .password("secret")
        .host("127.0.0.1")
        .port(1)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let scanner = Scanner::new(config);
    let query = ScanQuery::new(Service::Prime, "client@example.com");

    assert!(scanner.scan(&query).await.unwrap().is_not_found());
}
