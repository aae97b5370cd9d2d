//! Example: The customer-facing lookup flow.
//!
//! Registers an account, then answers lookups the way a support page would:
//! a wrong password never touches the mailbox, a right one returns the rendered email.
//!
//! # Usage
//!
//! ```bash
//! export MAILBOX_USERNAME="store@gmail.com"
//! export MAILBOX_PASSWORD="your-app-password"
//!
//! cargo run --example lookup_code -- disney client@example.com senha123
//! ```

use std::env;
use streamcode_scan::credentials::{CredentialRecord, CredentialStore};
use streamcode_scan::lookup::{CodeLookup, LookupOutcome, LookupRequest};
use streamcode_scan::{Scanner, Service, SubjectFilter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> streamcode_scan::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streamcode_scan=info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [service, email, password] = args.as_slice() else {
        eprintln!("usage: lookup_code <service> <email> <password>");
        std::process::exit(2);
    };
    let service: Service = service.parse()?;

    // Normally loaded from the account database
    let mut store = CredentialStore::new();
    store.insert(
        CredentialRecord::new(service, email, password.as_str())?.with_notes("demo account"),
    )?;

    let lookup = CodeLookup::new(store, Scanner::from_env()?)
        .lookback_days(1)
        .max_scan(30)
        .subject_filter(SubjectFilter::Keywords(vec![
            "code".into(),
            "código".into(),
            "sign-in".into(),
            "acesso".into(),
        ]));

    println!("Lookup with a wrong password:");
    let wrong = LookupRequest::new(service, email.as_str(), "not-the-password");
    println!("  {:?}", lookup.lookup(&wrong).await?);

    println!("Lookup with the right password:");
    let request = LookupRequest::new(service, email.as_str(), password.as_str());
    match lookup.lookup(&request).await? {
        LookupOutcome::Found(html) => println!("{html}"),
        LookupOutcome::NotFound => println!("  No recent email for this account"),
        LookupOutcome::IncorrectPassword => println!("  Incorrect password"),
    }

    Ok(())
}
