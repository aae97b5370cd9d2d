//! Example: Scan the shared mailbox for a service's latest sign-in email.
//!
//! Connection settings come from `MAILBOX_*` variables (a `.env` file works too).
//! Spans for connect, search and fetch are printed with `RUST_LOG=streamcode_scan=debug`.
//!
//! # Usage
//!
//! ```bash
//! export MAILBOX_USERNAME="store@gmail.com"
//! export MAILBOX_PASSWORD="your-app-password"
//! export RUST_LOG=streamcode_scan=debug
//!
//! cargo run --example scan_mailbox -- netflix client@example.com 2
//! ```

use std::env;
use streamcode_scan::render::render_fragment;
use streamcode_scan::{ScanOutcome, ScanQuery, Scanner, Service};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> streamcode_scan::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streamcode_scan=info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .init();

    let mut args = env::args().skip(1);
    let service: Service = args.next().as_deref().unwrap_or("netflix").parse()?;
    let target = args
        .next()
        .expect("usage: scan_mailbox <service> <target-email> [lookback-days]");
    let lookback_days = args.next().and_then(|d| d.parse().ok()).unwrap_or(7);

    let scanner = Scanner::from_env()?;
    let query = ScanQuery::new(service, &target).lookback_days(lookback_days);

    tracing::info!(%service, %target, lookback_days, "Scanning mailbox");

    // try_scan so that connection problems are shown instead of "not found"
    match scanner.try_scan(&query).await {
        Ok(ScanOutcome::Found(found)) => {
            println!("Subject: {}", found.subject);
            println!("From:    {}", found.from);
            println!("Date:    {}", found.date);
            println!("Codes:   {:?}", found.codes);
            println!();
            println!("{}", render_fragment(&found));
        }
        Ok(ScanOutcome::NotFound) => {
            println!("No {service} email for {target} in the last {lookback_days} days");
        }
        Err(e) if e.is_soft_failure() => {
            eprintln!("Mailbox unavailable ({}): {e}", e.category());
        }
        Err(e) => return Err(e),
    }

    Ok(())
}
