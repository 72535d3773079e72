//! Account endpoints walkthrough: lists accounts, then summary, open trades, and
//! the last transactions of the first one.
//!
//! Run with tracing enabled:
//! ```sh
//! OANDA_TOKEN=... RUST_LOG=info,hyper_util=off,hyper=off,reqwest=off,h2=off,rustls=off cargo run --example account --features tracing
//! ```
//!
//! Optionally log to a file:
//! ```sh
//! LOG_FILE=account.log OANDA_TOKEN=... RUST_LOG=info cargo run --example account --features tracing
//! ```

use std::fs::File;

use oanda_client_sdk::Session;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = File::create(path)?;
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let mut session = Session::from_env()?;
    session.set_unpack(true);

    let accounts = session.account().accounts().await?.json().await?;
    let Some(account_id) = accounts
        .path("accounts.0.id")
        .and_then(|id| id.as_str())
        .map(ToOwned::to_owned)
    else {
        info!(endpoint = "accounts", "token has no accounts");
        return Ok(());
    };
    info!(endpoint = "accounts", count = accounts["accounts"].as_list().map_or(0, <[_]>::len));

    let mut last_id = None;
    match session.account().summary(&account_id).await {
        Ok(reply) => {
            let summary = reply.json().await?;
            info!(
                endpoint = "summary",
                balance = %summary["account"]["balance"],
                nav = %summary["account"]["NAV"],
                open_trades = %summary["account"]["openTradeCount"]
            );
            last_id = summary["lastTransactionID"]
                .as_str()
                .and_then(|id| id.parse::<u64>().ok());
        }
        Err(e) => debug!(endpoint = "summary", error = %e),
    }

    match session.trade().open_trades(&account_id).await {
        Ok(reply) => {
            let trades = reply.json().await?;
            for trade in trades["trades"].as_list().unwrap_or_default() {
                info!(
                    endpoint = "open_trades",
                    id = %trade["id"],
                    instrument = %trade["instrument"],
                    units = %trade["currentUnits"],
                    unrealized_pl = %trade["unrealizedPL"]
                );
            }
        }
        Err(e) => debug!(endpoint = "open_trades", error = %e),
    }

    if let Some(last_id) = last_id {
        let from = last_id.saturating_sub(10).max(1);
        match session
            .transaction()
            .id_range(&account_id, from, last_id, &[])
            .await
        {
            Ok(reply) => {
                let transactions = reply.json().await?;
                for transaction in transactions["transactions"].as_list().unwrap_or_default() {
                    info!(
                        endpoint = "id_range",
                        id = %transaction["id"],
                        kind = %transaction["type"]
                    );
                }
            }
            Err(e) => debug!(endpoint = "id_range", error = %e),
        }
    }

    Ok(())
}
