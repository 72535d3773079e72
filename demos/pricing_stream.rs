//! Streams prices for the given instruments until interrupted.
//!
//! Run with tracing enabled:
//! ```sh
//! OANDA_TOKEN=... RUST_LOG=info,hyper_util=off,hyper=off,reqwest=off,h2=off,rustls=off cargo run --example pricing_stream --features tracing -- <account-id> EUR_USD USD_JPY
//! ```
//!
//! Set `HEARTBEATS=1` to log heartbeats as well.

use futures::StreamExt as _;
use oanda_client_sdk::{Params, Session};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let account_id = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: pricing_stream <account-id> [instrument...]"))?;
    let mut instruments: Vec<String> = args.collect();
    if instruments.is_empty() {
        instruments.push("EUR_USD".to_owned());
    }
    let instruments: Vec<&str> = instruments.iter().map(String::as_str).collect();
    let heartbeats = std::env::var("HEARTBEATS").is_ok();

    let session = Session::from_env()?;
    let reply = session
        .pricing()
        .stream(&account_id, &instruments, true, Params::new())
        .await?;

    let mut lines = Box::pin(reply.lines(heartbeats)?);
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) if line["type"].as_str() == Some("HEARTBEAT") => {
                info!(kind = "heartbeat", time = %line["time"]);
            }
            Ok(price) => info!(
                kind = "price",
                instrument = %price["instrument"],
                bid = %price["closeoutBid"],
                ask = %price["closeoutAsk"],
                time = %price["time"]
            ),
            Err(e) => {
                warn!(error = %e, "stream ended");
                break;
            }
        }
    }

    Ok(())
}
