#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests, and https://github.com/rust-lang/rust-clippy/issues/13981"
)]
#![allow(
    unused,
    reason = "Deeply nested uses in sub-modules are falsely flagged as being unused"
)]

use httpmock::MockServer;
use oanda_client_sdk::{Config, Session, TimeFormat};

pub const TOKEN: &str = "00000000000000000000000000000000-ffffffffffffffffffffffffffffffff";
pub const ACCOUNT_ID: &str = "101-004-1234567-001";
pub const AUTHORIZATION: &str =
    "Bearer 00000000000000000000000000000000-ffffffffffffffffffffffffffffffff";

/// A session whose REST and streaming hosts both point at `server`.
#[must_use]
pub fn session(server: &MockServer) -> Session {
    session_with(server, false)
}

#[must_use]
pub fn unpacking_session(server: &MockServer) -> Session {
    session_with(server, true)
}

fn session_with(server: &MockServer, unpack: bool) -> Session {
    let config = Config::builder()
        .hostname(server.base_url())
        .time_format(TimeFormat::Rfc3339)
        .unpack(unpack)
        .build();

    Session::new(TOKEN, config).unwrap()
}

/// Newline-delimited body with one document per element.
#[must_use]
pub fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}
