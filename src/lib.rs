#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod api;
pub mod error;
pub mod middleware;
pub mod response;
pub(crate) mod serde_helpers;
pub mod session;
pub mod types;
pub mod value;

use crate::error::Error;

pub use crate::middleware::{Arg, Body, Params};
pub use crate::response::{ApiResponse, Reply};
pub use crate::session::{Config, Environment, Session, TimeFormat};
pub use crate::value::{AttrMap, Value};

pub type Result<T> = std::result::Result<T, Error>;

/// Production REST host of the trade environment
pub const TRADE_HOST: &str = "https://api-fxtrade.oanda.com";

/// REST host of the practice (demo) environment
pub const PRACTICE_HOST: &str = "https://api-fxpractice.oanda.com";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_should_resolve_to_known_hosts() {
        let practice = Session::new("token", Config::default()).expect("valid session");
        assert!(practice.resolve("/accounts").unwrap().as_str().starts_with(PRACTICE_HOST));

        let trade = Session::new(
            "token",
            Config::builder().environment(Environment::Trade).build(),
        )
        .expect("valid session");
        assert!(trade.resolve("/accounts").unwrap().as_str().starts_with(TRADE_HOST));
    }
}
