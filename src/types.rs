//! Re-exported types from external crates for convenience.
//!
//! These types show up in call arguments and typed models, and are re-exported
//! here so users don't need to add these dependencies to their `Cargo.toml`.

/// Date and time types, e.g. for `from`/`to` arguments and `Accept-Datetime-Format: RFC3339` models.
pub use chrono::{DateTime, Utc};
/// Arbitrary precision decimal type for prices and units.
pub use rust_decimal::Decimal;
/// Macro for creating [`Decimal`] literals at compile time.
///
/// # Example
/// ```
/// use oanda_client_sdk::types::dec;
/// let price = dec!(1.08215);
/// ```
pub use rust_decimal_macros::dec;
/// Fully resolved endpoint URLs, see [`Session::resolve`](crate::Session::resolve).
pub use url::Url;
