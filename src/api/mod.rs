//! Endpoint groups of the v20 REST and streaming API.
//!
//! Each group is a view borrowing a [`Session`](crate::Session) and is obtained from
//! it, e.g. [`Session::order`](crate::Session::order). Every operation goes through
//! the same middleware: numeric arguments are sent as decimal text, `since`/`until`
//! keyword parameters become `from`/`to`, statuses other than 200 and 201 fail with a
//! [`Kind::Status`](crate::error::Kind::Status) error, and the session's unpack policy
//! decides between a materialized body and the envelope.
//!
//! Identifiers are taken as given. Order and trade specifiers may be an OANDA id or a
//! client id prefixed with `@`.

pub mod account;
pub mod instrument;
pub mod order;
pub mod position;
pub mod pricing;
pub mod trade;
pub mod transaction;

pub use account::Account;
pub use instrument::Instrument;
pub use order::Order;
pub use position::Position;
pub use pricing::Pricing;
pub use trade::Trade;
pub use transaction::Transaction;
