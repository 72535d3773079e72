use std::fmt::Display;

use crate::Result;
use crate::middleware::{Arg, Call, Params};
use crate::response::Reply;
use crate::session::Session;

/// Transaction history and the transaction stream.
#[derive(Debug, Clone, Copy)]
pub struct Transaction<'session> {
    session: &'session Session,
}

impl<'session> Transaction<'session> {
    pub(crate) fn new(session: &'session Session) -> Self {
        Self { session }
    }

    /// Pages of transactions matching a time-based query.
    ///
    /// `types` filters by transaction type; `params` takes `since`/`from`,
    /// `until`/`to`, and `pageSize`.
    pub async fn transactions(
        &self,
        account_id: &str,
        types: &[&str],
        params: Params,
    ) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/transactions"))
            .query(params.with_list("type", types))
            .send(self.session)
            .await
    }

    pub async fn details<T: Display>(&self, account_id: &str, transaction_id: T) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/transactions/{transaction_id}"))
            .send(self.session)
            .await
    }

    /// Transactions with ids in `from..=to`, optionally filtered by `types`.
    pub async fn id_range<F: Into<Arg>, T: Into<Arg>>(
        &self,
        account_id: &str,
        from: F,
        to: T,
        types: &[&str],
    ) -> Result<Reply> {
        let params = Params::new()
            .with("from", from)
            .with("to", to)
            .with_list("type", types);

        Call::get(&format!("/accounts/{account_id}/transactions/idrange"))
            .query(params)
            .send(self.session)
            .await
    }

    /// Transactions after, and not including, `transaction_id`.
    pub async fn since_id<T: Into<Arg>>(
        &self,
        account_id: &str,
        transaction_id: T,
    ) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/transactions/sinceid"))
            .query(Params::new().with("id", transaction_id))
            .send(self.session)
            .await
    }

    /// Transactions as they happen, starting when the request is made.
    ///
    /// Always returns an envelope; decode it with [`Reply::lines`].
    pub async fn stream(&self, account_id: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/transactions/stream"))
            .streaming()
            .send(self.session)
            .await
    }
}
