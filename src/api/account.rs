use crate::Result;
use crate::middleware::{Arg, Body, Call, Params};
use crate::response::Reply;
use crate::session::Session;

/// Account listing, details, and configuration.
#[derive(Debug, Clone, Copy)]
pub struct Account<'session> {
    session: &'session Session,
}

impl<'session> Account<'session> {
    pub(crate) fn new(session: &'session Session) -> Self {
        Self { session }
    }

    /// All accounts authorized for the session token.
    ///
    /// # Errors
    ///
    /// Fails on transport errors and on any status other than 200/201.
    pub async fn accounts(&self) -> Result<Reply> {
        Call::get("/accounts").send(self.session).await
    }

    /// Full details of one account, including pending orders, open trades, and positions.
    pub async fn details(&self, account_id: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}"))
            .send(self.session)
            .await
    }

    pub async fn summary(&self, account_id: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/summary"))
            .send(self.session)
            .await
    }

    /// Tradeable instruments of an account, optionally restricted to `instruments`.
    pub async fn instruments(&self, account_id: &str, instruments: &[&str]) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/instruments"))
            .query(Params::new().with_list("instruments", instruments))
            .send(self.session)
            .await
    }

    /// Sets the client-configurable parts of an account, such as `alias` or `marginRate`.
    pub async fn configuration(&self, account_id: &str, params: Params) -> Result<Reply> {
        Call::patch(&format!("/accounts/{account_id}/configuration"))
            .body(Body::Params(params))
            .send(self.session)
            .await
    }

    /// Polls the account state and changes since a transaction id.
    pub async fn changes<T: Into<Arg>>(
        &self,
        account_id: &str,
        since_transaction_id: T,
    ) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/changes"))
            .query(Params::new().with("sinceTransactionID", since_transaction_id))
            .send(self.session)
            .await
    }
}
