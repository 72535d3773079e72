use crate::Result;
use crate::middleware::{Arg, Body, Call, Params};
use crate::response::Reply;
use crate::session::Session;

/// Open and closed trades, and the orders depending on them.
#[derive(Debug, Clone, Copy)]
pub struct Trade<'session> {
    session: &'session Session,
}

impl<'session> Trade<'session> {
    pub(crate) fn new(session: &'session Session) -> Self {
        Self { session }
    }

    /// Trades of an account, filtered by `ids` and parameters such as `state`,
    /// `instrument`, `count`, and `beforeID`.
    pub async fn trades(&self, account_id: &str, ids: &[&str], params: Params) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/trades"))
            .query(params.with_list("ids", ids))
            .send(self.session)
            .await
    }

    pub async fn open_trades(&self, account_id: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/openTrades"))
            .send(self.session)
            .await
    }

    pub async fn details(&self, account_id: &str, trade_specifier: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/trades/{trade_specifier}"))
            .send(self.session)
            .await
    }

    /// Closes `units` of a trade, or all of it when `units` is `None`.
    ///
    /// Units must be positive and cannot exceed the open units of the trade.
    pub async fn close<U: Into<Arg>>(
        &self,
        account_id: &str,
        trade_specifier: &str,
        units: Option<U>,
    ) -> Result<Reply> {
        let units = units.map_or_else(|| Arg::from("ALL"), Into::into);

        Call::put(&format!(
            "/accounts/{account_id}/trades/{trade_specifier}/close"
        ))
        .body(Body::Params(Params::new().with("units", units)))
        .send(self.session)
        .await
    }

    /// Updates the `id`, `tag`, and `comment` client extensions of a trade.
    pub async fn extensions(
        &self,
        account_id: &str,
        trade_specifier: &str,
        params: Params,
    ) -> Result<Reply> {
        Call::put(&format!(
            "/accounts/{account_id}/trades/{trade_specifier}/clientExtensions"
        ))
        .body(Body::Nested("clientExtensions", params))
        .send(self.session)
        .await
    }

    /// Creates, replaces, or cancels `takeProfit`, `stopLoss`, and `trailingStopLoss`.
    ///
    /// A key set to JSON `null` cancels that order, a missing key leaves it untouched.
    pub async fn orders(
        &self,
        account_id: &str,
        trade_specifier: &str,
        params: Params,
    ) -> Result<Reply> {
        Call::put(&format!(
            "/accounts/{account_id}/trades/{trade_specifier}/orders"
        ))
        .body(Body::Params(params))
        .send(self.session)
        .await
    }
}
