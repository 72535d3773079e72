use crate::Result;
use crate::middleware::{Body, Call, Params};
use crate::response::Reply;
use crate::session::Session;

/// Order creation, listing, replacement, and cancellation.
///
/// Order request fields (`type`, `instrument`, `units`, `price`, ...) are passed as
/// [`Params`] and sent nested under `"order"`. Numeric fields such as `units` go out
/// as decimal text.
#[derive(Debug, Clone, Copy)]
pub struct Order<'session> {
    session: &'session Session,
}

impl<'session> Order<'session> {
    pub(crate) fn new(session: &'session Session) -> Self {
        Self { session }
    }

    /// Creates an order.
    ///
    /// ```no_run
    /// use oanda_client_sdk::{Config, Params, Session};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let session = Session::new("my-token", Config::default())?;
    /// let order = Params::new()
    ///     .with("type", "MARKET")
    ///     .with("instrument", "EUR_USD")
    ///     .with("units", 100);
    ///
    /// let created = session.order().create("101-004-1234567-001", order).await?.json().await?;
    /// println!("{}", created["orderCreateTransaction"]["id"]);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Fails on transport errors and on any status other than 200/201, e.g. a 400 for
    /// a rejected order.
    pub async fn create(&self, account_id: &str, order: Params) -> Result<Reply> {
        Call::post(&format!("/accounts/{account_id}/orders"))
            .body(Body::Nested("order", order))
            .send(self.session)
            .await
    }

    /// Orders of an account, filtered by `ids` and parameters such as `state`,
    /// `instrument`, `count`, and `beforeID`.
    pub async fn orders(&self, account_id: &str, ids: &[&str], params: Params) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/orders"))
            .query(params.with_list("ids", ids))
            .send(self.session)
            .await
    }

    pub async fn pending_orders(&self, account_id: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/pendingOrders"))
            .send(self.session)
            .await
    }

    pub async fn details(&self, account_id: &str, order_specifier: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/orders/{order_specifier}"))
            .send(self.session)
            .await
    }

    /// Cancels an order and creates `order` in its place.
    pub async fn replace(
        &self,
        account_id: &str,
        order_specifier: &str,
        order: Params,
    ) -> Result<Reply> {
        Call::put(&format!("/accounts/{account_id}/orders/{order_specifier}"))
            .body(Body::Nested("order", order))
            .send(self.session)
            .await
    }

    pub async fn cancel(&self, account_id: &str, order_specifier: &str) -> Result<Reply> {
        Call::put(&format!(
            "/accounts/{account_id}/orders/{order_specifier}/cancel"
        ))
        .send(self.session)
        .await
    }

    /// Updates `clientExtensions` and/or `tradeClientExtensions` of an order.
    ///
    /// Do not touch client extensions of accounts associated with MT4.
    pub async fn extensions(
        &self,
        account_id: &str,
        order_specifier: &str,
        params: Params,
    ) -> Result<Reply> {
        Call::put(&format!(
            "/accounts/{account_id}/orders/{order_specifier}/clientExtensions"
        ))
        .body(Body::Params(params))
        .send(self.session)
        .await
    }
}
