use crate::Result;
use crate::middleware::{Arg, Call, Params};
use crate::response::Reply;
use crate::session::Session;

/// Current prices and the price stream.
#[derive(Debug, Clone, Copy)]
pub struct Pricing<'session> {
    session: &'session Session,
}

impl<'session> Pricing<'session> {
    pub(crate) fn new(session: &'session Session) -> Self {
        Self { session }
    }

    /// Prices of `instruments`.
    ///
    /// With `since`, only prices that changed after that time are returned. It is sent
    /// as the `since` query parameter and is not subject to the `since` → `from`
    /// renaming applied to `params`. `params` takes e.g. `includeHomeConversions`.
    pub async fn pricing<S: Into<Arg>>(
        &self,
        account_id: &str,
        instruments: &[&str],
        since: Option<S>,
        params: Params,
    ) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/pricing"))
            .query(params.with_list("instruments", instruments))
            .literal("since", since)
            .send(self.session)
            .await
    }

    /// At most four prices per second and instrument, starting when the request is made.
    ///
    /// `snapshot` controls whether current prices are sent first. `params` takes the
    /// remaining query parameters, e.g. `includeHomeConversions`. The stream carries
    /// periodic heartbeats, which [`Reply::lines`] filters unless asked not to.
    ///
    /// ```no_run
    /// use futures::StreamExt as _;
    /// use oanda_client_sdk::{Config, Params, Session};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let session = Session::new("my-token", Config::default())?;
    /// let reply = session
    ///     .pricing()
    ///     .stream("101-004-1234567-001", &["EUR_USD", "USD_JPY"], true, Params::new())
    ///     .await?;
    ///
    /// let mut prices = Box::pin(reply.lines(false)?);
    /// while let Some(price) = prices.next().await {
    ///     let price = price?;
    ///     println!("{} {}", price["instrument"], price["closeoutBid"]);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn stream(
        &self,
        account_id: &str,
        instruments: &[&str],
        snapshot: bool,
        params: Params,
    ) -> Result<Reply> {
        let params = params
            .with_list("instruments", instruments)
            .with("snapshot", snapshot);

        Call::get(&format!("/accounts/{account_id}/pricing/stream"))
            .query(params)
            .streaming()
            .send(self.session)
            .await
    }
}
