use crate::Result;
use crate::middleware::{Arg, Call, Params};
use crate::response::Reply;
use crate::session::Session;

/// Candlesticks and order/position books of an instrument.
#[derive(Debug, Clone, Copy)]
pub struct Instrument<'session> {
    session: &'session Session,
}

impl<'session> Instrument<'session> {
    pub(crate) fn new(session: &'session Session) -> Self {
        Self { session }
    }

    /// Candlestick data for `instrument`.
    ///
    /// Common parameters are `price`, `granularity`, `count`, `since`/`from`,
    /// `until`/`to`, `smooth`, `includeFirst`, `dailyAlignment`, `alignmentTimezone`
    /// and `weeklyAlignment`.
    ///
    /// ```no_run
    /// use oanda_client_sdk::{Config, Params, Session};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let session = Session::new("my-token", Config::default())?;
    /// let params = Params::new().with("granularity", "H1").with("count", 24);
    ///
    /// let candles = session.instrument().candles("EUR_USD", params).await?.json().await?;
    /// println!("{}", candles.path("candles.0.mid.c").map(ToString::to_string).unwrap_or_default());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn candles(&self, instrument: &str, params: Params) -> Result<Reply> {
        Call::get(&format!("/instruments/{instrument}/candles"))
            .query(params)
            .send(self.session)
            .await
    }

    /// Order book snapshot at `time`, or the most recent one.
    pub async fn order_book<T: Into<Arg>>(
        &self,
        instrument: &str,
        time: Option<T>,
    ) -> Result<Reply> {
        Call::get(&format!("/instruments/{instrument}/orderBook"))
            .query(Params::new().with_opt("time", time))
            .send(self.session)
            .await
    }

    /// Position book snapshot at `time`, or the most recent one.
    pub async fn position_book<T: Into<Arg>>(
        &self,
        instrument: &str,
        time: Option<T>,
    ) -> Result<Reply> {
        Call::get(&format!("/instruments/{instrument}/positionBook"))
            .query(Params::new().with_opt("time", time))
            .send(self.session)
            .await
    }
}
