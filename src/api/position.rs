use crate::Result;
use crate::middleware::{Body, Call, Params};
use crate::response::Reply;
use crate::session::Session;

#[derive(Debug, Clone, Copy)]
pub struct Position<'session> {
    session: &'session Session,
}

impl<'session> Position<'session> {
    pub(crate) fn new(session: &'session Session) -> Self {
        Self { session }
    }

    /// Every position the account has had, open or not.
    pub async fn positions(&self, account_id: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/positions"))
            .send(self.session)
            .await
    }

    pub async fn open_positions(&self, account_id: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/openPositions"))
            .send(self.session)
            .await
    }

    pub async fn details(&self, account_id: &str, instrument: &str) -> Result<Reply> {
        Call::get(&format!("/accounts/{account_id}/positions/{instrument}"))
            .send(self.session)
            .await
    }

    /// Closes out a position.
    ///
    /// `longUnits`/`shortUnits` take `"ALL"`, `"NONE"`, or a positive number of units;
    /// `longClientExtensions`/`shortClientExtensions` tag the closing market orders.
    pub async fn close(&self, account_id: &str, instrument: &str, params: Params) -> Result<Reply> {
        Call::put(&format!(
            "/accounts/{account_id}/positions/{instrument}/close"
        ))
        .body(Body::Params(params))
        .send(self.session)
        .await
    }
}
