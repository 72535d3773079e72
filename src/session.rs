//! Session configuration and host resolution.

use std::env;
use std::fmt;
use std::str::FromStr;

use bon::Builder;
use reqwest::Client as ReqwestClient;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret as _, SecretString};
use url::Url;

use crate::Result;
use crate::api::{Account, Instrument, Order, Position, Pricing, Trade, Transaction};
use crate::error::Error;

pub const TOKEN_VAR: &str = "OANDA_TOKEN";
pub const ENVIRONMENT_VAR: &str = "OANDA_ENVIRONMENT";
pub const TIME_FORMAT_VAR: &str = "OANDA_TIME_FORMAT";

/// Header negotiating how the API renders date-times.
pub const DATETIME_FORMAT_HEADER: &str = "accept-datetime-format";

const DEFAULT_HOSTNAME: &str = "https://{}.oanda.com";
const DEFAULT_VERSION: &str = "v3";
const DEFAULT_USER_AGENT: &str = "oanda_client_sdk";

/// Which OANDA division requests are sent to.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Live accounts
    Trade,
    /// Demo accounts
    #[default]
    Practice,
}

impl Environment {
    pub const VALUES: &'static [&'static str] = &["trade", "practice"];
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "trade" => Ok(Environment::Trade),
            "practice" => Ok(Environment::Practice),
            other => Err(Error::configuration("environment", other, Self::VALUES)),
        }
    }
}

impl TryFrom<&str> for Environment {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl TryFrom<String> for Environment {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// How date-times are rendered in responses.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
pub enum TimeFormat {
    /// Seconds since the epoch, as a decimal string
    #[default]
    #[strum(serialize = "UNIX")]
    Unix,
    #[strum(serialize = "RFC3339")]
    Rfc3339,
}

impl TimeFormat {
    pub const VALUES: &'static [&'static str] = &["UNIX", "RFC3339"];
}

impl FromStr for TimeFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "UNIX" => Ok(TimeFormat::Unix),
            "RFC3339" => Ok(TimeFormat::Rfc3339),
            other => Err(Error::configuration("time format", other, Self::VALUES)),
        }
    }
}

impl TryFrom<&str> for TimeFormat {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl TryFrom<String> for TimeFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Session settings.
///
/// ```
/// use oanda_client_sdk::{Config, Environment, TimeFormat};
///
/// let config = Config::builder()
///     .environment(Environment::Trade)
///     .time_format(TimeFormat::Rfc3339)
///     .unpack(true)
///     .build();
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    #[builder(default)]
    environment: Environment,
    #[builder(default)]
    time_format: TimeFormat,
    /// Return materialized bodies instead of envelopes for non-streaming calls.
    #[builder(default)]
    unpack: bool,
    /// Host template. `{}` receives `api-fx<environment>` or `stream-fx<environment>`.
    #[builder(into, default = DEFAULT_HOSTNAME.to_owned())]
    hostname: String,
    /// API version prefixed to every endpoint path.
    #[builder(into, default = DEFAULT_VERSION.to_owned())]
    version: String,
    #[builder(into)]
    user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

/// An authenticated connection to the v20 API.
///
/// Owns the HTTP transport and the settings every call depends on. Resource groups
/// are cheap views borrowing the session, e.g. [`Session::account`].
///
/// ```no_run
/// use oanda_client_sdk::{Config, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Session::new("my-token", Config::default())?;
///
/// let accounts = session.account().accounts().await?.json().await?;
/// for account in accounts["accounts"].as_list().unwrap_or_default() {
///     println!("{}", account["id"]);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    client: ReqwestClient,
    token: SecretString,
    config: Config,
    headers: HeaderMap,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new<T: Into<String>>(token: T, config: Config) -> Result<Session> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let client = ReqwestClient::builder().user_agent(user_agent).build()?;

        let mut session = Session {
            client,
            token: SecretString::from(token.into()),
            config,
            headers: HeaderMap::new(),
        };
        session.headers.insert(AUTHORIZATION, session.authorization()?);
        session
            .headers
            .insert(DATETIME_FORMAT_HEADER, time_format_header(session.config.time_format));

        Ok(session)
    }

    /// Builds a session from `OANDA_TOKEN` and the optional `OANDA_ENVIRONMENT`
    /// and `OANDA_TIME_FORMAT` variables.
    pub fn from_env() -> Result<Session> {
        let token = env::var(TOKEN_VAR)
            .map_err(|e| Error::validation(format!("{TOKEN_VAR} is not usable: {e}")))?;

        let mut config = Config::default();
        if let Ok(environment) = env::var(ENVIRONMENT_VAR) {
            config.environment = environment.parse()?;
        }
        if let Ok(time_format) = env::var(TIME_FORMAT_VAR) {
            config.time_format = time_format.parse()?;
        }

        Session::new(token, config)
    }

    /// Replaces the credential and the `Authorization` header with it.
    pub fn set_token<T: Into<String>>(&mut self, token: T) -> Result<()> {
        let previous = std::mem::replace(&mut self.token, SecretString::from(token.into()));
        match self.authorization() {
            Ok(header) => {
                self.headers.insert(AUTHORIZATION, header);
                Ok(())
            }
            Err(e) => {
                self.token = previous;
                Err(e)
            }
        }
    }

    /// Validates and applies a time format, updating `Accept-Datetime-Format`.
    ///
    /// Accepts a [`TimeFormat`] or its text form. On failure the session is unchanged.
    pub fn set_time_format<T>(&mut self, time_format: T) -> Result<()>
    where
        T: TryInto<TimeFormat>,
        T::Error: Into<Error>,
    {
        let time_format = time_format.try_into().map_err(Into::into)?;
        self.config.time_format = time_format;
        self.headers
            .insert(DATETIME_FORMAT_HEADER, time_format_header(time_format));
        Ok(())
    }

    /// Validates and applies an environment. On failure the session is unchanged.
    pub fn set_environment<T>(&mut self, environment: T) -> Result<()>
    where
        T: TryInto<Environment>,
        T::Error: Into<Error>,
    {
        self.config.environment = environment.try_into().map_err(Into::into)?;
        Ok(())
    }

    pub fn set_unpack(&mut self, unpack: bool) {
        self.config.unpack = unpack;
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    #[must_use]
    pub fn time_format(&self) -> TimeFormat {
        self.config.time_format
    }

    #[must_use]
    pub fn unpack(&self) -> bool {
        self.config.unpack
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.config.hostname
    }

    /// Headers sent with every request.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn client(&self) -> &ReqwestClient {
        &self.client
    }

    /// Full URL of `endpoint`.
    ///
    /// Endpoints containing `stream` go to the streaming host, everything else to
    /// the REST host; both receive the configured environment.
    pub fn resolve(&self, endpoint: &str) -> Result<Url> {
        let prefix = if endpoint.contains("stream") {
            "stream-fx"
        } else {
            "api-fx"
        };
        let host = self.config.hostname.replacen(
            "{}",
            &format!("{prefix}{}", self.config.environment),
            1,
        );
        let host = host.trim_end_matches('/');

        Ok(Url::parse(&format!("{host}/{}{endpoint}", self.config.version))?)
    }

    #[must_use]
    pub fn account(&self) -> Account<'_> {
        Account::new(self)
    }

    #[must_use]
    pub fn instrument(&self) -> Instrument<'_> {
        Instrument::new(self)
    }

    #[must_use]
    pub fn order(&self) -> Order<'_> {
        Order::new(self)
    }

    #[must_use]
    pub fn trade(&self) -> Trade<'_> {
        Trade::new(self)
    }

    #[must_use]
    pub fn position(&self) -> Position<'_> {
        Position::new(self)
    }

    #[must_use]
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    #[must_use]
    pub fn pricing(&self) -> Pricing<'_> {
        Pricing::new(self)
    }

    fn authorization(&self) -> Result<HeaderValue> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

fn time_format_header(time_format: TimeFormat) -> HeaderValue {
    match time_format {
        TimeFormat::Unix => HeaderValue::from_static("UNIX"),
        TimeFormat::Rfc3339 => HeaderValue::from_static("RFC3339"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Configuration, Kind};

    fn session(environment: Environment) -> Session {
        let config = Config::builder().environment(environment).build();
        Session::new("secret-token", config).unwrap()
    }

    #[test]
    fn resolve_should_pick_streaming_host() {
        let session = session(Environment::Practice);

        assert_eq!(
            session.resolve("/accounts/X/pricing/stream").unwrap().as_str(),
            "https://stream-fxpractice.oanda.com/v3/accounts/X/pricing/stream"
        );
        assert_eq!(
            session.resolve("/accounts/X/orders").unwrap().as_str(),
            "https://api-fxpractice.oanda.com/v3/accounts/X/orders"
        );
    }

    #[test]
    fn resolve_should_substitute_environment() {
        let session = session(Environment::Trade);

        assert_eq!(
            session.resolve("/accounts/X/transactions/stream").unwrap().as_str(),
            "https://stream-fxtrade.oanda.com/v3/accounts/X/transactions/stream"
        );
        assert_eq!(
            session.resolve("/accounts").unwrap().as_str(),
            "https://api-fxtrade.oanda.com/v3/accounts"
        );
    }

    #[test]
    fn resolve_should_accept_template_without_placeholder() {
        let config = Config::builder().hostname("http://127.0.0.1:8080/").build();
        let session = Session::new("token", config).unwrap();

        assert_eq!(
            session.resolve("/accounts").unwrap().as_str(),
            "http://127.0.0.1:8080/v3/accounts"
        );
    }

    #[test]
    fn new_should_set_headers() {
        let session = session(Environment::Practice);

        assert_eq!(session.headers()[AUTHORIZATION], "Bearer secret-token");
        assert!(session.headers()[AUTHORIZATION].is_sensitive());
        assert_eq!(session.headers()[DATETIME_FORMAT_HEADER], "UNIX");
    }

    #[test]
    fn set_token_should_update_header() {
        let mut session = session(Environment::Practice);
        session.set_token("rotated").unwrap();

        assert_eq!(session.headers()[AUTHORIZATION], "Bearer rotated");

        session.set_token("bad\ntoken").unwrap_err();
        assert_eq!(session.headers()[AUTHORIZATION], "Bearer rotated");
    }

    #[test]
    fn set_time_format_should_update_header() {
        let mut session = session(Environment::Practice);

        session.set_time_format("RFC3339").unwrap();
        assert_eq!(session.time_format(), TimeFormat::Rfc3339);
        assert_eq!(session.headers()[DATETIME_FORMAT_HEADER], "RFC3339");

        session.set_time_format(TimeFormat::Unix).unwrap();
        assert_eq!(session.headers()[DATETIME_FORMAT_HEADER], "UNIX");
    }

    #[test]
    fn invalid_time_format_should_leave_session_unchanged() {
        let mut session = session(Environment::Practice);
        session.set_time_format(TimeFormat::Rfc3339).unwrap();

        let error = session.set_time_format("ISO8601").unwrap_err();

        assert_eq!(error.kind(), Kind::Configuration);
        assert_eq!(error.downcast_ref::<Configuration>().unwrap().value, "ISO8601");
        assert_eq!(session.time_format(), TimeFormat::Rfc3339);
        assert_eq!(session.headers()[DATETIME_FORMAT_HEADER], "RFC3339");
    }

    #[test]
    fn invalid_environment_should_leave_session_unchanged() {
        let mut session = session(Environment::Trade);

        let error = session.set_environment("live").unwrap_err();

        assert_eq!(error.kind(), Kind::Configuration);
        assert_eq!(session.environment(), Environment::Trade);

        session.set_environment("practice").unwrap();
        assert_eq!(session.environment(), Environment::Practice);
    }

    #[test]
    fn enums_should_display_wire_values() {
        assert_eq!(Environment::Trade.to_string(), "trade");
        assert_eq!(Environment::Practice.to_string(), "practice");
        assert_eq!(TimeFormat::Unix.to_string(), "UNIX");
        assert_eq!(TimeFormat::Rfc3339.to_string(), "RFC3339");
        assert_eq!("practice".parse::<Environment>().unwrap(), Environment::Practice);
        assert!("Practice".parse::<Environment>().is_err());
    }

    #[test]
    fn debug_should_not_print_token() {
        let session = session(Environment::Practice);

        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
