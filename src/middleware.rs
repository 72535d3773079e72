//! The single choke point every endpoint call passes through.
//!
//! [`dispatch`] normalizes the call arguments, issues the request, turns any status
//! other than 200/201 into a [`Status`](crate::error::Status) error and applies the
//! session's unpack policy.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap as _, Serializer};

use crate::Result;
use crate::error::Status;
use crate::response::{ApiResponse, Reply};
use crate::session::Session;

/// Keyword aliases rewritten before transmission.
const ALIASES: &[(&str, &str)] = &[("since", "from"), ("until", "to")];

/// A single call argument.
///
/// The wire protocol only takes strings and JSON scalars, so numeric variants
/// are turned into their decimal text by [`Params::normalize`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Kept apart from [`Arg::Float`] so the text form is the shortest `f32` one
    Float32(f32),
    Decimal(Decimal),
    Bool(bool),
    /// Multi-value parameter, sent comma-joined in query strings
    List(Vec<String>),
    /// Passed through untouched
    Json(serde_json::Value),
}

impl Arg {
    /// Numbers become [`Arg::Str`]; everything else is returned unchanged.
    #[must_use]
    pub fn normalize(self) -> Arg {
        match self {
            Arg::Int(n) => Arg::Str(n.to_string()),
            Arg::UInt(n) => Arg::Str(n.to_string()),
            Arg::Float(n) => Arg::Str(n.to_string()),
            Arg::Float32(n) => Arg::Str(n.to_string()),
            Arg::Decimal(n) => Arg::Str(n.normalize().to_string()),
            other => other,
        }
    }

    /// Text form used in query strings. `None` for values that are left out.
    fn to_query_value(&self) -> Option<String> {
        match self {
            Arg::Str(text) => Some(text.clone()),
            Arg::Bool(flag) => Some(flag.to_string()),
            Arg::List(items) if items.is_empty() => None,
            Arg::List(items) => Some(items.join(",")),
            Arg::Json(serde_json::Value::Null) => None,
            Arg::Json(serde_json::Value::String(text)) => Some(text.clone()),
            Arg::Json(json) => Some(json.to_string()),
            numeric => numeric.clone().normalize().to_query_value(),
        }
    }
}

impl Serialize for Arg {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Arg::Str(text) => serializer.serialize_str(text),
            Arg::Int(n) => serializer.collect_str(n),
            Arg::UInt(n) => serializer.collect_str(n),
            Arg::Float(n) => serializer.collect_str(n),
            Arg::Float32(n) => serializer.collect_str(n),
            Arg::Decimal(n) => serializer.collect_str(&n.normalize()),
            Arg::Bool(flag) => serializer.serialize_bool(*flag),
            Arg::List(items) => items.serialize(serializer),
            Arg::Json(json) => json.serialize(serializer),
        }
    }
}

macro_rules! arg_from {
    ($variant:ident: $($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Arg {
                fn from(value: $source) -> Self {
                    Arg::$variant(value.into())
                }
            }
        )+
    };
}

arg_from!(Int: i8, i16, i32, i64);
arg_from!(UInt: u8, u16, u32, u64);
arg_from!(Float: f64);
arg_from!(Float32: f32);
arg_from!(Str: &str, String);
arg_from!(Decimal: Decimal);
arg_from!(Bool: bool);
arg_from!(Json: serde_json::Value);
arg_from!(List: Vec<String>);

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        u64::try_from(value).map_or_else(|_| Arg::Str(value.to_string()), Arg::UInt)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Str(value.clone())
    }
}

impl From<DateTime<Utc>> for Arg {
    fn from(value: DateTime<Utc>) -> Self {
        Arg::Str(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl From<&[&str]> for Arg {
    fn from(values: &[&str]) -> Self {
        Arg::List(values.iter().map(|value| (*value).to_owned()).collect())
    }
}

/// Ordered keyword arguments for one call.
///
/// ```
/// use oanda_client_sdk::Params;
///
/// let params = Params::new()
///     .with("granularity", "H1")
///     .with("count", 500)
///     .with("since", "2024-01-02T00:00:00Z")
///     .normalize();
///
/// assert_eq!(
///     params.to_query(),
///     vec![
///         ("granularity".to_owned(), "H1".to_owned()),
///         ("count".to_owned(), "500".to_owned()),
///         ("from".to_owned(), "2024-01-02T00:00:00Z".to_owned()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Arg)>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier value for the same key.
    #[must_use]
    pub fn with<K: Into<String>, V: Into<Arg>>(mut self, key: K, value: V) -> Self {
        self.set(key.into(), value.into());
        self
    }

    /// Sets `key` only when `value` is present.
    #[must_use]
    pub fn with_opt<K: Into<String>, V: Into<Arg>>(self, key: K, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Sets a multi-value parameter.
    #[must_use]
    pub fn with_list<K, I>(self, key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator,
        I::Item: ToString,
    {
        let values = values.into_iter().map(|value| value.to_string()).collect();
        self.with(key, Arg::List(values))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arg> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    fn set(&mut self, key: String, value: Arg) {
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Renames `since`/`until` to `from`/`to` and turns numbers into decimal text.
    ///
    /// An alias wins over an explicit `from`/`to` passed in the same call.
    #[must_use]
    pub fn normalize(self) -> Params {
        let aliased: Vec<&str> = ALIASES
            .iter()
            .filter(|(alias, _)| self.get(alias).is_some())
            .map(|(_, target)| *target)
            .collect();

        let entries = self
            .entries
            .into_iter()
            .filter(|(key, _)| !aliased.contains(&key.as_str()))
            .map(|(key, value)| {
                let key = ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map_or(key, |(_, target)| (*target).to_owned());
                (key, value.normalize())
            })
            .collect();

        Params { entries }
    }

    /// Query string pairs; multi-value parameters are comma-joined and empty ones dropped.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| Some((key.clone(), value.to_query_value()?)))
            .collect()
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<Arg>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Params::new(), |params, (key, value)| params.with(key, value))
    }
}

/// JSON body of a call.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Keyword arguments at the top level of the body
    Params(Params),
    /// Keyword arguments nested under one key, e.g. `{"order": {...}}`
    Nested(&'static str, Params),
}

impl Body {
    fn normalize(self) -> Body {
        match self {
            Body::Params(params) => Body::Params(params.normalize()),
            Body::Nested(key, params) => Body::Nested(key, params.normalize()),
        }
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Body::Params(params) => params.serialize(serializer),
            Body::Nested(key, params) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(key, params)?;
                map.end()
            }
        }
    }
}

/// One endpoint call as seen by [`dispatch`].
#[derive(Debug, Clone)]
pub(crate) struct Call<'endpoint> {
    pub method: Method,
    pub endpoint: &'endpoint str,
    pub query: Params,
    /// Query parameters named by the operation itself, exempt from alias renaming
    pub literal: Params,
    pub body: Option<Body>,
    pub streaming: bool,
}

impl<'endpoint> Call<'endpoint> {
    pub(crate) fn new(method: Method, endpoint: &'endpoint str) -> Self {
        Self {
            method,
            endpoint,
            query: Params::new(),
            literal: Params::new(),
            body: None,
            streaming: false,
        }
    }

    pub(crate) fn get(endpoint: &'endpoint str) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub(crate) fn post(endpoint: &'endpoint str) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub(crate) fn put(endpoint: &'endpoint str) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub(crate) fn patch(endpoint: &'endpoint str) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub(crate) fn query(mut self, query: Params) -> Self {
        self.query = query;
        self
    }

    pub(crate) fn literal<V: Into<Arg>>(mut self, key: &str, value: Option<V>) -> Self {
        self.literal = self.literal.with_opt(key, value);
        self
    }

    pub(crate) fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub(crate) async fn send(self, session: &Session) -> Result<Reply> {
        dispatch(session, self).await
    }
}

/// Issues one call through the middleware pipeline.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip(session, call),
        fields(
            method = %call.method,
            path = %crate::error::redact_path(call.endpoint),
            streaming = call.streaming,
            status_code
        )
    )
)]
pub(crate) async fn dispatch(session: &Session, call: Call<'_>) -> Result<Reply> {
    let mut query = call.query.normalize();
    for (key, value) in call.literal.entries {
        query.set(key, value.normalize());
    }
    let query = query.to_query();
    let body = call.body.map(Body::normalize);

    let url = session.resolve(call.endpoint)?;
    let mut request = session
        .client()
        .request(call.method.clone(), url)
        .headers(session.headers().clone());
    if !query.is_empty() {
        request = request.query(&query);
    }
    if let Some(body) = &body {
        request = request.json(body);
    }

    let response = ApiResponse::from_reqwest(request.send().await?, call.method);

    #[cfg(feature = "tracing")]
    tracing::Span::current().record("status_code", response.status().as_u16());

    if !response.is_success() {
        return Err(classify(response).await);
    }

    if session.unpack() && !call.streaming && !response.is_stream() {
        return Ok(Reply::Unpacked(response.json().await?));
    }

    Ok(Reply::Envelope(response))
}

/// Builds the classified error for a failed envelope, reading its body.
///
/// A body that breaks off while being read still yields a `Status` error, built
/// from the bytes received so far.
pub(crate) async fn classify(response: ApiResponse) -> crate::error::Error {
    let status_code = response.status();
    let method = response.method().clone();
    let url = response.url().clone();

    let (body, read_error) = response.read_partial().await;
    let mut status = Status::new(status_code, method, url, &body);
    status.read_error = read_error.map(|e| e.to_string());

    #[cfg(feature = "tracing")]
    tracing::warn!(
        status = %status.status_code,
        method = %status.method,
        path = %status.path,
        message = %status.message,
        "API request failed"
    );

    status.into()
}
