use std::backtrace::Backtrace;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;

/// HTTP method type, re-exported for use with error inspection.
pub use reqwest::Method;
/// HTTP status code type, re-exported for use with error inspection.
pub use reqwest::StatusCode;
use reqwest::header;
use url::Url;

/// Placeholder substituted for account identifiers in displayed paths.
pub const ACCOUNT_PLACEHOLDER: &str = "<ACCOUNT>";

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The API answered with a status code other than 200 or 201
    Status,
    /// A body that had to be JSON could not be decoded
    Decode,
    /// An out-of-range value was supplied for a session setting
    Configuration,
    /// A JSON document could not be wrapped into an [`AttrMap`](crate::AttrMap)
    Construction,
    /// The caller asked for something the current value cannot provide
    Validation,
    /// Internal error from dependencies
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn configuration<V: Into<String>>(
        field: &'static str,
        value: V,
        expected: &'static [&'static str],
    ) -> Self {
        Configuration {
            field,
            value: value.into(),
            expected,
        }
        .into()
    }

    #[must_use]
    pub fn construction(key: &str, reason: ConstructionReason) -> Self {
        Construction {
            key: key.to_owned(),
            reason,
        }
        .into()
    }

    #[must_use]
    pub fn decode(source: serde_json::Error, line: Option<usize>) -> Self {
        Decode { source, line }.into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Body of a failed response as it was received.
#[expect(
    clippy::module_name_repetitions,
    reason = "ErrorBody is matched on outside this module"
)]
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// The body decoded as JSON
    Json(serde_json::Value),
    /// The body was not JSON; kept verbatim for diagnostics
    Text(String),
}

/// A classified API failure: any response whose status is not 200 or 201.
///
/// `path` is safe to log, account identifiers in it are replaced by
/// [`ACCOUNT_PLACEHOLDER`]. The unredacted `url` stays available for
/// programmatic handling.
#[non_exhaustive]
#[derive(Debug)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub url: Url,
    pub message: String,
    pub error_code: Option<String>,
    pub body: ErrorBody,
    /// Set when the body broke off while being read; `body` then holds what arrived
    pub read_error: Option<String>,
}

impl Status {
    /// Builds the classified error for a failed response body.
    ///
    /// The message comes from the `errorMessage` field when the body is a JSON
    /// object carrying one, and from the status reason phrase otherwise.
    #[must_use]
    pub fn new(status_code: StatusCode, method: Method, url: Url, raw_body: &[u8]) -> Self {
        let reason = status_code.canonical_reason().unwrap_or("Unknown Status");

        let (body, message, error_code) = match serde_json::from_slice::<serde_json::Value>(raw_body)
        {
            Ok(json) => {
                let message = json
                    .get("errorMessage")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or(reason)
                    .to_owned();
                let error_code = json.get("errorCode").map(|code| match code {
                    serde_json::Value::String(code) => code.clone(),
                    other => other.to_string(),
                });
                (ErrorBody::Json(json), message, error_code)
            }
            Err(_) => (
                ErrorBody::Text(String::from_utf8_lossy(raw_body).into_owned()),
                reason.to_owned(),
                None,
            ),
        };

        Self {
            status_code,
            path: redact_path(url.path()),
            method,
            url,
            message,
            error_code,
            body,
            read_error: None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method,
            self.path,
            self.status_code.as_u16(),
            self.message
        )
    }
}

impl StdError for Status {}

/// Replaces every path segment that follows an `accounts` segment with
/// [`ACCOUNT_PLACEHOLDER`].
#[must_use]
pub fn redact_path(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|segment| {
            let redacted = if previous == "accounts" && !segment.is_empty() {
                ACCOUNT_PLACEHOLDER
            } else {
                segment
            };
            previous = segment;
            redacted
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Decode {
    pub source: serde_json::Error,
    /// 1-based line number when decoding a line-delimited stream
    pub line: Option<usize>,
}

impl fmt::Display for Decode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "invalid JSON on line {line}: {}", self.source),
            None => write!(f, "invalid JSON body: {}", self.source),
        }
    }
}

impl StdError for Decode {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Configuration {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} {:?}, expected one of: {}",
            self.field,
            self.value,
            self.expected.join(", ")
        )
    }
}

impl StdError for Configuration {}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionReason {
    /// The key is not a bare identifier
    InvalidIdentifier,
    /// The key collides with a method name of the wrapper
    Reserved,
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Construction {
    pub key: String,
    pub reason: ConstructionReason,
}

impl fmt::Display for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ConstructionReason::InvalidIdentifier => {
                write!(f, "key {:?} is not a valid identifier", self.key)
            }
            ConstructionReason::Reserved => {
                write!(f, "key {:?} is equal to a reserved attribute name", self.key)
            }
        }
    }
}

impl StdError for Construction {}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

impl From<Infallible> for Error {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<header::InvalidHeaderValue> for Error {
    fn from(e: header::InvalidHeaderValue) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::decode(e, None)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Status, err)
    }
}

impl From<Decode> for Error {
    fn from(err: Decode) -> Self {
        Error::with_source(Kind::Decode, err)
    }
}

impl From<Configuration> for Error {
    fn from(err: Configuration) -> Self {
        Error::with_source(Kind::Configuration, err)
    }
}

impl From<Construction> for Error {
    fn from(err: Construction) -> Self {
        Error::with_source(Kind::Construction, err)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_url() -> Url {
        Url::parse("https://api-fxpractice.oanda.com/v3/accounts/001-002-9999999-001/orders/123")
            .unwrap()
    }

    #[test]
    fn redact_path_should_hide_account_segment() {
        assert_eq!(
            redact_path("/v3/accounts/001-002-9999999-001/orders/123"),
            "/v3/accounts/<ACCOUNT>/orders/123"
        );
        assert_eq!(
            redact_path("/v3/accounts/001-002-9999999-001"),
            "/v3/accounts/<ACCOUNT>"
        );
        assert_eq!(redact_path("/v3/accounts"), "/v3/accounts");
        assert_eq!(
            redact_path("/v3/instruments/EUR_USD/candles"),
            "/v3/instruments/EUR_USD/candles"
        );
    }

    #[test]
    fn status_should_use_error_message_field() {
        let body = br#"{"errorMessage": "Order specifier does not exist", "errorCode": "NO_SUCH_ORDER"}"#;
        let status = Status::new(StatusCode::NOT_FOUND, Method::GET, order_url(), body);

        assert_eq!(status.message, "Order specifier does not exist");
        assert_eq!(status.error_code.as_deref(), Some("NO_SUCH_ORDER"));
        assert_eq!(
            status.to_string(),
            "GET /v3/accounts/<ACCOUNT>/orders/123: 404 Order specifier does not exist"
        );
        assert!(status.url.path().contains("001-002-9999999-001"));
    }

    #[test]
    fn status_should_fall_back_to_reason_phrase_for_text() {
        let status = Status::new(
            StatusCode::BAD_GATEWAY,
            Method::PUT,
            order_url(),
            b"<html>upstream down</html>",
        );

        assert_eq!(status.message, "Bad Gateway");
        assert_eq!(
            status.body,
            ErrorBody::Text("<html>upstream down</html>".to_owned())
        );
        assert_eq!(
            status.to_string(),
            "PUT /v3/accounts/<ACCOUNT>/orders/123: 502 Bad Gateway"
        );
    }

    #[test]
    fn status_should_fall_back_to_reason_phrase_without_error_message() {
        let status = Status::new(
            StatusCode::BAD_REQUEST,
            Method::POST,
            order_url(),
            br#"{"lastTransactionID": "6356"}"#,
        );

        assert_eq!(status.message, "Bad Request");
        assert!(matches!(status.body, ErrorBody::Json(_)));
    }

    #[test]
    fn configuration_into_error_should_succeed() {
        let error = Error::configuration("environment", "live", &["trade", "practice"]);

        assert_eq!(error.kind(), Kind::Configuration);
        assert_eq!(
            error.to_string(),
            r#"Configuration: invalid environment "live", expected one of: trade, practice"#
        );
    }

    #[test]
    fn construction_into_error_should_succeed() {
        let error = Error::construction("items", ConstructionReason::Reserved);

        assert_eq!(error.kind(), Kind::Construction);
        let construction = error.downcast_ref::<Construction>().unwrap();
        assert_eq!(construction.key, "items");
    }
}
