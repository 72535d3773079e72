//! Response envelope and the reply returned by every endpoint call.

use std::fmt;
use std::pin::Pin;

use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt as _, TryStreamExt as _};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::Result;
use crate::error::Error;
use crate::value::Value;

/// `type` of the keep-alive lines interleaved in streaming bodies.
pub const HEARTBEAT: &str = "HEARTBEAT";

/// Boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

enum Body {
    Buffered(Bytes),
    Streaming(ByteStream),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Body::Streaming(_) => write!(f, "Streaming(..)"),
        }
    }
}

/// A raw API response: status, final URL, method and a body that has not been read yet.
///
/// The body can be materialized once, either as a single JSON document
/// ([`json`](Self::json), [`json_raw`](Self::json_raw), [`json_as`](Self::json_as))
/// or as a lazy sequence of newline-delimited documents ([`lines`](Self::lines)).
/// Both consume the envelope.
#[expect(
    clippy::module_name_repetitions,
    reason = "ApiResponse keeps the envelope apart from transport responses when used outside this module"
)]
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    method: Method,
    url: Url,
    body: Body,
}

impl ApiResponse {
    /// Wraps a transport response without reading its body.
    pub(crate) fn from_reqwest(response: reqwest::Response, method: Method) -> Self {
        let status = response.status();
        let url = response.url().clone();
        let stream = response.bytes_stream().map_err(Error::from);

        Self::from_stream(status, method, url, stream)
    }

    /// Creates an envelope around an already received body.
    #[must_use]
    pub fn from_bytes<B: Into<Bytes>>(status: StatusCode, method: Method, url: Url, body: B) -> Self {
        Self {
            status,
            method,
            url,
            body: Body::Buffered(body.into()),
        }
    }

    /// Creates an envelope around a body that arrives in chunks.
    #[must_use]
    pub fn from_stream<S>(status: StatusCode, method: Method, url: Url, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            status,
            method,
            url,
            body: Body::Streaming(Box::pin(stream)),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The final URL of the request, after redirects.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// 200 for reads, 201 for writes. Nothing else counts as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, StatusCode::OK | StatusCode::CREATED)
    }

    /// Whether the final URL points at a streaming endpoint or host.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.url.path().contains("stream")
            || self.url.host_str().is_some_and(|host| host.contains("stream"))
    }

    /// Reads the whole body.
    pub async fn bytes(self) -> Result<Bytes> {
        match self.body {
            Body::Buffered(bytes) => Ok(bytes),
            Body::Streaming(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Ok(buffer.freeze())
            }
        }
    }

    /// Reads as much of the body as arrives, returning the bytes with the error
    /// that ended the read early, if any.
    pub(crate) async fn read_partial(self) -> (Bytes, Option<Error>) {
        match self.body {
            Body::Buffered(bytes) => (bytes, None),
            Body::Streaming(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(chunk) => buffer.extend_from_slice(&chunk),
                        Err(e) => return (buffer.freeze(), Some(e)),
                    }
                }
                (buffer.freeze(), None)
            }
        }
    }

    /// Reads the whole body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parses the body as one JSON document and returns it unmodified.
    pub async fn json_raw(self) -> Result<serde_json::Value> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::decode(e, None))
    }

    /// Parses the body as one JSON document in attribute-addressable form.
    pub async fn json(self) -> Result<Value> {
        Value::wrap(self.json_raw().await?)
    }

    /// Parses the body into a typed model.
    pub async fn json_as<T: DeserializeOwned>(self) -> Result<T> {
        crate::serde_helpers::deserialize_with_warnings(self.json_raw().await?)
    }

    /// Lazily decodes a newline-delimited JSON body, one document per line,
    /// in attribute-addressable form.
    ///
    /// Lines whose `type` is `"HEARTBEAT"` are skipped unless `heartbeats` is set.
    /// Nothing is read until the stream is polled, and dropping the stream
    /// closes the connection.
    pub fn lines(self, heartbeats: bool) -> impl Stream<Item = Result<Value>> + Send {
        self.lines_raw(heartbeats)
            .and_then(|line| async move { Value::wrap(line) })
    }

    /// Same as [`lines`](Self::lines) but yields the unmodified documents.
    pub fn lines_raw(self, heartbeats: bool) -> impl Stream<Item = Result<serde_json::Value>> + Send {
        let mut chunks: ByteStream = match self.body {
            Body::Buffered(bytes) => Box::pin(futures::stream::once(async move { Ok(bytes) })),
            Body::Streaming(stream) => stream,
        };

        try_stream! {
            let mut decoder = LineDecoder::default();

            while let Some(chunk) = chunks.next().await {
                decoder.push(&chunk?);
                while let Some(line) = decoder.next_line()? {
                    if heartbeats || !is_heartbeat(&line) {
                        yield line;
                    } else {
                        #[cfg(feature = "tracing")]
                        tracing::trace!("skipping heartbeat line");
                    }
                }
            }

            if let Some(line) = decoder.finish()? {
                if heartbeats || !is_heartbeat(&line) {
                    yield line;
                }
            }
        }
    }
}

impl fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ApiResponse [{}]>", self.status.as_u16())
    }
}

fn is_heartbeat(line: &serde_json::Value) -> bool {
    line.get("type").and_then(serde_json::Value::as_str) == Some(HEARTBEAT)
}

/// Splits buffered bytes on `\n` and parses every complete line.
#[derive(Debug, Default)]
struct LineDecoder {
    buffer: BytesMut,
    /// Bytes of `buffer` already searched for `\n`
    scanned: usize,
    line: usize,
}

impl LineDecoder {
    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete, non-blank line. `None` means more bytes are needed.
    fn next_line(&mut self) -> Result<Option<serde_json::Value>> {
        while let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|byte| *byte == b'\n')
        {
            let line = self.buffer.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if let Some(value) = self.parse(&line)? {
                return Ok(Some(value));
            }
        }
        self.scanned = self.buffer.len();
        Ok(None)
    }

    /// Parses whatever is left once the body has ended.
    fn finish(&mut self) -> Result<Option<serde_json::Value>> {
        let rest = self.buffer.split();
        self.scanned = 0;
        self.parse(&rest)
    }

    fn parse(&mut self, line: &[u8]) -> Result<Option<serde_json::Value>> {
        self.line += 1;
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(line)
            .map(Some)
            .map_err(|e| Error::decode(e, Some(self.line)))
    }
}

/// What an endpoint call returns.
///
/// When the session has `unpack` enabled, non-streaming calls come back as
/// [`Reply::Unpacked`] with the body already materialized. Everything else,
/// streaming endpoints included, comes back as the untouched [`Reply::Envelope`].
#[non_exhaustive]
#[derive(Debug)]
pub enum Reply {
    Unpacked(Value),
    Envelope(ApiResponse),
}

impl Reply {
    /// The body in attribute-addressable form, materializing the envelope if needed.
    pub async fn json(self) -> Result<Value> {
        match self {
            Reply::Unpacked(value) => Ok(value),
            Reply::Envelope(response) => response.json().await,
        }
    }

    /// The body as unmodified JSON.
    pub async fn json_raw(self) -> Result<serde_json::Value> {
        match self {
            Reply::Unpacked(value) => Ok(value.into_raw()),
            Reply::Envelope(response) => response.json_raw().await,
        }
    }

    /// The body deserialized into a typed model.
    pub async fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        crate::serde_helpers::deserialize_with_warnings(self.json_raw().await?)
    }

    /// Line-delimited decoding of an envelope, see [`ApiResponse::lines`].
    ///
    /// Fails when the body has already been materialized.
    pub fn lines(self, heartbeats: bool) -> Result<impl Stream<Item = Result<Value>> + Send> {
        Ok(self.into_envelope()?.lines(heartbeats))
    }

    /// The envelope, if the body has not been materialized.
    pub fn into_envelope(self) -> Result<ApiResponse> {
        match self {
            Reply::Envelope(response) => Ok(response),
            Reply::Unpacked(_) => Err(Error::validation(
                "reply body was already materialized, no envelope left",
            )),
        }
    }

    #[must_use]
    pub fn is_unpacked(&self) -> bool {
        matches!(self, Reply::Unpacked(_))
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use futures::{StreamExt as _, TryStreamExt as _};
    use serde_json::json;

    use super::*;
    use crate::error::{Decode, Kind};

    fn stream_url() -> Url {
        Url::parse("https://stream-fxpractice.oanda.com/v3/accounts/001/pricing/stream").unwrap()
    }

    fn chunked(chunks: &[&'static str]) -> ApiResponse {
        let chunks: Vec<Result<Bytes>> = chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
            .collect();
        ApiResponse::from_stream(StatusCode::OK, Method::GET, stream_url(), stream::iter(chunks))
    }

    const THREE_LINES: &str = concat!(
        r#"{"type":"PRICE","instrument":"EUR_USD","bids":[{"price":"1.0850"}]}"#,
        "\n",
        r#"{"type":"HEARTBEAT","time":"1700000000.000000000"}"#,
        "\n",
        r#"{"type":"PRICE","instrument":"USD_JPY","bids":[{"price":"151.02"}]}"#,
        "\n",
    );

    #[tokio::test]
    async fn lines_should_skip_heartbeats() {
        let response = ApiResponse::from_bytes(StatusCode::OK, Method::GET, stream_url(), THREE_LINES);
        let items: Vec<Value> = response.lines(false).try_collect().await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["instrument"].as_str(), Some("EUR_USD"));
        assert_eq!(items[1]["instrument"].as_str(), Some("USD_JPY"));
    }

    #[tokio::test]
    async fn lines_should_yield_heartbeats_on_request() {
        let response = ApiResponse::from_bytes(StatusCode::OK, Method::GET, stream_url(), THREE_LINES);
        let items: Vec<Value> = response.lines(true).try_collect().await.unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[1]["type"].as_str(), Some("HEARTBEAT"));
    }

    #[tokio::test]
    async fn lines_should_reassemble_lines_split_across_chunks() {
        let response = chunked(&[
            "{\"type\":\"PRICE\",\"instr",
            "ument\":\"EUR_USD\"}\r\n\r\n{\"type\":",
            "\"PRICE\",\"instrument\":\"GBP_USD\"}",
        ]);
        let items: Vec<serde_json::Value> = response.lines_raw(true).try_collect().await.unwrap();

        assert_eq!(
            items,
            vec![
                json!({"type": "PRICE", "instrument": "EUR_USD"}),
                json!({"type": "PRICE", "instrument": "GBP_USD"}),
            ]
        );
    }

    #[tokio::test]
    async fn lines_should_fail_on_invalid_line() {
        let response = chunked(&["{\"type\":\"PRICE\"}\n", "not json\n", "{\"type\":\"PRICE\"}\n"]);
        let mut lines = Box::pin(response.lines(true));

        assert!(lines.next().await.unwrap().is_ok());
        let error = lines.next().await.unwrap().unwrap_err();
        assert_eq!(error.kind(), Kind::Decode);
        assert_eq!(error.downcast_ref::<Decode>().unwrap().line, Some(2));
    }

    #[tokio::test]
    async fn lines_should_surface_transport_errors() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"{\"type\":\"PRICE\"}\n")),
            Err(Error::validation("connection reset")),
        ];
        let response =
            ApiResponse::from_stream(StatusCode::OK, Method::GET, stream_url(), stream::iter(chunks));
        let results: Vec<Result<Value>> = response.lines(true).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn decoder_should_scan_only_new_bytes() {
        let mut decoder = LineDecoder::default();
        let line = format!("{{\"type\":\"PRICE\",\"pad\":\"{}\"}}\n", "x".repeat(64));

        for chunk in line.as_bytes()[..line.len() - 1].chunks(7) {
            decoder.push(chunk);
            assert!(decoder.next_line().unwrap().is_none(), "line is incomplete");
            assert_eq!(decoder.scanned, decoder.buffer.len());
        }
        decoder.push(b"\n{\"type\":");

        let value = decoder.next_line().unwrap().unwrap();
        assert_eq!(value["type"], "PRICE");
        assert!(decoder.next_line().unwrap().is_none(), "second line is incomplete");
        assert_eq!(decoder.scanned, decoder.buffer.len());
        assert_eq!(decoder.line, 1);
    }

    #[tokio::test]
    async fn read_partial_should_keep_bytes_before_failure() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"{\"errorMess")),
            Err(Error::validation("connection reset")),
        ];
        let response = ApiResponse::from_stream(
            StatusCode::BAD_REQUEST,
            Method::GET,
            stream_url(),
            stream::iter(chunks),
        );

        let (body, error) = response.read_partial().await;

        assert_eq!(&body[..], b"{\"errorMess");
        assert_eq!(error.unwrap().kind(), Kind::Validation);
    }

    #[tokio::test]
    async fn json_should_materialize_whole_body() {
        let response = chunked(&["{\"accounts\": [{\"id\": \"001\"", "}, {\"id\": \"002\"}]}"]);
        let body = response.json().await.unwrap();

        assert_eq!(body["accounts"][1]["id"].as_str(), Some("002"));
    }

    #[tokio::test]
    async fn json_should_fail_on_invalid_body() {
        let response = ApiResponse::from_bytes(StatusCode::OK, Method::GET, stream_url(), "<html>");
        let error = response.json_raw().await.unwrap_err();

        assert_eq!(error.kind(), Kind::Decode);
    }

    #[test]
    fn success_should_be_200_or_201_only() {
        let url = stream_url();
        for (status, expected) in [
            (StatusCode::OK, true),
            (StatusCode::CREATED, true),
            (StatusCode::ACCEPTED, false),
            (StatusCode::NO_CONTENT, false),
            (StatusCode::NOT_FOUND, false),
        ] {
            let response = ApiResponse::from_bytes(status, Method::GET, url.clone(), "");
            assert_eq!(response.is_success(), expected, "status {status}");
        }
    }

    #[test]
    fn display_should_show_status() {
        let response = ApiResponse::from_bytes(StatusCode::CREATED, Method::POST, stream_url(), "{}");

        assert_eq!(response.to_string(), "<ApiResponse [201]>");
        assert!(response.is_stream());
    }

    #[tokio::test]
    async fn reply_should_reject_lines_when_unpacked() {
        let reply = Reply::Unpacked(Value::wrap(json!({"prices": []})).unwrap());

        assert!(reply.is_unpacked());
        assert_eq!(reply.lines(true).err().unwrap().kind(), Kind::Validation);
    }
}
