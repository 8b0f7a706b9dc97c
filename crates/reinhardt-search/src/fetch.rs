//! Fetch collaborator
//!
//! The widget builds a [`FetchRequest`] from the submission and hands it to an
//! injected [`Fetcher`]. Two implementations ship with the crate:
//!
//! - [`BrowserFetcher`] (WASM): `window.fetch` through `web_sys`, honoring every
//!   `data-fetch-*` option
//! - [`HttpFetcher`] (native): `reqwest`; browser-only options such as `mode`
//!   or `credentials` have no meaning there and are ignored
//!
//! ## Request shape
//!
//! ```text
//! method get/head:  URL?<urlencoded form data>     (no body)
//! other methods:    body by enctype
//!     application/x-www-form-urlencoded  -> RequestBody::UrlEncoded
//!     multipart/form-data                -> RequestBody::Multipart (platform sets boundary)
//!     application/json                   -> RequestBody::Json
//!     text/plain                         -> RequestBody::Text
//! ```

#[cfg(target_arch = "wasm32")]
mod browser;
#[cfg(not(target_arch = "wasm32"))]
mod http;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserFetcher;
#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpFetcher;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::attributes::{FetchOptions, SubmitSettings};
use crate::error::{Result, SearchError};
use crate::form_data::FormData;

static ACTION_URL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^([\w-]+://|\.+/|/)").expect("action URL pattern is valid")
});

static JSON_CONTENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^application/json").expect("JSON content type pattern is valid")
});

/// Whether an `action` value names a URL (`scheme://`, `/`, `./` or `../`)
/// rather than an expression.
pub fn is_action_url(action: &str) -> bool {
	ACTION_URL.is_match(action)
}

/// Whether a content type is JSON (`application/json`, any parameters).
pub fn is_json_content_type(content_type: &str) -> bool {
	JSON_CONTENT_TYPE.is_match(content_type)
}

/// Encoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
	/// `application/x-www-form-urlencoded`
	UrlEncoded(String),
	/// `multipart/form-data`; encoded by the platform so it can pick the boundary
	Multipart(FormData),
	/// `application/json`
	Json(String),
	/// `text/plain`
	Text(String),
}

impl RequestBody {
	/// Encodes `data` for `enctype`. Unknown enctypes fall back to URL encoding.
	pub fn encode(data: &FormData, enctype: &str) -> Result<Self> {
		let essence = enctype
			.split(';')
			.next()
			.unwrap_or_default()
			.trim()
			.to_ascii_lowercase();
		Ok(match essence.as_str() {
			"multipart/form-data" => Self::Multipart(data.clone()),
			"application/json" => Self::Json(serde_json::to_string(data)?),
			"text/plain" => Self::Text(data.to_plain_text()),
			_ => Self::UrlEncoded(data.to_urlencoded()?),
		})
	}
}

/// A request ready to hand to a [`Fetcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
	/// Absolute or document-relative URL
	pub url: String,
	/// Upper-cased method
	pub method: String,
	/// Request headers
	pub headers: Vec<(String, String)>,
	/// Body; `None` for `GET` / `HEAD`
	pub body: Option<RequestBody>,
	/// `data-fetch-*` options
	pub options: FetchOptions,
}

impl FetchRequest {
	/// Builds the request for a form submission.
	///
	/// `GET` / `HEAD` append the form data to the URL as a query string, like a
	/// native form. Other methods carry the body encoded per enctype with a
	/// matching `Content-Type`, except multipart which leaves the header to the
	/// platform.
	pub fn from_submission(
		url: &str,
		settings: &SubmitSettings,
		form_data: &FormData,
		options: FetchOptions,
	) -> Result<Self> {
		let method = settings.method.to_ascii_uppercase();

		if !settings.sends_body() {
			return Ok(Self {
				url: append_query(url, &form_data.to_urlencoded()?),
				method,
				headers: Vec::new(),
				body: None,
				options,
			});
		}

		let enctype = settings.effective_enctype();
		let body = RequestBody::encode(form_data, enctype)?;
		let headers = match body {
			RequestBody::Multipart(_) => Vec::new(),
			_ => vec![("Content-Type".to_string(), enctype.to_string())],
		};

		Ok(Self {
			url: url.to_string(),
			method,
			headers,
			body: Some(body),
			options,
		})
	}

	/// First header value with a case-insensitive name match.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

fn append_query(url: &str, query: &str) -> String {
	if query.is_empty() {
		return url.to_string();
	}
	let (base, fragment) = match url.split_once('#') {
		Some((base, fragment)) => (base, Some(fragment)),
		None => (url, None),
	};
	let separator = if !base.contains('?') {
		"?"
	} else if base.ends_with('?') || base.ends_with('&') {
		""
	} else {
		"&"
	};
	match fragment {
		Some(fragment) => format!("{base}{separator}{query}#{fragment}"),
		None => format!("{base}{separator}{query}"),
	}
}

/// A completed response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchResponse {
	status: u16,
	headers: BTreeMap<String, String>,
	body: Vec<u8>,
}

impl FetchResponse {
	/// Creates a response with an empty body.
	pub fn new(status: u16) -> Self {
		Self {
			status,
			..Self::default()
		}
	}

	/// A `200 OK` JSON response, handy for tests and mocks.
	pub fn json(value: &Value) -> Self {
		Self::new(200)
			.with_header("content-type", "application/json")
			.with_body(value.to_string())
	}

	/// Adds a header (names are stored lower-cased).
	pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers
			.insert(name.to_ascii_lowercase(), value.into());
		self
	}

	/// Sets the body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();
		self
	}

	/// HTTP status code.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Whether the status is in `200..=299`.
	pub fn ok(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Header lookup, case-insensitive.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.get(&name.to_ascii_lowercase())
			.map(String::as_str)
	}

	/// Raw body bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.body
	}

	/// Body as UTF-8 text (lossy).
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Body decoded as JSON.
	pub fn json_body(&self) -> Result<Value> {
		serde_json::from_slice(&self.body)
			.map_err(|err| SearchError::deserialization(err.to_string()))
	}
}

/// Performs network requests for URL actions.
///
/// Errors are reserved for transport failures; a non-2xx status is still an
/// `Ok` response.
#[async_trait(?Send)]
pub trait Fetcher {
	/// Sends `request` and buffers the full response.
	async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}
