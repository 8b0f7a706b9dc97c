//! Native fetcher backed by `reqwest`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{FetchRequest, FetchResponse, Fetcher, RequestBody};
use crate::debug_log;
use crate::error::{Result, SearchError};
use crate::form_data::{FormData, FormValue};

/// [`Fetcher`] for non-browser targets (server-side rendering, tools, tests
/// against a live backend).
///
/// Relative URLs are resolved against `base_url` when one is configured.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
	client: reqwest::Client,
	base_url: Option<String>,
}

impl HttpFetcher {
	/// Creates a fetcher with a default client.
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses an existing client (connection pool, TLS config, default headers).
	pub fn with_client(client: reqwest::Client) -> Self {
		Self {
			client,
			base_url: None,
		}
	}

	/// Resolves relative action URLs against `base_url`.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());
		self
	}

	fn resolve_url(&self, url: &str) -> String {
		match &self.base_url {
			Some(base) if !url.contains("://") => format!(
				"{}/{}",
				base.trim_end_matches('/'),
				url.trim_start_matches("./").trim_start_matches('/')
			),
			_ => url.to_string(),
		}
	}
}

fn multipart_form(data: &FormData) -> Result<Form> {
	let mut form = Form::new();
	for (name, value) in data.entries() {
		form = match value {
			FormValue::Text(text) => form.text(name.to_string(), text.clone()),
			FormValue::File(file) => {
				let mut part = Part::bytes(file.contents.clone()).file_name(file.filename.clone());
				if let Some(content_type) = &file.content_type {
					part = part
						.mime_str(content_type)
						.map_err(|err| SearchError::serialization(err.to_string()))?;
				}
				form.part(name.to_string(), part)
			}
		};
	}
	Ok(form)
}

#[async_trait(?Send)]
impl Fetcher for HttpFetcher {
	async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
		let method = reqwest::Method::from_bytes(request.method.as_bytes())
			.map_err(|err| SearchError::network(format!("invalid method: {}", err)))?;
		let url = self.resolve_url(&request.url);

		if !request.options.is_empty() {
			debug_log!("ignoring browser-only fetch options for {}", url);
		}

		let mut builder = self.client.request(method, &url);
		for (name, value) in &request.headers {
			builder = builder.header(name, value);
		}
		builder = match request.body {
			Some(RequestBody::Multipart(data)) => builder.multipart(multipart_form(&data)?),
			Some(RequestBody::UrlEncoded(body))
			| Some(RequestBody::Json(body))
			| Some(RequestBody::Text(body)) => builder.body(body),
			None => builder,
		};

		let response = builder
			.send()
			.await
			.map_err(|err| SearchError::network(err.to_string()))?;

		let mut fetched = FetchResponse::new(response.status().as_u16());
		for (name, value) in response.headers() {
			if let Ok(value) = value.to_str() {
				fetched = fetched.with_header(name.as_str(), value);
			}
		}
		let body = response
			.bytes()
			.await
			.map_err(|err| SearchError::network(err.to_string()))?;

		Ok(fetched.with_body(body.to_vec()))
	}
}
