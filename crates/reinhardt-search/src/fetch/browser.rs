//! Browser fetcher on top of `window.fetch`.

use async_trait::async_trait;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

use super::{FetchRequest, FetchResponse, Fetcher, RequestBody};
use crate::attributes::FetchOptions;
use crate::error::{Result, SearchError};
use crate::form_data::{FormData, FormValue};
use crate::web::js_error;

/// [`Fetcher`] using the page's `fetch`, so cookies, CORS and service workers
/// behave exactly as for native form submissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserFetcher;

impl BrowserFetcher {
	/// Creates the fetcher.
	pub fn new() -> Self {
		Self
	}
}

fn set_option(init: &RequestInit, key: &str, value: &JsValue) -> Result<()> {
	Reflect::set(init, &JsValue::from_str(key), value)
		.map(|_| ())
		.map_err(|err| SearchError::network(js_error(&err)))
}

fn apply_options(init: &RequestInit, options: &FetchOptions) -> Result<()> {
	let strings = [
		("mode", &options.mode),
		("credentials", &options.credentials),
		("cache", &options.cache),
		("redirect", &options.redirect),
		("referrer", &options.referrer),
		("referrerPolicy", &options.referrer_policy),
		("integrity", &options.integrity),
		("priority", &options.priority),
	];
	for (key, value) in strings {
		if let Some(value) = value {
			set_option(init, key, &JsValue::from_str(value))?;
		}
	}
	if let Some(keepalive) = options.keepalive {
		set_option(init, "keepalive", &JsValue::from_bool(keepalive))?;
	}
	Ok(())
}

fn multipart_body(data: &FormData) -> Result<web_sys::FormData> {
	let form_data = web_sys::FormData::new().map_err(|err| SearchError::dom(js_error(&err)))?;
	for (name, value) in data.entries() {
		let appended = match value {
			FormValue::Text(text) => form_data.append_with_str(name, text),
			FormValue::File(file) => match &file.blob {
				Some(blob) => form_data.append_with_blob_and_filename(name, blob, &file.filename),
				None => {
					let bytes = Uint8Array::from(file.contents.as_slice());
					let parts = js_sys::Array::of1(&bytes);
					let blob = web_sys::Blob::new_with_u8_array_sequence(&parts)
						.map_err(|err| SearchError::dom(js_error(&err)))?;
					form_data.append_with_blob_and_filename(name, &blob, &file.filename)
				}
			},
		};
		appended.map_err(|err| SearchError::dom(js_error(&err)))?;
	}
	Ok(form_data)
}

#[async_trait(?Send)]
impl Fetcher for BrowserFetcher {
	async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
		let init = RequestInit::new();
		init.set_method(&request.method);
		apply_options(&init, &request.options)?;

		let headers = Headers::new().map_err(|err| SearchError::network(js_error(&err)))?;
		for (name, value) in &request.headers {
			headers
				.append(name, value)
				.map_err(|err| SearchError::network(js_error(&err)))?;
		}
		init.set_headers(&headers);

		match &request.body {
			Some(RequestBody::Multipart(data)) => init.set_body(&multipart_body(data)?),
			Some(RequestBody::UrlEncoded(body))
			| Some(RequestBody::Json(body))
			| Some(RequestBody::Text(body)) => init.set_body(&JsValue::from_str(body)),
			None => {}
		}

		let js_request = Request::new_with_str_and_init(&request.url, &init)
			.map_err(|err| SearchError::network(js_error(&err)))?;
		let window = web_sys::window().ok_or_else(|| SearchError::dom("no window"))?;

		let response: Response = JsFuture::from(window.fetch_with_request(&js_request))
			.await
			.map_err(|err| SearchError::network(js_error(&err)))?
			.dyn_into()
			.map_err(|err| SearchError::network(js_error(&err)))?;

		let mut fetched = FetchResponse::new(response.status());
		if let Ok(Some(content_type)) = response.headers().get("content-type") {
			fetched = fetched.with_header("content-type", content_type);
		}

		let buffer = response
			.array_buffer()
			.map_err(|err| SearchError::network(js_error(&err)))?;
		let buffer = JsFuture::from(buffer)
			.await
			.map_err(|err| SearchError::network(js_error(&err)))?;

		Ok(fetched.with_body(Uint8Array::new(&buffer).to_vec()))
	}
}
