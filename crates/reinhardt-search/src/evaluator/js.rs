//! JavaScript expressions in the browser.

use async_trait::async_trait;
use js_sys::{Array, Function, JSON, Object, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use super::{Evaluator, Scope};
use crate::error::{Result, SearchError};
use crate::web::{WebElement, js_error};

/// Evaluates bodies as JavaScript expressions.
///
/// The context fields are in scope as bare names (`value`, `items`,
/// `formData`, ...), `binding` is `{ name, value }`, and `this` is the
/// widget's host element (falling back to the value given to
/// [`with_this`](Self::with_this)). A returned promise is awaited;
/// `undefined` means no result.
///
/// ```html
/// <reinhardt-search action="value.length > 2 ? window.lookup(value) : []"
///                   target="items.slice(0, 10)">
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsEvaluator {
	this: Option<JsValue>,
}

impl JsEvaluator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `this` for scopes without a host element.
	pub fn with_this(mut self, this: impl Into<JsValue>) -> Self {
		self.this = Some(this.into());
		self
	}
}

fn to_js(value: &Value) -> Result<JsValue> {
	let text = serde_json::to_string(value)?;
	JSON::parse(&text).map_err(|err| SearchError::evaluation(js_error(&err)))
}

fn from_js(value: &JsValue) -> Result<Option<Value>> {
	if value.is_undefined() {
		return Ok(None);
	}
	let text = JSON::stringify(value)
		.map_err(|err| SearchError::evaluation(js_error(&err)))?
		.as_string()
		.ok_or_else(|| SearchError::evaluation("result is not JSON serializable"))?;
	Ok(Some(serde_json::from_str(&text)?))
}

/// `new Function(...)` through `Reflect` so syntax errors surface as `Err`.
fn compile(body: &str) -> Result<Function> {
	let constructor: Function = Reflect::get(&js_sys::global(), &JsValue::from_str("Function"))
		.map_err(|err| SearchError::evaluation(js_error(&err)))?
		.dyn_into()
		.map_err(|_| SearchError::evaluation("Function constructor unavailable"))?;
	let args = Array::of2(
		&JsValue::from_str("scope, binding"),
		&JsValue::from_str(&format!("with (scope) {{ return ({body}); }}")),
	);
	Reflect::construct(&constructor, &args)
		.map_err(|err| SearchError::evaluation(js_error(&err)))?
		.dyn_into()
		.map_err(|_| SearchError::evaluation("expression did not compile to a function"))
}

#[async_trait(?Send)]
impl Evaluator for JsEvaluator {
	async fn evaluate(&self, body: &str, scope: &Scope) -> Result<Option<Value>> {
		let function = compile(body)?;

		let context = to_js(scope.context())?;
		let binding = Object::new();
		Reflect::set(
			&binding,
			&JsValue::from_str("name"),
			&JsValue::from_str(scope.binding_name()),
		)
		.map_err(|err| SearchError::evaluation(js_error(&err)))?;
		Reflect::set(
			&binding,
			&JsValue::from_str("value"),
			&to_js(scope.binding_value())?,
		)
		.map_err(|err| SearchError::evaluation(js_error(&err)))?;

		let this = scope
			.host()
			.and_then(|host| host.as_any().downcast_ref::<WebElement>())
			.map(|host| JsValue::from(host.element().clone()))
			.or_else(|| self.this.clone())
			.unwrap_or(JsValue::UNDEFINED);
		let result = function
			.call2(&this, &context, &binding)
			.map_err(|err| SearchError::evaluation(js_error(&err)))?;

		let result = match result.dyn_into::<Promise>() {
			Ok(promise) => JsFuture::from(promise)
				.await
				.map_err(|err| SearchError::evaluation(js_error(&err)))?,
			Err(result) => result,
		};

		from_js(&result)
	}
}
