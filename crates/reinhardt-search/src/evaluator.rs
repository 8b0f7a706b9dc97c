//! Expression evaluation for `action` and `target`
//!
//! When `action` is not a URL, and whenever `target` is set, the attribute
//! text is handed to an injected [`Evaluator`] together with a [`Scope`]:
//!
//! - `context`: the serialized submit context (`value`, `previousValue`,
//!   `formData`, `method`, ..., and `items` for the target step)
//! - `binding`: the name / value pair the expression is expected to publish,
//!   `(<identifier>, value)` for the action and `(<identifier>Items, items)`
//!   for the target
//! - `store`: the [`GlobalStore`] the widget publishes into
//! - `host`: the custom element itself, when mounted
//!
//! Returning `Ok(None)` means "no result" (JavaScript `undefined`); for the
//! target step that keeps the action's items.

mod registry;

#[cfg(target_arch = "wasm32")]
mod js;

#[cfg(target_arch = "wasm32")]
pub use js::JsEvaluator;
pub use registry::FunctionRegistry;

use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dom::Element;
use crate::error::Result;
use crate::store::GlobalStore;

/// Everything an expression can see.
#[derive(Clone)]
pub struct Scope {
	context: Value,
	identifier: String,
	binding: (String, Value),
	store: GlobalStore,
	host: Option<Rc<dyn Element>>,
}

impl Scope {
	/// Creates a scope over a serialized submit context.
	pub fn new(
		context: Value,
		identifier: impl Into<String>,
		binding: (String, Value),
		store: GlobalStore,
	) -> Self {
		Self {
			context,
			identifier: identifier.into(),
			binding,
			store,
			host: None,
		}
	}

	/// Attaches the host element.
	pub fn with_host(mut self, host: Option<Rc<dyn Element>>) -> Self {
		self.host = host;
		self
	}

	/// The whole context object.
	pub fn context(&self) -> &Value {
		&self.context
	}

	/// A top-level context field.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.context.get(key)
	}

	/// The submitted `value` field.
	pub fn value(&self) -> Option<&str> {
		self.get("value").and_then(Value::as_str)
	}

	/// The action's items; only present in the target step.
	pub fn items(&self) -> Option<&Value> {
		self.get("items")
	}

	/// The widget's identifier (`id`, else `name`, else `search`).
	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	pub fn binding_name(&self) -> &str {
		&self.binding.0
	}

	pub fn binding_value(&self) -> &Value {
		&self.binding.1
	}

	pub fn store(&self) -> &GlobalStore {
		&self.store
	}

	/// The custom element the expression runs for.
	pub fn host(&self) -> Option<&dyn Element> {
		self.host.as_deref()
	}
}

impl std::fmt::Debug for Scope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Scope")
			.field("context", &self.context)
			.field("identifier", &self.identifier)
			.field("binding", &self.binding)
			.field("host", &self.host.is_some())
			.finish_non_exhaustive()
	}
}

/// Runs `action` / `target` expression bodies.
///
/// Implementations decide the grammar; the widget only needs a value back.
#[async_trait(?Send)]
pub trait Evaluator {
	/// Evaluates `body` against `scope`.
	async fn evaluate(&self, body: &str, scope: &Scope) -> Result<Option<Value>>;
}
