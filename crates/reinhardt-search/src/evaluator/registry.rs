//! Named Rust functions as expressions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use futures_util::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;

use super::{Evaluator, Scope};
use crate::error::{Result, SearchError};

type Function = Rc<dyn Fn(Scope) -> LocalBoxFuture<'static, Result<Option<Value>>>>;

/// An [`Evaluator`] resolving expression bodies to registered functions.
///
/// The body names the function; a trailing argument list is ignored, so
/// `action="filterItems"` and `action="filterItems(value)"` both call
/// `filterItems` with the full [`Scope`].
///
/// ```ignore
/// let registry = FunctionRegistry::new();
/// registry.register("upper", |scope| {
///     Ok(scope.value().map(|v| json!(v.to_uppercase())))
/// });
/// ```
#[derive(Clone, Default)]
pub struct FunctionRegistry {
	functions: Rc<RefCell<HashMap<String, Function>>>,
}

impl FunctionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a synchronous function.
	pub fn register<F>(&self, name: &str, f: F) -> &Self
	where
		F: Fn(&Scope) -> Result<Option<Value>> + 'static,
	{
		let f = Rc::new(f);
		self.insert(
			name,
			Rc::new(move |scope: Scope| {
				let result = f(&scope);
				async move { result }.boxed_local()
			}),
		)
	}

	/// Registers an async function, e.g. one that queries a local index.
	pub fn register_async<F, Fut>(&self, name: &str, f: F) -> &Self
	where
		F: Fn(Scope) -> Fut + 'static,
		Fut: Future<Output = Result<Option<Value>>> + 'static,
	{
		self.insert(name, Rc::new(move |scope: Scope| f(scope).boxed_local()))
	}

	fn insert(&self, name: &str, function: Function) -> &Self {
		self.functions
			.borrow_mut()
			.insert(name.trim().to_string(), function);
		self
	}

	pub fn contains(&self, name: &str) -> bool {
		self.functions.borrow().contains_key(function_name(name))
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.functions.borrow().keys().cloned().collect();
		names.sort();
		names
	}
}

fn function_name(body: &str) -> &str {
	let body = body.trim();
	match body.find('(') {
		Some(open) => body[..open].trim_end(),
		None => body,
	}
}

#[async_trait(?Send)]
impl Evaluator for FunctionRegistry {
	async fn evaluate(&self, body: &str, scope: &Scope) -> Result<Option<Value>> {
		let name = function_name(body);
		// Release the borrow before awaiting so functions may register others.
		let function = self.functions.borrow().get(name).cloned();
		match function {
			Some(function) => function(scope.clone()).await,
			None => Err(SearchError::evaluation(format!(
				"no function registered as `{name}`"
			))),
		}
	}
}

impl std::fmt::Debug for FunctionRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FunctionRegistry")
			.field("names", &self.names())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::GlobalStore;
	use rstest::rstest;
	use serde_json::json;

	fn scope(value: &str) -> Scope {
		Scope::new(
			json!({ "value": value }),
			"search",
			("search".to_string(), json!(value)),
			GlobalStore::new(),
		)
	}

	#[rstest]
	#[case("upper", "upper")]
	#[case("  upper  ", "upper")]
	#[case("upper(value)", "upper")]
	#[case("upper (value, items)", "upper")]
	fn test_function_name(#[case] body: &str, #[case] expected: &str) {
		assert_eq!(function_name(body), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_sync_function() {
		let registry = FunctionRegistry::new();
		registry.register("upper", |scope| {
			Ok(scope.value().map(|value| json!(value.to_uppercase())))
		});

		let result = registry.evaluate("upper(value)", &scope("rust")).await;

		assert_eq!(result, Ok(Some(json!("RUST"))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_async_function() {
		let registry = FunctionRegistry::new();
		registry.register_async("lookup", |scope: Scope| async move {
			let value = scope.value().unwrap_or_default().to_string();
			Ok(Some(json!([value])))
		});

		let result = registry.evaluate("lookup", &scope("a")).await;

		assert_eq!(result, Ok(Some(json!(["a"]))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_function_is_evaluation_error() {
		let registry = FunctionRegistry::new();

		let result = registry.evaluate("missing(value)", &scope("a")).await;

		assert!(matches!(result, Err(SearchError::Evaluation(msg)) if msg.contains("missing")));
	}

	#[rstest]
	fn test_clones_share_functions() {
		let registry = FunctionRegistry::new();
		let clone = registry.clone();
		clone.register("noop", |_| Ok(None));

		assert!(registry.contains("noop()"));
		assert_eq!(registry.names(), vec!["noop".to_string()]);
	}
}
