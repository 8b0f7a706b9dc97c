//! Search Widget WASM Tests
//!
//! Mounts widgets on real DOM elements with mocked network and timers.
//!
//! **Run with**: `wasm-pack test --headless --chrome crates/reinhardt-search`

#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use gloo_timers::future::TimeoutFuture;
use reinhardt_search::testing::{ManualTimer, MockFetcher, services};
use reinhardt_search::web::{self, MountedWidget, WebElement};
use reinhardt_search::{
	Evaluator, FetchResponse, FormData, GlobalStore, JsEvaluator, Scope, SearchError,
	WidgetServices,
};
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;
use web_sys::{Event, HtmlElement, HtmlFormElement, HtmlInputElement};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
	web_sys::window().unwrap().document().unwrap()
}

/// Appends a host with `markup` inside and returns it.
fn host_with(markup: &str) -> HtmlElement {
	let host: HtmlElement = document()
		.create_element("div")
		.unwrap()
		.dyn_into()
		.unwrap();
	host.set_inner_html(markup);
	document().body().unwrap().append_child(&host).unwrap();
	host
}

fn query<T: JsCast>(host: &HtmlElement, selector: &str) -> T {
	host.query_selector(selector)
		.unwrap()
		.unwrap()
		.dyn_into()
		.unwrap()
}

/// Lets spawned futures and mutation observers run.
async fn settle() {
	TimeoutFuture::new(0).await;
}

fn cleanup(mounted: MountedWidget) {
	let host = mounted.host().clone();
	mounted.unmount();
	host.remove();
}

// ============================================================================
// Mounting
// ============================================================================

/// Mounting seeds `value` from the input and runs the initial submit
#[wasm_bindgen_test]
async fn test_mount_runs_initial_submit() {
	let (services, fetcher, _, _) = services();
	let host = host_with(r#"<form><input name="value" value="lamp"></form>"#);

	let mounted = web::mount(&host, services).unwrap();
	settle().await;

	assert_eq!(mounted.widget().value(), "lamp");
	assert_eq!(mounted.widget().items(), json!("lamp"));
	assert_eq!(fetcher.call_count(), 0);
	cleanup(mounted);
}

/// Host attributes present at mount time drive the first fetch
#[wasm_bindgen_test]
async fn test_mount_reads_host_attributes() {
	let (services, fetcher, _, _) = services();
	fetcher.respond(FetchResponse::json(&json!([1, 2, 3])));
	let host = host_with(r#"<form><input name="value" value="oak"></form>"#);
	host.set_attribute("action", "/api/items").unwrap();

	let mounted = web::mount(&host, services).unwrap();
	settle().await;

	assert_eq!(mounted.widget().items(), json!([1, 2, 3]));
	assert_eq!(fetcher.requests()[0].url, "/api/items?value=oak");
	cleanup(mounted);
}

// ============================================================================
// Live DOM wiring
// ============================================================================

/// Attribute changes on the host are observed and mirrored onto the form
#[wasm_bindgen_test]
async fn test_attribute_changes_mirror_to_form() {
	let (services, _, _, _) = services();
	let host = host_with(r#"<form><input name="value"></form>"#);
	let mounted = web::mount(&host, services).unwrap();
	settle().await;

	host.set_attribute("method", "post").unwrap();
	settle().await;

	let form: HtmlFormElement = query(&host, "form");
	assert_eq!(form.get_attribute("method").as_deref(), Some("post"));
	assert_eq!(mounted.widget().attribute("method").as_deref(), Some("post"));
	cleanup(mounted);
}

/// `input` events on the search field update `value`
#[wasm_bindgen_test]
async fn test_input_event_updates_value() {
	let (services, _, _, _) = services();
	let host = host_with(r#"<form><input name="value"></form>"#);
	let mounted = web::mount(&host, services).unwrap();
	settle().await;

	let input: HtmlInputElement = query(&host, r#"input[name="value"]"#);
	input.set_value("maple");
	input.dispatch_event(&Event::new("input").unwrap()).unwrap();

	assert_eq!(mounted.widget().value(), "maple");
	cleanup(mounted);
}

/// Cancelling the host's `submit` event stops the cycle
#[wasm_bindgen_test]
async fn test_host_submit_listener_can_cancel() {
	let (services, fetcher, _, _) = services();
	let host = host_with(r#"<form><input name="value" value="pine"></form>"#);
	host.set_attribute("action", "/api/items").unwrap();
	let mounted = web::mount(&host, services).unwrap();
	settle().await;
	let fetched = fetcher.call_count();

	let seen = Rc::new(Cell::new(false));
	let listener = Closure::wrap(Box::new({
		let seen = Rc::clone(&seen);
		move |event: Event| {
			seen.set(true);
			event.prevent_default();
		}
	}) as Box<dyn FnMut(Event)>);
	host.add_event_listener_with_callback("submit", listener.as_ref().unchecked_ref())
		.unwrap();

	let form: HtmlFormElement = query(&host, "form");
	form.request_submit().unwrap();
	settle().await;

	assert!(seen.get());
	assert_eq!(fetcher.call_count(), fetched);
	cleanup(mounted);
}

/// Auto-submit with a footer button slotted outside the form still submits
#[wasm_bindgen_test]
async fn test_autosubmit_with_footer_button() {
	let (services, fetcher, _, timer) = services();
	let host = host_with(
		r#"<form><input name="value" value="oak"></form>
		<div slot="footer"><button>Search</button></div>"#,
	);
	host.set_attribute("action", "/api/items").unwrap();
	host.set_attribute("autosubmit", "10").unwrap();
	let mounted = web::mount(&host, services).unwrap();
	settle().await;
	let fetched = fetcher.call_count();

	let input: HtmlInputElement = query(&host, r#"input[name="value"]"#);
	input.set_value("ash");
	input.dispatch_event(&Event::new("input").unwrap()).unwrap();
	timer.advance(Duration::from_millis(10));
	settle().await;

	assert_eq!(fetcher.call_count(), fetched + 1);
	assert_eq!(
		fetcher.requests().last().unwrap().url,
		"/api/items?value=ash"
	);
	assert_eq!(mounted.widget().value(), "ash");
	cleanup(mounted);
}

/// Building `FormData` from the form reaches `formdata` listeners
#[wasm_bindgen_test]
async fn test_formdata_event_reaches_listeners() {
	let (services, _, _, _) = services();
	let host = host_with(r#"<form><input name="value" value="elm"></form>"#);
	let mounted = web::mount(&host, services).unwrap();
	settle().await;

	let seen = Rc::new(RefCell::new(None));
	mounted.widget().on_form_data({
		let seen = Rc::clone(&seen);
		move |data: FormData| *seen.borrow_mut() = data.get_text("value").map(str::to_owned)
	});
	let form: HtmlFormElement = query(&host, "form");
	web_sys::FormData::new_with_form(&form).unwrap();

	assert_eq!(seen.borrow().as_deref(), Some("elm"));
	cleanup(mounted);
}

// ============================================================================
// JavaScript expressions
// ============================================================================

fn scope(context: Value) -> Scope {
	let value = context.get("value").cloned().unwrap_or(Value::Null);
	Scope::new(
		context,
		"search".to_string(),
		("search".to_string(), value),
		GlobalStore::new(),
	)
}

/// Context fields are bare names in the expression
#[wasm_bindgen_test]
async fn test_js_expression_sees_context() {
	let evaluator = JsEvaluator::new();

	let result = evaluator
		.evaluate("value.toUpperCase() + binding.name", &scope(json!({ "value": "oak" })))
		.await
		.unwrap();

	assert_eq!(result, Some(json!("OAKsearch")));
}

/// A returned promise is awaited
#[wasm_bindgen_test]
async fn test_js_promise_is_awaited() {
	let evaluator = JsEvaluator::new();

	let result = evaluator
		.evaluate("Promise.resolve([value, 2])", &scope(json!({ "value": 1 })))
		.await
		.unwrap();

	assert_eq!(result, Some(json!([1, 2])));
}

/// `undefined` is no result
#[wasm_bindgen_test]
async fn test_js_undefined_is_no_result() {
	let evaluator = JsEvaluator::new();

	let result = evaluator
		.evaluate("undefined", &scope(json!({ "value": "oak" })))
		.await
		.unwrap();

	assert_eq!(result, None);
}

/// Syntax errors and thrown errors are evaluation failures
#[wasm_bindgen_test]
async fn test_js_errors_are_evaluation_failures() {
	let evaluator = JsEvaluator::new();
	let scope = scope(json!({ "value": "oak" }));

	let syntax = evaluator.evaluate("value +", &scope).await;
	let thrown = evaluator.evaluate("missingName.length", &scope).await;

	assert!(matches!(syntax, Err(SearchError::Evaluation(_))));
	assert!(matches!(thrown, Err(SearchError::Evaluation(_))));
}

/// `this` is the host element, else the bound fallback
#[wasm_bindgen_test]
async fn test_js_this_is_host_element() {
	let element = document().create_element("div").unwrap();
	element.set_attribute("data-kind", "furniture").unwrap();
	let evaluator = JsEvaluator::new().with_this(JsValue::from_str("fallback"));
	let body = "this instanceof Element ? this.getAttribute('data-kind') : String(this)";

	let bound = scope(json!({})).with_host(Some(Rc::new(WebElement::new(element))));
	let unbound = scope(json!({}));

	assert_eq!(
		evaluator.evaluate(body, &bound).await.unwrap(),
		Some(json!("furniture"))
	);
	assert_eq!(
		evaluator.evaluate(body, &unbound).await.unwrap(),
		Some(json!("fallback"))
	);
}

/// A mounted widget runs an expression action and a mapping target
#[wasm_bindgen_test]
async fn test_widget_runs_js_action_and_target() {
	let fetcher = MockFetcher::json(&json!([]));
	let services = WidgetServices::new(
		Rc::new(fetcher.clone()),
		Rc::new(JsEvaluator::new()),
		Rc::new(ManualTimer::new()),
	)
	.with_store(GlobalStore::new());
	let host = host_with(r#"<form><input name="value" value="oak"></form>"#);
	host.set_attribute("data-limit", "1").unwrap();
	host.set_attribute("action", "[value, value + '!']").unwrap();
	host.set_attribute("target", "items.slice(0, Number(this.dataset.limit))")
		.unwrap();

	let mounted = web::mount(&host, services).unwrap();
	settle().await;

	assert_eq!(mounted.widget().items(), json!(["oak"]));
	assert_eq!(fetcher.call_count(), 0);
	cleanup(mounted);
}

/// A target yielding `undefined` keeps the action's items
#[wasm_bindgen_test]
async fn test_widget_js_target_without_result_keeps_items() {
	let services = WidgetServices::new(
		Rc::new(MockFetcher::json(&json!([]))),
		Rc::new(JsEvaluator::new()),
		Rc::new(ManualTimer::new()),
	)
	.with_store(GlobalStore::new());
	let host = host_with(r#"<form><input name="value" value="oak"></form>"#);
	host.set_attribute("action", "[value]").unwrap();
	host.set_attribute("target", "undefined").unwrap();

	let mounted = web::mount(&host, services).unwrap();
	settle().await;

	assert_eq!(mounted.widget().items(), json!(["oak"]));
	cleanup(mounted);
}

// ============================================================================
// Registration
// ============================================================================

/// A tag can be defined once
#[wasm_bindgen_test]
fn test_define_rejects_duplicate_tag() {
	let fresh = || services().0;

	web::define("reinhardt-search-wasm-test", fresh).unwrap();
	let again = web::define("reinhardt-search-wasm-test", fresh);

	assert!(again.is_err());
}
