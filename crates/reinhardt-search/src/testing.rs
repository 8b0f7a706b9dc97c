//! In-memory doubles for testing widgets without a browser
//!
//! Every mock is a cheap handle over shared state: keep a clone in the test,
//! hand another to the widget, and inspect the recorded calls afterwards.
//!
//! ```ignore
//! use reinhardt_search::testing::{MockField, MockForm, MockHost, services};
//!
//! let (services, fetcher, _evaluator, timer) = services();
//! let widget = SearchWidget::new(services);
//! let host = MockHost::new()
//!     .with_form(MockForm::new())
//!     .with_search_field(MockField::text("value", ""));
//! widget.mount(Rc::new(host.clone())).await?;
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::attributes::AttributeMap;
use crate::callback::Callback;
use crate::debounce::Timer;
use crate::dom::{Element, FieldElement, FormElement, Host};
use crate::error::{Result, SearchError};
use crate::evaluator::{Evaluator, Scope};
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};
use crate::form_data::{FormData, FormValue};
use crate::store::GlobalStore;
use crate::widget::WidgetServices;

/// Fresh services over mocks and a private store.
///
/// The fetcher answers `200 []` and the evaluator yields no result until
/// configured.
pub fn services() -> (WidgetServices, MockFetcher, MockEvaluator, ManualTimer) {
	let fetcher = MockFetcher::json(&Value::Array(Vec::new()));
	let evaluator = MockEvaluator::new();
	let timer = ManualTimer::new();
	let services = WidgetServices::new(
		Rc::new(fetcher.clone()),
		Rc::new(evaluator.clone()),
		Rc::new(timer.clone()),
	)
	.with_store(GlobalStore::new());
	(services, fetcher, evaluator, timer)
}

/// An element with attributes only, e.g. a submit button.
#[derive(Debug, Clone, Default)]
pub struct MockElement {
	attributes: Rc<RefCell<AttributeMap>>,
}

impl MockElement {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style [`set_attribute`](Self::set_attribute).
	pub fn with_attribute(self, name: &str, value: &str) -> Self {
		self.set_attribute(name, value);
		self
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		self.attributes.borrow_mut().set(name, value);
	}

	pub fn remove_attribute(&self, name: &str) {
		self.attributes.borrow_mut().remove(name);
	}

	/// Current attribute value.
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.attributes.borrow().get(name).map(str::to_owned)
	}
}

impl Element for MockElement {
	fn get_attribute(&self, name: &str) -> Option<String> {
		self.attribute(name)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// An input-like control.
#[derive(Debug, Clone)]
pub struct MockField {
	element: MockElement,
	value: Rc<RefCell<FormValue>>,
}

impl MockField {
	/// A text control named `name` (empty for an unnamed control).
	pub fn text(name: &str, value: &str) -> Self {
		Self::with_value(name, FormValue::from(value))
	}

	/// A file input with one selected file.
	pub fn file(name: &str, file: crate::form_data::FormFile) -> Self {
		Self::with_value(name, FormValue::File(file))
	}

	fn with_value(name: &str, value: FormValue) -> Self {
		Self {
			element: MockElement::new().with_attribute("name", name),
			value: Rc::new(RefCell::new(value)),
		}
	}

	pub fn with_attribute(self, name: &str, value: &str) -> Self {
		self.element.set_attribute(name, value);
		self
	}

	/// Simulates the user typing: replaces the value without notifying anyone.
	pub fn type_text(&self, value: &str) {
		*self.value.borrow_mut() = FormValue::from(value);
	}
}

impl Element for MockField {
	fn get_attribute(&self, name: &str) -> Option<String> {
		self.element.attribute(name)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

impl FieldElement for MockField {
	fn value(&self) -> FormValue {
		self.value.borrow().clone()
	}

	fn set_value(&self, value: &str) {
		*self.value.borrow_mut() = FormValue::from(value);
	}
}

#[derive(Default)]
struct FormState {
	valid: Cell<bool>,
	form_data: RefCell<FormData>,
	submit_requests: RefCell<Vec<bool>>,
	reset_count: Cell<usize>,
	submit_count: Cell<usize>,
	on_request_submit: RefCell<Option<Callback<bool>>>,
	on_reset: RefCell<Option<Callback<()>>>,
}

/// The internal `<form>`. Valid by default; records every delegated call.
#[derive(Clone)]
pub struct MockForm {
	element: MockElement,
	state: Rc<FormState>,
}

impl Default for MockForm {
	fn default() -> Self {
		let form = Self {
			element: MockElement::new(),
			state: Rc::new(FormState::default()),
		};
		form.state.valid.set(true);
		form
	}
}

impl MockForm {
	pub fn new() -> Self {
		Self::default()
	}

	/// Entries returned as the native form data set.
	pub fn with_form_data<N, V>(self, entries: impl IntoIterator<Item = (N, V)>) -> Self
	where
		N: Into<String>,
		V: Into<FormValue>,
	{
		*self.state.form_data.borrow_mut() = entries.into_iter().collect();
		self
	}

	/// Makes `report_validity` fail, like a required field left empty.
	pub fn set_valid(&self, valid: bool) {
		self.state.valid.set(valid);
	}

	/// Runs `callback` on every `request_submit`, with whether a submitter
	/// was passed. Stands in for the browser firing `submit`.
	pub fn on_request_submit(&self, callback: impl Into<Callback<bool>>) {
		*self.state.on_request_submit.borrow_mut() = Some(callback.into());
	}

	/// Runs `callback` on every `reset`, standing in for the native event.
	pub fn on_reset(&self, callback: impl Into<Callback<()>>) {
		*self.state.on_reset.borrow_mut() = Some(callback.into());
	}

	/// Current attribute value.
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.element.attribute(name)
	}

	/// One entry per `request_submit`: whether a submitter was passed.
	pub fn submit_requests(&self) -> Vec<bool> {
		self.state.submit_requests.borrow().clone()
	}

	pub fn reset_count(&self) -> usize {
		self.state.reset_count.get()
	}

	pub fn submit_count(&self) -> usize {
		self.state.submit_count.get()
	}
}

impl std::fmt::Debug for MockForm {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MockForm")
			.field("element", &self.element)
			.field("valid", &self.state.valid.get())
			.field("submit_requests", &self.state.submit_requests.borrow())
			.finish_non_exhaustive()
	}
}

impl Element for MockForm {
	fn get_attribute(&self, name: &str) -> Option<String> {
		self.element.attribute(name)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

impl FormElement for MockForm {
	fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
		self.element.set_attribute(name, value);
		Ok(())
	}

	fn remove_attribute(&self, name: &str) -> Result<()> {
		self.element.remove_attribute(name);
		Ok(())
	}

	fn report_validity(&self) -> bool {
		self.state.valid.get()
	}

	fn request_submit(&self, submitter: Option<&dyn Element>) -> Result<()> {
		let with_submitter = submitter.is_some();
		self.state
			.submit_requests
			.borrow_mut()
			.push(with_submitter);
		let callback = self.state.on_request_submit.borrow().clone();
		if let Some(callback) = callback {
			callback.call(with_submitter);
		}
		Ok(())
	}

	fn reset(&self) {
		self.state
			.reset_count
			.set(self.state.reset_count.get() + 1);
		let callback = self.state.on_reset.borrow().clone();
		if let Some(callback) = callback {
			callback.call(());
		}
	}

	fn submit(&self) -> Result<()> {
		self.state
			.submit_count
			.set(self.state.submit_count.get() + 1);
		Ok(())
	}

	fn form_data(&self, _submitter: Option<&dyn Element>) -> Result<FormData> {
		Ok(self.state.form_data.borrow().clone())
	}
}

/// The widget's surroundings.
///
/// The search field also counts as one of [`fields`](Host::fields).
#[derive(Debug, Clone, Default)]
pub struct MockHost {
	element: MockElement,
	form: Option<MockForm>,
	search_field: Option<MockField>,
	fields: Vec<MockField>,
	submit_button: Option<MockElement>,
}

impl MockHost {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_form(mut self, form: MockForm) -> Self {
		self.form = Some(form);
		self
	}

	/// Sets an attribute on the host element itself.
	pub fn with_host_attribute(self, name: &str, value: &str) -> Self {
		self.element.set_attribute(name, value);
		self
	}

	/// Sets the bound `input[name="value"]`.
	pub fn with_search_field(mut self, field: MockField) -> Self {
		self.fields.insert(0, field.clone());
		self.search_field = Some(field);
		self
	}

	pub fn with_field(mut self, field: MockField) -> Self {
		self.fields.push(field);
		self
	}

	pub fn with_submit_button(mut self, button: MockElement) -> Self {
		self.submit_button = Some(button);
		self
	}

	/// The form, for inspection.
	pub fn form_handle(&self) -> Option<MockForm> {
		self.form.clone()
	}

	/// The search field, for simulating typing.
	pub fn search_field_handle(&self) -> Option<MockField> {
		self.search_field.clone()
	}

	/// The search field's current text.
	pub fn search_field_value(&self) -> Option<String> {
		self.search_field
			.as_ref()
			.map(|field| field.text_value())
	}
}

impl Host for MockHost {
	fn form(&self) -> Option<Rc<dyn FormElement>> {
		self.form
			.clone()
			.map(|form| Rc::new(form) as Rc<dyn FormElement>)
	}

	fn search_field(&self) -> Option<Rc<dyn FieldElement>> {
		self.search_field
			.clone()
			.map(|field| Rc::new(field) as Rc<dyn FieldElement>)
	}

	fn fields(&self) -> Vec<Rc<dyn FieldElement>> {
		self.fields
			.iter()
			.cloned()
			.map(|field| Rc::new(field) as Rc<dyn FieldElement>)
			.collect()
	}

	fn submit_button(&self) -> Option<Rc<dyn Element>> {
		self.submit_button
			.clone()
			.map(|button| Rc::new(button) as Rc<dyn Element>)
	}

	fn element(&self) -> Option<Rc<dyn Element>> {
		Some(Rc::new(self.element.clone()))
	}
}

enum MockReply {
	Response(FetchResponse),
	Failure(String),
}

/// A [`Fetcher`] replaying one canned reply and recording requests.
#[derive(Clone)]
pub struct MockFetcher {
	reply: Rc<RefCell<MockReply>>,
	requests: Rc<RefCell<Vec<FetchRequest>>>,
}

impl MockFetcher {
	/// Answers every request with `response`.
	pub fn with_response(response: FetchResponse) -> Self {
		Self {
			reply: Rc::new(RefCell::new(MockReply::Response(response))),
			requests: Rc::new(RefCell::new(Vec::new())),
		}
	}

	/// Answers `200 OK` with `value` as `application/json`.
	pub fn json(value: &Value) -> Self {
		Self::with_response(FetchResponse::json(value))
	}

	/// Fails every request with a network error.
	pub fn failing(message: &str) -> Self {
		let fetcher = Self::with_response(FetchResponse::default());
		fetcher.fail(message);
		fetcher
	}

	/// Replaces the reply for later requests.
	pub fn respond(&self, response: FetchResponse) {
		*self.reply.borrow_mut() = MockReply::Response(response);
	}

	/// Makes later requests fail.
	pub fn fail(&self, message: &str) {
		*self.reply.borrow_mut() = MockReply::Failure(message.to_string());
	}

	/// Every request received, oldest first.
	pub fn requests(&self) -> Vec<FetchRequest> {
		self.requests.borrow().clone()
	}

	pub fn call_count(&self) -> usize {
		self.requests.borrow().len()
	}
}

impl std::fmt::Debug for MockFetcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MockFetcher")
			.field("call_count", &self.call_count())
			.finish_non_exhaustive()
	}
}

#[async_trait(?Send)]
impl Fetcher for MockFetcher {
	async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
		self.requests.borrow_mut().push(request);
		match &*self.reply.borrow() {
			MockReply::Response(response) => Ok(response.clone()),
			MockReply::Failure(message) => Err(SearchError::network(message.clone())),
		}
	}
}

/// An [`Evaluator`] with canned results per body.
///
/// Unconfigured bodies yield `Ok(None)`.
#[derive(Clone, Default)]
pub struct MockEvaluator {
	results: Rc<RefCell<HashMap<String, Result<Option<Value>>>>>,
	calls: Rc<RefCell<Vec<(String, Scope)>>>,
}

impl MockEvaluator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `body` evaluate to `result`.
	pub fn returns(&self, body: &str, result: Option<Value>) -> &Self {
		self.results
			.borrow_mut()
			.insert(body.to_string(), Ok(result));
		self
	}

	/// Makes `body` fail with an evaluation error.
	pub fn fails(&self, body: &str, message: &str) -> &Self {
		self.results
			.borrow_mut()
			.insert(body.to_string(), Err(SearchError::evaluation(message)));
		self
	}

	/// Every evaluation, oldest first.
	pub fn calls(&self) -> Vec<(String, Scope)> {
		self.calls.borrow().clone()
	}

	pub fn call_count(&self) -> usize {
		self.calls.borrow().len()
	}
}

impl std::fmt::Debug for MockEvaluator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MockEvaluator")
			.field("call_count", &self.call_count())
			.finish_non_exhaustive()
	}
}

#[async_trait(?Send)]
impl Evaluator for MockEvaluator {
	async fn evaluate(&self, body: &str, scope: &Scope) -> Result<Option<Value>> {
		self.calls
			.borrow_mut()
			.push((body.to_string(), scope.clone()));
		self.results
			.borrow()
			.get(body)
			.cloned()
			.unwrap_or(Ok(None))
	}
}

struct PendingTimeout {
	due: Duration,
	sequence: u64,
	callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Clock {
	now: Cell<Duration>,
	next_sequence: Cell<u64>,
	pending: RefCell<Vec<PendingTimeout>>,
}

/// A [`Timer`] on a virtual clock that only moves on [`advance`](Self::advance).
#[derive(Clone, Default)]
pub struct ManualTimer {
	clock: Rc<Clock>,
}

impl ManualTimer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Virtual time elapsed so far.
	pub fn now(&self) -> Duration {
		self.clock.now.get()
	}

	/// Timeouts not yet fired.
	pub fn pending(&self) -> usize {
		self.clock.pending.borrow().len()
	}

	/// Moves the clock forward, firing due timeouts in order. Timeouts
	/// scheduled by a callback fire too if they fall within the window.
	pub fn advance(&self, by: Duration) {
		let until = self.clock.now.get() + by;
		loop {
			let next = {
				let mut pending = self.clock.pending.borrow_mut();
				let due = pending
					.iter()
					.enumerate()
					.filter(|(_, timeout)| timeout.due <= until)
					.min_by_key(|(_, timeout)| (timeout.due, timeout.sequence))
					.map(|(index, _)| index);
				due.map(|index| pending.remove(index))
			};
			let Some(timeout) = next else {
				break;
			};
			self.clock.now.set(timeout.due);
			(timeout.callback)();
		}
		self.clock.now.set(until);
	}
}

impl Timer for ManualTimer {
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
		let sequence = self.clock.next_sequence.get();
		self.clock.next_sequence.set(sequence + 1);
		self.clock.pending.borrow_mut().push(PendingTimeout {
			due: self.clock.now.get() + delay,
			sequence,
			callback,
		});
	}
}

impl std::fmt::Debug for ManualTimer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ManualTimer")
			.field("now", &self.now())
			.field("pending", &self.pending())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_manual_timer_fires_in_due_order() {
		let timer = ManualTimer::new();
		let order = Rc::new(RefCell::new(Vec::new()));
		for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
			let order = Rc::clone(&order);
			timer.set_timeout(
				Duration::from_millis(delay),
				Box::new(move || order.borrow_mut().push(label)),
			);
		}

		timer.advance(Duration::from_millis(25));
		assert_eq!(*order.borrow(), vec!["a", "b"]);
		assert_eq!(timer.pending(), 1);
		assert_eq!(timer.now(), Duration::from_millis(25));
	}

	#[rstest]
	fn test_manual_timer_runs_nested_timeouts() {
		let timer = ManualTimer::new();
		let fired = Rc::new(Cell::new(false));
		timer.set_timeout(Duration::from_millis(5), {
			let timer = timer.clone();
			let fired = Rc::clone(&fired);
			Box::new(move || {
				timer.set_timeout(
					Duration::from_millis(5),
					Box::new(move || fired.set(true)),
				);
			})
		});

		timer.advance(Duration::from_millis(10));

		assert!(fired.get());
	}

	#[rstest]
	fn test_mock_form_records_calls() {
		let form = MockForm::new();
		let hooked = Rc::new(Cell::new(0));
		form.on_request_submit({
			let hooked = Rc::clone(&hooked);
			move |_: bool| hooked.set(hooked.get() + 1)
		});

		form.request_submit(Some(&MockElement::new())).unwrap();
		form.request_submit(None).unwrap();

		assert_eq!(form.submit_requests(), vec![true, false]);
		assert_eq!(hooked.get(), 2);
		assert!(form.report_validity());
	}

	#[rstest]
	fn test_mock_host_lists_search_field_first() {
		let host = MockHost::new()
			.with_field(MockField::text("page", "1"))
			.with_search_field(MockField::text("value", "q"));

		let names: Vec<_> = host.fields().iter().filter_map(|f| f.name()).collect();
		assert_eq!(names, vec!["value", "page"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_mock_fetcher_records_and_fails() {
		let fetcher = MockFetcher::json(&json!([1]));
		let request = FetchRequest {
			url: "/api".to_string(),
			method: "GET".to_string(),
			headers: Vec::new(),
			body: None,
			options: Default::default(),
		};

		let response = fetcher.fetch(request.clone()).await.unwrap();
		assert_eq!(response.json_body().unwrap(), json!([1]));

		fetcher.fail("offline");
		assert_eq!(
			fetcher.fetch(request).await,
			Err(SearchError::network("offline"))
		);
		assert_eq!(fetcher.call_count(), 2);
	}
}
