//! The search widget
//!
//! [`SearchWidget`] owns the reactive `value` / `items` pair, the host's
//! attributes, and the submit cycle (see [`submit`](self::submit)). It reaches
//! the DOM only through a [`Host`], so the same widget runs in the browser (via
//! [`web::mount`](crate::web)) and against mocks in native tests.
//!
//! ## Lifecycle
//!
//! ```text
//! new(services) ── attribute_changed(..)* ── mount(host) ──▶ initial submit
//!                                               │
//!      keyup/input ─▶ handle_search_input ──▶ debounce ──▶ request_submit
//!      form submit ─▶ handle_submit ──▶ Invalid | Cancelled | Committed
//! ```

mod submit;

pub use submit::SubmitOutcome;

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde_json::Value;

use crate::attributes::{AttributeMap, ObservedAttribute, parse_debounce};
use crate::callback::Callback;
use crate::debounce::{Debouncer, Timer};
use crate::dom::{Element, FormElement, Host};
use crate::error::{Result, SearchError};
use crate::evaluator::Evaluator;
use crate::event::{EventListeners, ListenerId, SubmitEvent};
use crate::fetch::{self, Fetcher};
use crate::form_data::FormData;
use crate::reactive::{Signal, Subscription};
use crate::store::GlobalStore;
use crate::{debug_log, warn_log};

/// Base of the identifier claimed when the host has neither `id` nor `name`.
pub const DEFAULT_IDENTIFIER: &str = "search";

/// Collaborators injected into a widget.
#[derive(Clone)]
pub struct WidgetServices {
	/// Performs URL actions
	pub fetcher: Rc<dyn Fetcher>,
	/// Runs expression actions and targets
	pub evaluator: Rc<dyn Evaluator>,
	/// Drives auto-submit debouncing
	pub timer: Rc<dyn Timer>,
	/// Where the default routes publish
	pub store: GlobalStore,
}

impl WidgetServices {
	/// Services publishing into the page-wide [`GlobalStore::global`].
	pub fn new(
		fetcher: Rc<dyn Fetcher>,
		evaluator: Rc<dyn Evaluator>,
		timer: Rc<dyn Timer>,
	) -> Self {
		Self {
			fetcher,
			evaluator,
			timer,
			store: GlobalStore::global(),
		}
	}

	/// Replaces the store.
	pub fn with_store(mut self, store: GlobalStore) -> Self {
		self.store = store;
		self
	}

	/// `window.fetch`, JavaScript expressions and `setTimeout`.
	#[cfg(target_arch = "wasm32")]
	pub fn browser() -> Self {
		Self::new(
			Rc::new(crate::fetch::BrowserFetcher::new()),
			Rc::new(crate::evaluator::JsEvaluator::new()),
			Rc::new(crate::debounce::BrowserTimer),
		)
	}
}

impl std::fmt::Debug for WidgetServices {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WidgetServices")
			.field("store", &self.store)
			.finish_non_exhaustive()
	}
}

/// The store entry the last result was routed through.
struct ItemsBinding {
	key: String,
	_subscription: Subscription,
}

pub(crate) struct WidgetInner {
	attributes: RefCell<AttributeMap>,
	value: Signal<String>,
	items: Signal<Value>,
	current_value: RefCell<String>,
	current_items: RefCell<Option<ItemsBinding>>,
	host: RefCell<Option<Rc<dyn Host>>>,
	listeners: EventListeners,
	services: WidgetServices,
	debouncer: Debouncer,
	/// Set while the widget writes to the store itself.
	publishing: Cell<bool>,
	/// Claimed from the store on first use when there is no `id` or `name`.
	default_identifier: OnceCell<String>,
}

impl WidgetInner {
	/// Setter side effects of `value`.
	fn sync_value(&self, value: &str) {
		*self.current_value.borrow_mut() = value.to_string();

		let field = self
			.host
			.borrow()
			.as_ref()
			.and_then(|host| host.search_field());
		if let Some(field) = field
			&& field.text_value() != value
		{
			field.set_value(value);
		}

		let id = self
			.attributes
			.borrow()
			.non_empty("id")
			.map(str::to_owned);
		if let Some(id) = id {
			self.publish(&id, Value::String(value.to_string()));
		}
	}

	/// Writes into the store without waking the widget's own subscription.
	fn publish(&self, key: &str, value: Value) -> bool {
		let previous = self.publishing.replace(true);
		let written = self.services.store.set(key, value);
		self.publishing.set(previous);
		written
	}
}

impl Drop for WidgetInner {
	fn drop(&mut self) {
		if let Some(identifier) = self.default_identifier.get() {
			self.services.store.release_identifier(identifier);
		}
	}
}

/// A search form custom element.
///
/// Cloning yields another handle to the same widget.
#[derive(Clone)]
pub struct SearchWidget {
	inner: Rc<WidgetInner>,
}

impl SearchWidget {
	/// Creates an unmounted widget with empty `value` and `[]` items.
	pub fn new(services: WidgetServices) -> Self {
		let inner = Rc::new_cyclic(|weak: &Weak<WidgetInner>| {
			let weak = weak.clone();
			let debouncer = Debouncer::new(Rc::clone(&services.timer));
			WidgetInner {
				attributes: RefCell::new(AttributeMap::new()),
				value: Signal::with_setter(String::new(), move |value: String| {
					if let Some(inner) = weak.upgrade() {
						inner.sync_value(&value);
					}
					value
				}),
				items: Signal::new(Value::Array(Vec::new())),
				current_value: RefCell::new(String::new()),
				current_items: RefCell::new(None),
				host: RefCell::new(None),
				listeners: EventListeners::new(),
				services,
				debouncer,
				publishing: Cell::new(false),
				default_identifier: OnceCell::new(),
			}
		});
		Self { inner }
	}

	pub(crate) fn downgrade(&self) -> Weak<WidgetInner> {
		Rc::downgrade(&self.inner)
	}

	pub(crate) fn upgrade(weak: &Weak<WidgetInner>) -> Option<Self> {
		weak.upgrade().map(|inner| Self { inner })
	}

	// Properties

	/// Current `value`.
	pub fn value(&self) -> String {
		self.inner.value.get()
	}

	/// Writes `value`, syncing the bound input and the store entry under `id`.
	pub fn set_value(&self, value: impl Into<String>) {
		self.inner.value.set(value.into());
	}

	/// The `value` signal, for subscribing.
	pub fn value_signal(&self) -> Signal<String> {
		self.inner.value.clone()
	}

	/// Last committed items.
	pub fn items(&self) -> Value {
		self.inner.items.get()
	}

	pub fn set_items(&self, items: Value) {
		self.inner.items.set(items);
	}

	/// The `items` signal, for subscribing.
	pub fn items_signal(&self) -> Signal<Value> {
		self.inner.items.clone()
	}

	/// Last value observed in the search input.
	pub fn current_value(&self) -> String {
		self.inner.current_value.borrow().clone()
	}

	/// The store entry the widget currently follows, if any.
	pub fn current_items_key(&self) -> Option<String> {
		self.inner
			.current_items
			.borrow()
			.as_ref()
			.map(|binding| binding.key.clone())
	}

	pub fn store(&self) -> &GlobalStore {
		&self.inner.services.store
	}

	// Attributes

	/// Raw attribute value.
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.inner
			.attributes
			.borrow()
			.get(name)
			.map(str::to_owned)
	}

	/// Snapshot of every attribute.
	pub fn attributes(&self) -> AttributeMap {
		self.inner.attributes.borrow().clone()
	}

	/// Records an attribute change and runs its update from the
	/// [`ObservedAttribute`] table. `None` means the attribute was removed.
	pub fn attribute_changed(&self, name: &str, value: Option<&str>) {
		{
			let mut attributes = self.inner.attributes.borrow_mut();
			match value {
				Some(value) => attributes.set(name, value),
				None => attributes.remove(name),
			};
		}

		let Some(observed) = ObservedAttribute::from_name(name) else {
			return;
		};
		match observed.form_attribute() {
			None => self.set_value(value.unwrap_or_default()),
			Some(form_attribute) => self.mirror(form_attribute, observed.mirrored_value(value)),
		}
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		self.attribute_changed(name, Some(value));
	}

	pub fn remove_attribute(&self, name: &str) {
		self.attribute_changed(name, None);
	}

	fn mirror(&self, name: &str, value: Option<String>) {
		let Some(form) = self.form() else {
			return;
		};
		let mirrored = match value {
			Some(value) => form.set_attribute(name, &value),
			None => form.remove_attribute(name),
		};
		if let Err(err) = mirrored {
			warn_log!("failed to mirror `{}` onto the form: {}", name, err);
		}
	}

	/// `id`, else `name`, else an identifier claimed from the store:
	/// [`DEFAULT_IDENTIFIER`] for the first such widget, then `search2`, ...
	pub fn identifier(&self) -> String {
		let attributes = self.inner.attributes.borrow();
		if let Some(identifier) = attributes
			.non_empty("id")
			.or_else(|| attributes.non_empty("name"))
		{
			return identifier.to_string();
		}
		self.inner
			.default_identifier
			.get_or_init(|| self.inner.services.store.claim_identifier(DEFAULT_IDENTIFIER))
			.clone()
	}

	/// Whether the `action` attribute names a URL.
	pub fn is_action_url(&self) -> bool {
		self.attribute("action")
			.is_some_and(|action| fetch::is_action_url(&action))
	}

	/// The `autosubmit` delay; `None` when auto-submit is off.
	pub fn debounce_time(&self) -> Option<Duration> {
		parse_debounce(self.inner.attributes.borrow().get("autosubmit"))
	}

	// Mounting

	/// Connects the widget to its host and mirrors the current attributes
	/// onto the form. Does not submit; see [`mount`](Self::mount).
	pub fn attach(&self, host: Rc<dyn Host>) {
		*self.inner.host.borrow_mut() = Some(host);

		let attributes = self.attributes();
		for observed in ObservedAttribute::ALL {
			if let Some(form_attribute) = observed.form_attribute() {
				self.mirror(
					form_attribute,
					observed.mirrored_value(attributes.get(observed.name())),
				);
			}
		}
	}

	/// Attaches, seeds `value` from the search input (else the `value`
	/// attribute) and runs the initial submit cycle.
	pub async fn mount(&self, host: Rc<dyn Host>) -> Result<SubmitOutcome> {
		self.attach(host);

		let from_field = self
			.host()
			.and_then(|host| host.search_field())
			.map(|field| field.text_value())
			.filter(|value| !value.is_empty());
		let initial = from_field
			.or_else(|| self.attribute("value"))
			.unwrap_or_default();
		self.set_value(initial);

		debug_log!("mounted search widget `{}`", self.identifier());
		self.handle_submit(None).await
	}

	/// Disconnects from the host, dropping the pending auto-submit and the
	/// store subscription. In-flight submit cycles keep running.
	pub fn detach(&self) {
		self.inner.debouncer.cancel();
		self.inner.current_items.borrow_mut().take();
		self.inner.host.borrow_mut().take();
	}

	pub fn is_mounted(&self) -> bool {
		self.inner.host.borrow().is_some()
	}

	fn host(&self) -> Option<Rc<dyn Host>> {
		self.inner.host.borrow().clone()
	}

	fn form(&self) -> Option<Rc<dyn FormElement>> {
		self.host().and_then(|host| host.form())
	}

	fn require_form(&self) -> Result<Rc<dyn FormElement>> {
		self.form().ok_or(SearchError::Detached)
	}

	// Delegated form operations

	/// Runs the form's constraint validation.
	pub fn report_validity(&self) -> Result<bool> {
		Ok(self.require_form()?.report_validity())
	}

	/// Asks the form to submit as if `submitter` was activated.
	pub fn request_submit(&self, submitter: Option<&dyn Element>) -> Result<()> {
		self.require_form()?.request_submit(submitter)
	}

	/// Resets the form's controls.
	pub fn reset(&self) -> Result<()> {
		self.require_form()?.reset();
		Ok(())
	}

	/// Submits the form natively, bypassing validation and `submit` listeners.
	pub fn submit(&self) -> Result<()> {
		self.require_form()?.submit()
	}

	/// Re-dispatches the form's native `reset` to the widget's listeners.
	pub fn handle_reset(&self) {
		self.inner.listeners.dispatch_reset();
	}

	/// Re-dispatches the form's native `formdata` to the widget's listeners.
	pub fn handle_form_data(&self, data: &FormData) {
		self.inner.listeners.dispatch_form_data(data);
	}

	/// Native form data for `submitter`, overridden by every named field's
	/// current value.
	pub fn collect_form_data(&self, submitter: Option<&dyn Element>) -> Result<FormData> {
		let mut data = match self.form() {
			Some(form) => form.form_data(submitter)?,
			None => FormData::new(),
		};
		if let Some(host) = self.host() {
			for field in host.fields() {
				if let Some(name) = field.name() {
					data.set(name, field.value());
				}
			}
		}
		Ok(data)
	}

	// Auto-submit

	/// Handles a keystroke (or any input) in the search field.
	///
	/// A changed value is recorded, synced into `value` while mounted, and
	/// schedules a debounced `request_submit` when `autosubmit` is set.
	pub fn handle_search_input(&self, new_value: &str) {
		if *self.inner.current_value.borrow() == new_value {
			return;
		}

		if self.is_mounted() {
			self.set_value(new_value);
		} else {
			*self.inner.current_value.borrow_mut() = new_value.to_string();
		}

		let Some(delay) = self.debounce_time() else {
			return;
		};
		let weak = self.downgrade();
		self.inner.debouncer.call(delay, move || {
			if let Some(widget) = Self::upgrade(&weak) {
				widget.auto_submit();
			}
		});
	}

	/// Requests a submission through the footer submit button when present.
	fn auto_submit(&self) {
		let button = self.host().and_then(|host| host.submit_button());
		if let Err(err) = self.request_submit(button.as_deref()) {
			warn_log!("auto-submit failed: {}", err);
		}
	}

	// Listeners

	/// Registers a listener for the cancellable `submit` event.
	pub fn on_submit(&self, callback: impl Into<Callback<SubmitEvent>>) -> ListenerId {
		self.inner.listeners.on_submit(callback)
	}

	pub fn on_reset(&self, callback: impl Into<Callback<()>>) -> ListenerId {
		self.inner.listeners.on_reset(callback)
	}

	pub fn on_form_data(&self, callback: impl Into<Callback<FormData>>) -> ListenerId {
		self.inner.listeners.on_form_data(callback)
	}

	/// Removes a listener. Returns whether it was registered.
	pub fn remove_listener(&self, id: ListenerId) -> bool {
		self.inner.listeners.remove(id)
	}
}

impl std::fmt::Debug for SearchWidget {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SearchWidget")
			.field("identifier", &self.identifier())
			.field("value", &self.inner.value)
			.field("items", &self.inner.items)
			.field("mounted", &self.is_mounted())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockElement, MockField, MockForm, MockHost, services};
	use rstest::rstest;
	use serde_json::json;

	fn mounted_widget() -> (SearchWidget, MockHost) {
		let widget = SearchWidget::new(services().0);
		let host = MockHost::new()
			.with_form(MockForm::new())
			.with_search_field(MockField::text("value", ""));
		widget.attach(Rc::new(host.clone()));
		(widget, host)
	}

	#[rstest]
	fn test_defaults() {
		let widget = SearchWidget::new(services().0);

		assert_eq!(widget.value(), "");
		assert_eq!(widget.items(), json!([]));
		assert_eq!(widget.identifier(), DEFAULT_IDENTIFIER);
		assert!(!widget.is_mounted());
		assert_eq!(widget.debounce_time(), None);
	}

	#[rstest]
	#[case(&[], "search")]
	#[case(&[("name", "products")], "products")]
	#[case(&[("id", "main"), ("name", "products")], "main")]
	#[case(&[("id", ""), ("name", "products")], "products")]
	fn test_identifier(#[case] attributes: &[(&str, &str)], #[case] expected: &str) {
		let widget = SearchWidget::new(services().0);
		for (name, value) in attributes {
			widget.set_attribute(name, value);
		}
		assert_eq!(widget.identifier(), expected);
	}

	#[rstest]
	fn test_set_value_updates_search_field() {
		let (widget, host) = mounted_widget();

		widget.set_value("rust");

		assert_eq!(host.search_field_value().as_deref(), Some("rust"));
		assert_eq!(widget.current_value(), "rust");
	}

	#[rstest]
	fn test_value_attribute_feeds_value_property() {
		let (widget, host) = mounted_widget();

		widget.set_attribute("value", "initial");
		assert_eq!(widget.value(), "initial");
		assert_eq!(host.search_field_value().as_deref(), Some("initial"));

		widget.remove_attribute("value");
		assert_eq!(widget.value(), "");
	}

	#[rstest]
	fn test_value_is_published_under_id() {
		let (services, _, _, _) = services();
		let store = services.store.clone();
		let widget = SearchWidget::new(services);
		widget.set_attribute("id", "products");

		widget.set_value("chair");

		assert_eq!(store.get("products"), Some(json!("chair")));
	}

	#[rstest]
	fn test_attributes_are_mirrored_onto_form() {
		let (widget, host) = mounted_widget();
		let form = host.form_handle().unwrap();

		widget.set_attribute("action", "/api/items");
		widget.set_attribute("accept-charset", "utf-8");
		widget.set_attribute("disabled", "");
		widget.set_attribute("autosubmit", "300");

		assert_eq!(form.attribute("action").as_deref(), Some("/api/items"));
		assert_eq!(form.attribute("accept-charset").as_deref(), Some("utf-8"));
		assert_eq!(form.attribute("disabled").as_deref(), Some(""));
		assert_eq!(form.attribute("autosubmit"), None);

		widget.set_attribute("action", "");
		assert_eq!(form.attribute("action"), None);
		widget.remove_attribute("disabled");
		assert_eq!(form.attribute("disabled"), None);
	}

	#[rstest]
	fn test_attach_replays_attributes() {
		let widget = SearchWidget::new(services().0);
		widget.set_attribute("method", "post");
		let form = MockForm::new();

		widget.attach(Rc::new(MockHost::new().with_form(form.clone())));

		assert_eq!(form.attribute("method").as_deref(), Some("post"));
	}

	#[rstest]
	fn test_delegated_operations_need_a_form() {
		let widget = SearchWidget::new(services().0);

		assert_eq!(widget.report_validity(), Err(SearchError::Detached));
		assert_eq!(widget.request_submit(None), Err(SearchError::Detached));
		assert_eq!(widget.reset(), Err(SearchError::Detached));
		assert_eq!(widget.submit(), Err(SearchError::Detached));
	}

	#[rstest]
	fn test_delegated_operations_reach_form() {
		let (widget, host) = mounted_widget();
		let form = host.form_handle().unwrap();
		form.set_valid(false);

		assert_eq!(widget.report_validity(), Ok(false));
		widget.request_submit(None).unwrap();
		widget.reset().unwrap();
		widget.submit().unwrap();

		assert_eq!(form.submit_requests(), vec![false]);
		assert_eq!(form.reset_count(), 1);
		assert_eq!(form.submit_count(), 1);
	}

	#[rstest]
	fn test_reset_and_form_data_are_redispatched() {
		let widget = SearchWidget::new(services().0);
		let resets = Rc::new(Cell::new(0));
		let seen = Rc::new(RefCell::new(FormData::new()));
		widget.on_reset({
			let resets = Rc::clone(&resets);
			move |_: ()| resets.set(resets.get() + 1)
		});
		widget.on_form_data({
			let seen = Rc::clone(&seen);
			move |data: FormData| *seen.borrow_mut() = data
		});

		widget.handle_reset();
		widget.handle_form_data(&[("value", "x")].into_iter().collect());

		assert_eq!(resets.get(), 1);
		assert_eq!(seen.borrow().get_text("value"), Some("x"));
	}

	#[rstest]
	fn test_collect_form_data_prefers_field_values() {
		let widget = SearchWidget::new(services().0);
		let form = MockForm::new().with_form_data([("value", "stale"), ("page", "2")]);
		let host = MockHost::new()
			.with_form(form)
			.with_search_field(MockField::text("value", "fresh"))
			.with_field(MockField::text("", "unnamed"));
		widget.attach(Rc::new(host));

		let data = widget.collect_form_data(None).unwrap();

		assert_eq!(data.get_text("value"), Some("fresh"));
		assert_eq!(data.get_text("page"), Some("2"));
		assert_eq!(data.len(), 2);
	}

	#[rstest]
	fn test_input_while_unmounted_only_records_current_value() {
		let widget = SearchWidget::new(services().0);

		widget.handle_search_input("ru");

		assert_eq!(widget.current_value(), "ru");
		assert_eq!(widget.value(), "");
	}

	#[rstest]
	fn test_input_while_mounted_updates_value() {
		let (widget, _) = mounted_widget();

		widget.handle_search_input("rust");

		assert_eq!(widget.value(), "rust");
	}

	#[rstest]
	fn test_unchanged_input_does_not_schedule() {
		let (services, _, _, timer) = services();
		let widget = SearchWidget::new(services);
		widget.set_attribute("autosubmit", "100");

		widget.handle_search_input("");

		assert_eq!(timer.pending(), 0);
	}

	#[rstest]
	fn test_auto_submit_uses_footer_button() {
		let (services, _, _, timer) = services();
		let widget = SearchWidget::new(services);
		let form = MockForm::new();
		let host = MockHost::new()
			.with_form(form.clone())
			.with_submit_button(MockElement::new().with_attribute("type", "submit"));
		widget.attach(Rc::new(host));
		widget.set_attribute("autosubmit", "50ms");

		widget.handle_search_input("r");
		timer.advance(Duration::from_millis(50));

		assert_eq!(form.submit_requests(), vec![true]);
	}

	#[rstest]
	fn test_detach_cancels_pending_auto_submit() {
		let (services, _, _, timer) = services();
		let widget = SearchWidget::new(services);
		let form = MockForm::new();
		widget.attach(Rc::new(MockHost::new().with_form(form.clone())));
		widget.set_attribute("autosubmit", "10");

		widget.handle_search_input("r");
		widget.detach();
		timer.advance(Duration::from_millis(10));

		assert!(form.submit_requests().is_empty());
		assert!(!widget.is_mounted());
	}
}
