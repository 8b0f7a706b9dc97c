//! Mounting on live elements and custom element registration.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function};
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
	CustomEvent, CustomEventInit, Event, EventTarget, HtmlElement, MutationObserver,
	MutationObserverInit, MutationRecord,
};

use super::dom::{WebElement, WebField, WebHost, form_data_from_js};
use super::js_error;
use crate::dom::{Element, FieldElement};
use crate::error::{Result, SearchError};
use crate::event::{ListenerId, SubmitEvent};
use crate::widget::{SearchWidget, WidgetServices};
use crate::{debug_log, error_log, warn_log};

type Listener = Closure<dyn FnMut(Event)>;

/// A widget wired to a host element.
///
/// Dropping it leaves the listeners installed; call
/// [`unmount`](Self::unmount) to tear them down.
pub struct MountedWidget {
	widget: SearchWidget,
	host: HtmlElement,
	listeners: Vec<(EventTarget, &'static str, Listener)>,
	observer: MutationObserver,
	_observer_callback: Closure<dyn FnMut(Array, MutationObserver)>,
	bridge: ListenerId,
}

impl MountedWidget {
	pub fn widget(&self) -> &SearchWidget {
		&self.widget
	}

	pub fn host(&self) -> &HtmlElement {
		&self.host
	}

	/// Removes every listener and observer and detaches the widget.
	pub fn unmount(self) {
		self.observer.disconnect();
		for (target, event, listener) in &self.listeners {
			if let Err(err) =
				target.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
			{
				warn_log!("failed to remove `{}` listener: {}", event, js_error(&err));
			}
		}
		self.widget.remove_listener(self.bridge);
		self.widget.detach();
		debug_log!("unmounted search widget `{}`", self.widget.identifier());
	}
}

impl std::fmt::Debug for MountedWidget {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MountedWidget")
			.field("widget", &self.widget)
			.field("listeners", &self.listeners.len())
			.finish_non_exhaustive()
	}
}

fn listen(
	listeners: &mut Vec<(EventTarget, &'static str, Listener)>,
	target: &EventTarget,
	event: &'static str,
	handler: impl FnMut(Event) + 'static,
) -> Result<()> {
	let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
	target
		.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
		.map_err(|err| SearchError::dom(js_error(&err)))?;
	listeners.push((target.clone(), event, closure));
	Ok(())
}

/// Re-announces the widget's `submit` on the host as a cancellable
/// `CustomEvent` with `detail: { valid, formData }`.
fn bridge_submit_event(widget: &SearchWidget, host: &HtmlElement) -> ListenerId {
	let host = host.clone();
	widget.on_submit(move |event: SubmitEvent| {
		let detail = json!({
			"valid": event.valid(),
			"formData": event.form_data().to_json(),
		});
		let detail = match js_sys::JSON::parse(&detail.to_string()) {
			Ok(detail) => detail,
			Err(err) => {
				warn_log!("submit detail not representable: {}", js_error(&err));
				JsValue::NULL
			}
		};

		let init = CustomEventInit::new();
		init.set_cancelable(true);
		init.set_detail(&detail);
		match CustomEvent::new_with_event_init_dict("submit", &init) {
			Ok(custom) => {
				if let Err(err) = host.dispatch_event(&custom) {
					warn_log!("failed to dispatch submit: {}", js_error(&err));
				} else if custom.default_prevented() {
					event.prevent_default();
				}
			}
			Err(err) => warn_log!("failed to create submit event: {}", js_error(&err)),
		}
	})
}

/// The `formData` carried by a `formdata` event.
fn event_form_data(event: &Event) -> Option<web_sys::FormData> {
	js_sys::Reflect::get(event, &JsValue::from_str("formData"))
		.ok()
		.and_then(|data| data.dyn_into::<web_sys::FormData>().ok())
}

fn redispatch(host: &HtmlElement, name: &str) {
	let dispatched = Event::new(name).and_then(|event| host.dispatch_event(&event));
	if let Err(err) = dispatched {
		warn_log!("failed to re-dispatch `{}`: {}", name, js_error(&err));
	}
}

fn read_attributes(widget: &SearchWidget, host: &HtmlElement) {
	for name in host.get_attribute_names().iter() {
		if let Some(name) = name.as_string() {
			widget.attribute_changed(&name, host.get_attribute(&name).as_deref());
		}
	}
}

/// Wires a new widget to `host` and starts its initial submit cycle.
///
/// Expects `host` to already contain its `<form>`; listeners are installed
/// on the form, the search input and the host itself.
pub fn mount(host: &HtmlElement, services: WidgetServices) -> Result<MountedWidget> {
	let widget = SearchWidget::new(services);
	read_attributes(&widget, host);

	let web_host = WebHost::new(host.clone().into());
	let mut listeners = Vec::new();

	if let Some(form) = web_host.form_element() {
		let submit_widget = widget.clone();
		listen(&mut listeners, &form, "submit", move |event: Event| {
			event.prevent_default();
			event.stop_propagation();
			let submitter = event
				.dyn_ref::<web_sys::SubmitEvent>()
				.and_then(web_sys::SubmitEvent::submitter)
				.map(|element| Rc::new(WebElement::new(element.into())) as Rc<dyn Element>);
			let widget = submit_widget.clone();
			wasm_bindgen_futures::spawn_local(async move {
				match widget.handle_submit(submitter).await {
					Ok(outcome) => debug_log!("submit finished: {:?}", outcome),
					Err(err) => error_log!("submit of `{}` failed: {}", widget.identifier(), err),
				}
			});
		})?;

		let reset_widget = widget.clone();
		let reset_host = host.clone();
		listen(&mut listeners, &form, "reset", move |event: Event| {
			event.stop_propagation();
			reset_widget.handle_reset();
			redispatch(&reset_host, "reset");
		})?;

		let form_data_widget = widget.clone();
		let form_data_host = host.clone();
		listen(&mut listeners, &form, "formdata", move |event: Event| {
			event.stop_propagation();
			if let Some(data) = event_form_data(&event) {
				match form_data_from_js(&data) {
					Ok(data) => form_data_widget.handle_form_data(&data),
					Err(err) => warn_log!("unreadable formdata: {}", err),
				}
			}
			redispatch(&form_data_host, "formdata");
		})?;
	} else {
		warn_log!("search widget mounted without a <form>");
	}

	if let Some(field) = web_host.search_element() {
		for event_name in ["keyup", "input"] {
			let input_widget = widget.clone();
			let field_handle = WebField::new(field.clone());
			listen(&mut listeners, &field, event_name, move |_event: Event| {
				input_widget.handle_search_input(&field_handle.text_value());
			})?;
		}
	}

	let observed_widget = widget.clone();
	let observed_host = host.clone();
	let observer_callback = Closure::wrap(Box::new(
		move |records: Array, _observer: MutationObserver| {
			for record in records.iter() {
				let Ok(record) = record.dyn_into::<MutationRecord>() else {
					continue;
				};
				if let Some(name) = record.attribute_name() {
					let value = observed_host.get_attribute(&name);
					observed_widget.attribute_changed(&name, value.as_deref());
				}
			}
		},
	) as Box<dyn FnMut(Array, MutationObserver)>);
	let observer = MutationObserver::new(observer_callback.as_ref().unchecked_ref())
		.map_err(|err| SearchError::dom(js_error(&err)))?;
	let options = MutationObserverInit::new();
	options.set_attributes(true);
	observer
		.observe_with_options(host, &options)
		.map_err(|err| SearchError::dom(js_error(&err)))?;

	let bridge = bridge_submit_event(&widget, host);

	let mounting = widget.clone();
	wasm_bindgen_futures::spawn_local(async move {
		if let Err(err) = mounting.mount(Rc::new(web_host)).await {
			error_log!("initial submit of `{}` failed: {}", mounting.identifier(), err);
		}
	});

	Ok(MountedWidget {
		widget,
		host: host.clone(),
		listeners,
		observer,
		_observer_callback: observer_callback,
		bridge,
	})
}

thread_local! {
	static MOUNTED: RefCell<Vec<MountedWidget>> = const { RefCell::new(Vec::new()) };
}

const ELEMENT_CLASS: &str = "
	return class extends HTMLElement {
		connectedCallback() { connected(this); }
		disconnectedCallback() { disconnected(this); }
	};
";

/// Registers `tag_name` as a custom element.
///
/// Each connected element gets a widget built with `services()`; it is
/// unmounted again when the element leaves the document.
pub fn define(tag_name: &str, services: impl Fn() -> WidgetServices + 'static) -> Result<()> {
	let window = web_sys::window().ok_or_else(|| SearchError::dom("no window"))?;
	let registry = window.custom_elements();
	if !registry.get(tag_name).is_undefined() {
		return Err(SearchError::dom(format!("`{tag_name}` is already defined")));
	}

	let connected = Closure::wrap(Box::new(move |element: HtmlElement| {
		let known = MOUNTED.with(|mounted| {
			mounted
				.borrow()
				.iter()
				.any(|widget| widget.host() == &element)
		});
		if known {
			return;
		}
		match mount(&element, services()) {
			Ok(widget) => MOUNTED.with(|mounted| mounted.borrow_mut().push(widget)),
			Err(err) => error_log!("failed to mount search widget: {}", err),
		}
	}) as Box<dyn FnMut(HtmlElement)>);

	let disconnected = Closure::wrap(Box::new(move |element: HtmlElement| {
		let removed = MOUNTED.with(|mounted| {
			let mut mounted = mounted.borrow_mut();
			let index = mounted
				.iter()
				.position(|widget| widget.host() == &element)?;
			Some(mounted.remove(index))
		});
		if let Some(widget) = removed {
			widget.unmount();
		}
	}) as Box<dyn FnMut(HtmlElement)>);

	let factory = Function::new_with_args("connected, disconnected", ELEMENT_CLASS);
	let class: Function = factory
		.call2(
			&JsValue::NULL,
			connected.as_ref().unchecked_ref(),
			disconnected.as_ref().unchecked_ref(),
		)
		.map_err(|err| SearchError::dom(js_error(&err)))?
		.dyn_into()
		.map_err(|_| SearchError::dom("element class factory returned a non-class"))?;

	registry
		.define(tag_name, &class)
		.map_err(|err| SearchError::dom(js_error(&err)))?;

	// The class calls these for the page's lifetime.
	connected.forget();
	disconnected.forget();

	debug_log!("defined <{}>", tag_name);
	Ok(())
}
