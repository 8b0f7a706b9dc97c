//! The submit cycle
//!
//! ```text
//! validate ─▶ collect ─▶ announce ─▶ resolve action ─▶ resolve target ─▶ commit
//!    │                      │
//!    ▼                      ▼
//! Invalid               Cancelled
//! ```
//!
//! Action routes, chosen from `action` (or the submitter's `formaction`):
//!
//! | Action | Route |
//! |--------|-------|
//! | absent / `globalStoreDynamic` | publish `value` under the identifier |
//! | `scheme://…`, `/…`, `./…`, `../…` | fetch; JSON body becomes the items |
//! | anything else | evaluate as an expression |
//!
//! `target` routes the same way minus the URL case: by default the items are
//! published under `<identifier>Items`, otherwise the target expression may
//! map them. Store routes leave the widget subscribed to the entry, and an
//! outside write to it requests a fresh submission unless the written value
//! is what the widget already holds.

use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use super::{ItemsBinding, SearchWidget};
use crate::attributes::{FetchOptions, GLOBAL_STORE_ROUTE, SubmitSettings};
use crate::dom::Element;
use crate::error::Result;
use crate::evaluator::Scope;
use crate::event::SubmitEvent;
use crate::fetch::{FetchRequest, is_action_url, is_json_content_type};
use crate::form_data::FormData;
use crate::{debug_log, warn_log};

/// How a submit cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// Validation failed; nothing changed.
	Invalid,
	/// A `submit` listener called `prevent_default`; nothing changed.
	Cancelled,
	/// `value` and `items` were assigned.
	Committed,
}

/// What expressions see as their context.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitContext<'a> {
	#[serde(flatten)]
	fetch_options: &'a FetchOptions,
	previous_value: String,
	value: &'a str,
	valid: bool,
	identifier: &'a str,
	form_data: &'a FormData,
	action: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	enctype: Option<&'a str>,
	method: &'a str,
	no_validate: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	items: Option<&'a Value>,
}

/// Missing or falsy results resolve to an empty list.
fn finalize_items(items: Option<Value>) -> Value {
	match items {
		None | Some(Value::Null) | Some(Value::Bool(false)) => Value::Array(Vec::new()),
		Some(Value::String(text)) if text.is_empty() => Value::Array(Vec::new()),
		Some(Value::Number(number)) if number.as_f64() == Some(0.0) => Value::Array(Vec::new()),
		Some(items) => items,
	}
}

impl SearchWidget {
	/// Runs one submit cycle, as triggered by the form's `submit` event.
	///
	/// Network and evaluation failures are returned and leave `value` and
	/// `items` as they were.
	pub async fn handle_submit(&self, submitter: Option<Rc<dyn Element>>) -> Result<SubmitOutcome> {
		let settings =
			SubmitSettings::resolve(&self.inner.attributes.borrow(), submitter.as_deref());

		if !settings.no_validate
			&& let Some(form) = self.form()
			&& !form.report_validity()
		{
			debug_log!("submit of `{}` stopped: form is invalid", self.identifier());
			return Ok(SubmitOutcome::Invalid);
		}

		let form_data = self.collect_form_data(submitter.as_deref())?;

		let event = SubmitEvent::new(form_data.clone(), submitter);
		if !self.inner.listeners.dispatch_submit(&event) {
			debug_log!("submit of `{}` cancelled by a listener", self.identifier());
			return Ok(SubmitOutcome::Cancelled);
		}

		let value = form_data
			.get_text("value")
			.map(str::to_owned)
			.unwrap_or_else(|| self.value());
		let identifier = self.identifier();
		let host_element = self.host().and_then(|host| host.element());
		let fetch_options = FetchOptions::from_attributes(&self.inner.attributes.borrow());
		let mut context = SubmitContext {
			fetch_options: &fetch_options,
			previous_value: self.value(),
			value: &value,
			valid: true,
			identifier: &identifier,
			form_data: &form_data,
			action: &settings.action,
			enctype: settings.enctype.as_deref(),
			method: &settings.method,
			no_validate: settings.no_validate,
			items: None,
		};

		let items = if settings.action == GLOBAL_STORE_ROUTE {
			debug_log!("action of `{}` routed to the global store", identifier);
			Some(self.route_through_store(&identifier, Value::String(value.clone())))
		} else if is_action_url(&settings.action) {
			debug_log!("action of `{}` fetches {}", identifier, settings.action);
			self.fetch_items(&settings, &form_data, fetch_options.clone())
				.await?
		} else {
			debug_log!("action of `{}` evaluates an expression", identifier);
			let scope = Scope::new(
				serde_json::to_value(&context)?,
				identifier.clone(),
				(identifier.clone(), Value::String(value.clone())),
				self.store().clone(),
			)
			.with_host(host_element.clone());
			self.inner
				.services
				.evaluator
				.evaluate(&settings.action, &scope)
				.await?
		};
		let mut items = finalize_items(items);

		let items_key = format!("{identifier}Items");
		if settings.target == GLOBAL_STORE_ROUTE {
			items = self.route_through_store(&items_key, items);
		} else {
			context.items = Some(&items);
			let scope = Scope::new(
				serde_json::to_value(&context)?,
				identifier.clone(),
				(items_key, items.clone()),
				self.store().clone(),
			)
			.with_host(host_element);
			let mapped = self
				.inner
				.services
				.evaluator
				.evaluate(&settings.target, &scope)
				.await?;
			if mapped.is_some() {
				items = finalize_items(mapped);
			}
		}

		self.set_value(value);
		self.set_items(items);
		debug_log!("submit of `{}` committed", identifier);
		Ok(SubmitOutcome::Committed)
	}

	async fn fetch_items(
		&self,
		settings: &SubmitSettings,
		form_data: &FormData,
		options: FetchOptions,
	) -> Result<Option<Value>> {
		let forced_type = self
			.inner
			.attributes
			.borrow()
			.non_empty("data-content-type")
			.map(str::to_owned);
		let request =
			FetchRequest::from_submission(&settings.action, settings, form_data, options)?;

		let response = self.inner.services.fetcher.fetch(request).await?;
		if !response.ok() {
			debug_log!("fetch returned status {}", response.status());
			return Ok(None);
		}

		let content_type = forced_type
			.as_deref()
			.or_else(|| response.header("content-type"));
		if content_type.is_some_and(is_json_content_type) {
			Ok(Some(response.json_body()?))
		} else {
			Ok(None)
		}
	}

	/// Publishes `value` under `key`, follows that entry, and returns what the
	/// entry now holds.
	fn route_through_store(&self, key: &str, value: Value) -> Value {
		self.inner.publish(key, value);
		self.follow_store_entry(key);
		self.store().entry(key).get()
	}

	/// Subscribes to `key`, replacing the previous subscription.
	fn follow_store_entry(&self, key: &str) {
		let mut current = self.inner.current_items.borrow_mut();
		if current.as_ref().is_some_and(|binding| binding.key == key) {
			return;
		}

		let weak = self.downgrade();
		let subscription = self.store().entry(key).subscribe(move |entry: &Value| {
			let Some(widget) = Self::upgrade(&weak) else {
				return;
			};
			if widget.inner.publishing.get() {
				return;
			}
			// Already committed: another widget echoing the same result.
			if *entry == widget.items() || *entry == Value::String(widget.value()) {
				return;
			}
			if let Err(err) = widget.request_submit(None) {
				warn_log!("store update could not resubmit: {}", err);
			}
		});
		*current = Some(ItemsBinding {
			key: key.to_string(),
			_subscription: subscription,
		});
	}
}
