//! DOM contract between the widget and its host framework
//!
//! The widget never touches `web_sys` directly. It sees its surroundings
//! through these traits, implemented over real elements in
//! [`web`](crate::web) (WASM) and over in-memory mocks in
//! [`testing`](crate::testing).
//!
//! ```text
//! ┌──────────── Host ─────────────┐
//! │ form()          -> FormElement │  <form> inside the widget
//! │ search_field()  -> FieldElement│  input[name="value"]
//! │ fields()        -> [FieldElement] input, object, select, textarea
//! │ submit_button() -> Element     │  footer slot button
//! │ element()       -> Element     │  the custom element itself
//! └────────────────────────────────┘
//! ```

use std::any::Any;
use std::rc::Rc;

use crate::error::Result;
use crate::form_data::{FormData, FormValue};

/// Anything with attributes.
pub trait Element {
	/// Reads an attribute; `Some("")` for a present boolean attribute.
	fn get_attribute(&self, name: &str) -> Option<String>;

	/// Whether the attribute is present.
	fn has_attribute(&self, name: &str) -> bool {
		self.get_attribute(name).is_some()
	}

	/// Concrete type access, used by platform code to recover its own handle
	/// (e.g. the `web_sys` submitter passed to `requestSubmit`).
	fn as_any(&self) -> &dyn Any;
}

/// The internal `<form>` whose native behavior the widget proxies.
pub trait FormElement: Element {
	/// Sets a form attribute.
	fn set_attribute(&self, name: &str, value: &str) -> Result<()>;

	/// Removes a form attribute.
	fn remove_attribute(&self, name: &str) -> Result<()>;

	/// Runs constraint validation, showing the native validity UI on failure.
	fn report_validity(&self) -> bool;

	/// Requests a submission as if `submitter` had been activated.
	///
	/// Unlike [`submit`](Self::submit) this fires the `submit` event.
	fn request_submit(&self, submitter: Option<&dyn Element>) -> Result<()>;

	/// Resets all controls, firing the native `reset` event.
	fn reset(&self);

	/// Submits without firing `submit` or validating.
	fn submit(&self) -> Result<()>;

	/// Constructs the native form data set for `submitter`.
	fn form_data(&self, submitter: Option<&dyn Element>) -> Result<FormData>;
}

/// An input-like control (`input`, `object`, `select`, `textarea`).
pub trait FieldElement: Element {
	/// The control's `name`, if it has a non-empty one.
	fn name(&self) -> Option<String> {
		self.get_attribute("name").filter(|name| !name.is_empty())
	}

	/// Current value; file inputs yield their first selected file.
	fn value(&self) -> FormValue;

	/// Current value as text. Files report their filename.
	fn text_value(&self) -> String {
		match self.value() {
			FormValue::Text(text) => text,
			FormValue::File(file) => file.filename,
		}
	}

	/// Overwrites the control's value.
	fn set_value(&self, value: &str);
}

/// Descendant queries the host framework answers for the widget.
pub trait Host {
	/// The internal `<form>`.
	fn form(&self) -> Option<Rc<dyn FormElement>>;

	/// The bound search input (`input[name="value"]`).
	fn search_field(&self) -> Option<Rc<dyn FieldElement>>;

	/// Every input-like descendant, in document order.
	fn fields(&self) -> Vec<Rc<dyn FieldElement>>;

	/// The submit button slotted into the widget's footer.
	fn submit_button(&self) -> Option<Rc<dyn Element>>;

	/// The custom element itself; expressions see it as their host.
	fn element(&self) -> Option<Rc<dyn Element>> {
		None
	}
}
