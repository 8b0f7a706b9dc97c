//! `web_sys` implementations of the DOM traits.

use std::any::Any;
use std::rc::Rc;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
	HtmlButtonElement, HtmlElement, HtmlFormElement, HtmlInputElement, HtmlSelectElement,
	HtmlTextAreaElement,
};

use super::js_error;
use crate::dom::{Element, FieldElement, FormElement, Host};
use crate::error::{Result, SearchError};
use crate::form_data::{FormData, FormFile, FormValue};

/// Any DOM element.
#[derive(Debug, Clone)]
pub struct WebElement {
	element: web_sys::Element,
}

impl WebElement {
	pub fn new(element: web_sys::Element) -> Self {
		Self { element }
	}

	pub fn element(&self) -> &web_sys::Element {
		&self.element
	}
}

impl Element for WebElement {
	fn get_attribute(&self, name: &str) -> Option<String> {
		self.element.get_attribute(name)
	}

	fn has_attribute(&self, name: &str) -> bool {
		self.element.has_attribute(name)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// The `HtmlElement` behind a submitter created by this module.
fn submitter_element(submitter: Option<&dyn Element>) -> Option<HtmlElement> {
	submitter?
		.as_any()
		.downcast_ref::<WebElement>()?
		.element
		.dyn_ref::<HtmlElement>()
		.cloned()
}

/// Converts a browser `FormData` into entries, keeping file blobs.
pub(crate) fn form_data_from_js(data: &web_sys::FormData) -> Result<FormData> {
	let mut entries = FormData::new();
	let iter = js_sys::try_iter(data)
		.map_err(|err| SearchError::dom(js_error(&err)))?
		.ok_or_else(|| SearchError::dom("FormData is not iterable"))?;

	for entry in iter {
		let entry = js_sys::Array::from(&entry.map_err(|err| SearchError::dom(js_error(&err)))?);
		let Some(name) = entry.get(0).as_string() else {
			continue;
		};
		entries.append(name, form_value_from_js(entry.get(1)));
	}
	Ok(entries)
}

fn form_value_from_js(value: JsValue) -> FormValue {
	match value.dyn_into::<web_sys::File>() {
		Ok(file) => FormValue::File(file_from_js(file)),
		Err(value) => FormValue::Text(value.as_string().unwrap_or_default()),
	}
}

fn file_from_js(file: web_sys::File) -> FormFile {
	let content_type = file.type_();
	let mut form_file = FormFile::new(file.name());
	if !content_type.is_empty() {
		form_file = form_file.with_content_type(content_type);
	}
	form_file.blob = Some(file);
	form_file
}

/// The widget's internal `<form>`.
#[derive(Debug, Clone)]
pub struct WebForm {
	form: HtmlFormElement,
}

impl WebForm {
	pub fn new(form: HtmlFormElement) -> Self {
		Self { form }
	}

	pub fn form(&self) -> &HtmlFormElement {
		&self.form
	}

	/// Whether this form is `element`'s form owner. `requestSubmit` rejects
	/// submitters owned by another form or by none, such as a footer button
	/// slotted outside the `<form>`.
	fn owns(&self, element: &HtmlElement) -> bool {
		let owner = if let Some(button) = element.dyn_ref::<HtmlButtonElement>() {
			button.form()
		} else if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			input.form()
		} else {
			None
		};
		owner.is_some_and(|owner| owner == self.form)
	}
}

impl Element for WebForm {
	fn get_attribute(&self, name: &str) -> Option<String> {
		self.form.get_attribute(name)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

impl FormElement for WebForm {
	fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
		self.form
			.set_attribute(name, value)
			.map_err(|err| SearchError::dom(js_error(&err)))
	}

	fn remove_attribute(&self, name: &str) -> Result<()> {
		self.form
			.remove_attribute(name)
			.map_err(|err| SearchError::dom(js_error(&err)))
	}

	fn report_validity(&self) -> bool {
		self.form.report_validity()
	}

	fn request_submit(&self, submitter: Option<&dyn Element>) -> Result<()> {
		let submitted = match submitter_element(submitter) {
			Some(submitter) if self.owns(&submitter) => {
				self.form.request_submit_with_submitter(Some(&submitter))
			}
			Some(_) => {
				crate::debug_log!("submitter is not owned by the form; submitting without it");
				self.form.request_submit()
			}
			None => self.form.request_submit(),
		};
		submitted.map_err(|err| SearchError::dom(js_error(&err)))
	}

	fn reset(&self) {
		self.form.reset();
	}

	fn submit(&self) -> Result<()> {
		self.form
			.submit()
			.map_err(|err| SearchError::dom(js_error(&err)))
	}

	fn form_data(&self, submitter: Option<&dyn Element>) -> Result<FormData> {
		let native = web_sys::FormData::new_with_form(&self.form)
			.map_err(|err| SearchError::dom(js_error(&err)))?;
		let mut data = form_data_from_js(&native)?;

		// A named submitter contributes its own entry, as on native submission.
		if let Some(submitter) = submitter
			&& let Some(name) = submitter.get_attribute("name").filter(|name| !name.is_empty())
		{
			data.append(name, submitter.get_attribute("value").unwrap_or_default());
		}
		Ok(data)
	}
}

/// An `input`, `select`, `textarea` or `object`.
#[derive(Debug, Clone)]
pub struct WebField {
	element: web_sys::Element,
}

impl WebField {
	pub fn new(element: web_sys::Element) -> Self {
		Self { element }
	}
}

impl Element for WebField {
	fn get_attribute(&self, name: &str) -> Option<String> {
		self.element.get_attribute(name)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

impl FieldElement for WebField {
	fn value(&self) -> FormValue {
		if let Some(input) = self.element.dyn_ref::<HtmlInputElement>() {
			if input.type_().eq_ignore_ascii_case("file") {
				let file = input.files().and_then(|files| files.get(0));
				return match file {
					Some(file) => FormValue::File(file_from_js(file)),
					None => FormValue::Text(String::new()),
				};
			}
			return FormValue::Text(input.value());
		}
		if let Some(select) = self.element.dyn_ref::<HtmlSelectElement>() {
			return FormValue::Text(select.value());
		}
		if let Some(textarea) = self.element.dyn_ref::<HtmlTextAreaElement>() {
			return FormValue::Text(textarea.value());
		}
		FormValue::Text(self.element.get_attribute("value").unwrap_or_default())
	}

	fn set_value(&self, value: &str) {
		if let Some(input) = self.element.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		} else if let Some(select) = self.element.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value);
		} else if let Some(textarea) = self.element.dyn_ref::<HtmlTextAreaElement>() {
			textarea.set_value(value);
		} else if let Err(err) = self.element.set_attribute("value", value) {
			crate::warn_log!("failed to set field value: {}", js_error(&err));
		}
	}
}

/// Answers the widget's descendant queries from its host element.
#[derive(Debug, Clone)]
pub struct WebHost {
	root: web_sys::Element,
}

impl WebHost {
	pub fn new(root: web_sys::Element) -> Self {
		Self { root }
	}

	pub fn root(&self) -> &web_sys::Element {
		&self.root
	}

	fn query(&self, selector: &str) -> Option<web_sys::Element> {
		self.root.query_selector(selector).ok().flatten()
	}

	/// The form as its concrete type, for installing listeners.
	pub fn form_element(&self) -> Option<HtmlFormElement> {
		self.query("form")?.dyn_into().ok()
	}

	/// The search input as a concrete element.
	pub fn search_element(&self) -> Option<web_sys::Element> {
		self.query(r#"input[name="value"]"#)
	}
}

impl Host for WebHost {
	fn form(&self) -> Option<Rc<dyn FormElement>> {
		let form = self.form_element()?;
		Some(Rc::new(WebForm::new(form)))
	}

	fn search_field(&self) -> Option<Rc<dyn FieldElement>> {
		let field = self.search_element()?;
		Some(Rc::new(WebField::new(field)))
	}

	fn fields(&self) -> Vec<Rc<dyn FieldElement>> {
		let Ok(nodes) = self.root.query_selector_all("input,object,select,textarea") else {
			return Vec::new();
		};
		(0..nodes.length())
			.filter_map(|index| nodes.get(index))
			.filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
			.map(|element| Rc::new(WebField::new(element)) as Rc<dyn FieldElement>)
			.collect()
	}

	fn submit_button(&self) -> Option<Rc<dyn Element>> {
		let button = self.query(r#"[slot="footer"] button, button[slot="footer"]"#)?;
		Some(Rc::new(WebElement::new(button)))
	}

	fn element(&self) -> Option<Rc<dyn Element>> {
		Some(Rc::new(WebElement::new(self.root.clone())))
	}
}
