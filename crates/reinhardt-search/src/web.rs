//! Browser glue
//!
//! Implements the [`dom`](crate::dom) traits over `web_sys` elements and wires
//! a [`SearchWidget`](crate::SearchWidget) to a live host element:
//!
//! ```text
//! <reinhardt-search action="/api/items" autosubmit="300">
//!   <form>
//!     <input name="value">          keyup / input ─▶ handle_search_input
//!   </form>                         submit        ─▶ handle_submit (spawned)
//!   <div slot="footer">             reset         ─▶ handle_reset + host `reset`
//!     <button>Search</button>       formdata      ─▶ handle_form_data
//!   </div>
//! </reinhardt-search>               attributes    ─▶ MutationObserver ─▶ attribute_changed
//! ```

mod dom;
mod element;

pub use dom::{WebElement, WebField, WebForm, WebHost};
pub use element::{MountedWidget, define, mount};

use wasm_bindgen::{JsCast, JsValue};

/// Readable message for a thrown JavaScript value.
pub(crate) fn js_error(value: &JsValue) -> String {
	if let Some(error) = value.dyn_ref::<js_sys::Error>() {
		return String::from(error.message());
	}
	value
		.as_string()
		.unwrap_or_else(|| format!("{value:?}"))
}
