//! Cloneable callback wrapper used for widget event listeners.
//!
//! The widget lives on the browser's single event loop, so callbacks are
//! `Rc`-backed and carry no `Send`/`Sync` bounds on any target.
//!
//! ```ignore
//! use reinhardt_search::{Callback, SubmitEvent};
//!
//! let block_empty = Callback::new(|event: SubmitEvent| {
//!     if event.form_data().get_text("value").is_none_or(str::is_empty) {
//!         event.prevent_default();
//!     }
//! });
//! widget.on_submit(block_empty);
//! ```

use std::rc::Rc;

/// A cheaply cloneable handle to a listener function.
pub struct Callback<Args, Ret = ()> {
	inner: Rc<dyn Fn(Args) -> Ret + 'static>,
}

impl<Args, Ret> Callback<Args, Ret> {
	/// Wraps a function or closure.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(Args) -> Ret + 'static,
	{
		Self { inner: Rc::new(f) }
	}

	/// Invokes the callback.
	pub fn call(&self, args: Args) -> Ret {
		(self.inner)(args)
	}

	/// Whether both handles point at the same function.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl<Args, Ret> Clone for Callback<Args, Ret> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<Args, Ret> std::fmt::Debug for Callback<Args, Ret> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Callback")
			.field("inner", &"<function>")
			.finish()
	}
}

impl<Args, Ret, F> From<F> for Callback<Args, Ret>
where
	F: Fn(Args) -> Ret + 'static,
{
	fn from(f: F) -> Self {
		Self::new(f)
	}
}
