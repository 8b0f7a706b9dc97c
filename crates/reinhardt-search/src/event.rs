//! Widget events and listener registry
//!
//! The widget dispatches three events to its listeners:
//!
//! - `submit`: the synthetic, cancellable [`SubmitEvent`] announced before a
//!   submit cycle resolves its action
//! - `reset`: re-dispatched from the internal form's native `reset`
//! - `formdata`: re-dispatched from the internal form's native `formdata`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::callback::Callback;
use crate::dom::Element;
use crate::form_data::FormData;

/// The cancellable event announced before a submission is resolved.
///
/// Clones share cancellation state, so a listener receiving a clone can still
/// cancel the submission.
#[derive(Clone)]
pub struct SubmitEvent {
	form_data: FormData,
	valid: bool,
	submitter: Option<Rc<dyn Element>>,
	default_prevented: Rc<Cell<bool>>,
}

impl SubmitEvent {
	/// Creates an uncancelled event.
	pub fn new(form_data: FormData, submitter: Option<Rc<dyn Element>>) -> Self {
		Self {
			form_data,
			valid: true,
			submitter,
			default_prevented: Rc::new(Cell::new(false)),
		}
	}

	/// The collected form data.
	pub fn form_data(&self) -> &FormData {
		&self.form_data
	}

	/// Whether the form passed validation (always `true` once announced).
	pub fn valid(&self) -> bool {
		self.valid
	}

	/// The button that triggered the submission, if any.
	pub fn submitter(&self) -> Option<&Rc<dyn Element>> {
		self.submitter.as_ref()
	}

	/// Cancels the submission.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Whether a listener cancelled the submission.
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

impl std::fmt::Debug for SubmitEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubmitEvent")
			.field("form_data", &self.form_data)
			.field("valid", &self.valid)
			.field("has_submitter", &self.submitter.is_some())
			.field("default_prevented", &self.default_prevented.get())
			.finish()
	}
}

/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerList<Args> {
	entries: RefCell<Vec<(ListenerId, Callback<Args>)>>,
}

impl<Args> Default for ListenerList<Args> {
	fn default() -> Self {
		Self {
			entries: RefCell::new(Vec::new()),
		}
	}
}

impl<Args: Clone> ListenerList<Args> {
	fn push(&self, id: ListenerId, callback: Callback<Args>) {
		self.entries.borrow_mut().push((id, callback));
	}

	fn remove(&self, id: ListenerId) -> bool {
		let mut entries = self.entries.borrow_mut();
		let before = entries.len();
		entries.retain(|(entry_id, _)| *entry_id != id);
		entries.len() != before
	}

	fn dispatch(&self, args: &Args) {
		// Listeners may register or remove listeners while running.
		let callbacks: Vec<Callback<Args>> = self
			.entries
			.borrow()
			.iter()
			.map(|(_, callback)| callback.clone())
			.collect();
		for callback in callbacks {
			callback.call(args.clone());
		}
	}

	fn len(&self) -> usize {
		self.entries.borrow().len()
	}
}

/// Per-widget listener registry.
#[derive(Default)]
pub struct EventListeners {
	next_id: Cell<u64>,
	submit: ListenerList<SubmitEvent>,
	reset: ListenerList<()>,
	form_data: ListenerList<FormData>,
}

impl EventListeners {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	fn next_id(&self) -> ListenerId {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		ListenerId(id)
	}

	/// Registers a `submit` listener.
	pub fn on_submit(&self, callback: impl Into<Callback<SubmitEvent>>) -> ListenerId {
		let id = self.next_id();
		self.submit.push(id, callback.into());
		id
	}

	/// Registers a `reset` listener.
	pub fn on_reset(&self, callback: impl Into<Callback<()>>) -> ListenerId {
		let id = self.next_id();
		self.reset.push(id, callback.into());
		id
	}

	/// Registers a `formdata` listener.
	pub fn on_form_data(&self, callback: impl Into<Callback<FormData>>) -> ListenerId {
		let id = self.next_id();
		self.form_data.push(id, callback.into());
		id
	}

	/// Removes a listener of any kind. Returns whether one was removed.
	pub fn remove(&self, id: ListenerId) -> bool {
		self.submit.remove(id) || self.reset.remove(id) || self.form_data.remove(id)
	}

	/// Dispatches `event` to every `submit` listener.
	///
	/// Returns `false` when a listener cancelled it.
	pub fn dispatch_submit(&self, event: &SubmitEvent) -> bool {
		self.submit.dispatch(event);
		!event.default_prevented()
	}

	/// Dispatches `reset`.
	pub fn dispatch_reset(&self) {
		self.reset.dispatch(&());
	}

	/// Dispatches `formdata`.
	pub fn dispatch_form_data(&self, data: &FormData) {
		self.form_data.dispatch(data);
	}

	/// Total number of registered listeners.
	pub fn len(&self) -> usize {
		self.submit.len() + self.reset.len() + self.form_data.len()
	}

	/// Whether no listener is registered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
