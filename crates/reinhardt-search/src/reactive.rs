//! Reactive properties
//!
//! [`Signal`] is the property wrapper behind the widget's `value` and `items`:
//! every write runs an optional setter (for DOM side effects) and then notifies
//! subscribers with the stored value. Readers always see the latest write.
//!
//! ```text
//! set(v) ──▶ setter(v) -> v' ──▶ store v' ──▶ subscribers(&v')
//! ```
//!
//! Subscribers are held by [`Subscription`] guards; dropping the guard
//! unsubscribes.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Setter<T> = Box<dyn Fn(T) -> T>;
type Subscriber<T> = Rc<dyn Fn(&T)>;

struct SignalInner<T> {
	value: RefCell<T>,
	setter: Option<Setter<T>>,
	subscribers: RefCell<Vec<(u64, Subscriber<T>)>>,
	next_subscriber: Cell<u64>,
}

/// A single-threaded observable value.
///
/// Cloning a `Signal` yields another handle to the same value.
pub struct Signal<T> {
	inner: Rc<SignalInner<T>>,
}

impl<T: Clone + 'static> Signal<T> {
	/// Creates a signal holding `value`.
	pub fn new(value: T) -> Self {
		Self::build(value, None)
	}

	/// Creates a signal whose writes pass through `setter` first.
	///
	/// The setter runs on every [`set`](Self::set), before the value is stored,
	/// and its return value is what gets stored. The initial value does not go
	/// through the setter.
	pub fn with_setter<F>(value: T, setter: F) -> Self
	where
		F: Fn(T) -> T + 'static,
	{
		Self::build(value, Some(Box::new(setter)))
	}

	fn build(value: T, setter: Option<Setter<T>>) -> Self {
		Self {
			inner: Rc::new(SignalInner {
				value: RefCell::new(value),
				setter,
				subscribers: RefCell::new(Vec::new()),
				next_subscriber: Cell::new(0),
			}),
		}
	}

	/// Returns a clone of the current value.
	pub fn get(&self) -> T {
		self.inner.value.borrow().clone()
	}

	/// Borrows the current value for the duration of `f`.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.inner.value.borrow())
	}

	/// Writes a new value, running the setter and notifying subscribers.
	pub fn set(&self, value: T) {
		let value = match &self.inner.setter {
			Some(setter) => setter(value),
			None => value,
		};
		*self.inner.value.borrow_mut() = value;
		self.notify();
	}

	/// Mutates the value in place, then notifies subscribers.
	///
	/// The setter is bypassed.
	pub fn update(&self, f: impl FnOnce(&mut T)) {
		f(&mut self.inner.value.borrow_mut());
		self.notify();
	}

	/// Registers `f` to run after every write.
	pub fn subscribe<F>(&self, f: F) -> Subscription
	where
		F: Fn(&T) + 'static,
	{
		let id = self.inner.next_subscriber.get();
		self.inner.next_subscriber.set(id + 1);
		self.inner
			.subscribers
			.borrow_mut()
			.push((id, Rc::new(f)));

		let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
		Subscription {
			unsubscribe: Some(Box::new(move || {
				if let Some(inner) = weak.upgrade() {
					inner
						.subscribers
						.borrow_mut()
						.retain(|(sub_id, _)| *sub_id != id);
				}
			})),
		}
	}

	/// Number of live subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.borrow().len()
	}

	/// Whether two handles refer to the same signal.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	fn notify(&self) {
		// Snapshot first so subscribers may read or write this signal.
		let subscribers: Vec<Subscriber<T>> = self
			.inner
			.subscribers
			.borrow()
			.iter()
			.map(|(_, sub)| Rc::clone(sub))
			.collect();
		if subscribers.is_empty() {
			return;
		}
		let value = self.get();
		for subscriber in subscribers {
			subscriber(&value);
		}
	}
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
	/// Writes `value` only if it differs from the current one.
	///
	/// Returns `true` when a write (and notification) happened.
	pub fn set_if_changed(&self, value: T) -> bool {
		if self.with(|current| *current == value) {
			return false;
		}
		self.set(value);
		true
	}
}

impl<T> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Signal")
			.field("value", &self.inner.value.borrow())
			.field("subscribers", &self.inner.subscribers.borrow().len())
			.finish()
	}
}

impl<T: Clone + Default + 'static> Default for Signal<T> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

/// Keeps a [`Signal::subscribe`] registration alive.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
	unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	/// Keeps the subscriber registered for the signal's whole lifetime.
	pub fn forget(mut self) {
		self.unsubscribe = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(unsubscribe) = self.unsubscribe.take() {
			unsubscribe();
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.unsubscribe.is_some())
			.finish()
	}
}
