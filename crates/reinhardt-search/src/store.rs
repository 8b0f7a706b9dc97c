//! Global store
//!
//! Named [`Signal`]s shared between widgets on a page. A widget with an `id`
//! mirrors its `value` into the entry of that name, and the default target
//! route publishes results under `<identifier>Items`, so other components can
//! read or drive a search without holding the widget itself.
//!
//! Widgets with neither `id` nor `name` claim a default identifier from the
//! store, so two of them never share an entry.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use crate::reactive::Signal;

thread_local! {
	static GLOBAL: GlobalStore = GlobalStore::new();
}

/// A registry of named JSON signals.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct GlobalStore {
	entries: Rc<RefCell<HashMap<String, Signal<Value>>>>,
	claimed: Rc<RefCell<HashSet<String>>>,
}

impl GlobalStore {
	/// Creates an empty, private store.
	pub fn new() -> Self {
		Self::default()
	}

	/// The page-wide store shared by every widget built with default services.
	pub fn global() -> Self {
		GLOBAL.with(Clone::clone)
	}

	/// The signal for `key`, created holding `null` if missing.
	pub fn entry(&self, key: &str) -> Signal<Value> {
		self.entries
			.borrow_mut()
			.entry(key.to_string())
			.or_insert_with(|| Signal::new(Value::Null))
			.clone()
	}

	/// Writes `value` under `key`, creating the entry if needed, and returns
	/// its signal.
	pub fn dynamic(&self, key: &str, value: Value) -> Signal<Value> {
		let signal = self.entry(key);
		signal.set(value);
		signal
	}

	/// Current value under `key`.
	pub fn get(&self, key: &str) -> Option<Value> {
		let signal = self.entries.borrow().get(key).cloned()?;
		Some(signal.get())
	}

	/// Writes `value` under `key` only if it differs from the stored one.
	///
	/// Returns whether a write happened.
	pub fn set(&self, key: &str, value: Value) -> bool {
		self.entry(key).set_if_changed(value)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.borrow().contains_key(key)
	}

	/// Entry names, sorted.
	pub fn keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
		keys.sort();
		keys
	}

	/// Reserves `base` as an identifier, or `base2`, `base3`, ... when taken.
	pub fn claim_identifier(&self, base: &str) -> String {
		let mut claimed = self.claimed.borrow_mut();
		let identifier = std::iter::once(base.to_string())
			.chain((2..).map(|n| format!("{base}{n}")))
			.find(|candidate| !claimed.contains(candidate))
			.unwrap_or_else(|| base.to_string());
		claimed.insert(identifier.clone());
		identifier
	}

	/// Frees an identifier from [`claim_identifier`](Self::claim_identifier).
	pub fn release_identifier(&self, identifier: &str) {
		self.claimed.borrow_mut().remove(identifier);
	}

	/// Drops the entry. Existing signal handles keep working but are no longer
	/// reachable through the store.
	pub fn remove(&self, key: &str) -> Option<Signal<Value>> {
		self.entries.borrow_mut().remove(key)
	}
}

impl std::fmt::Debug for GlobalStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GlobalStore")
			.field("keys", &self.keys())
			.finish()
	}
}
