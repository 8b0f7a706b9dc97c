//! Trailing-edge debouncing for auto-submit
//!
//! [`Debouncer::call`] schedules a callback through a [`Timer`]; each call
//! bumps a generation counter and a timer only fires its callback if no newer
//! call happened in between. Earlier timers are left to run out, they just do
//! nothing when they fire.
//!
//! ```text
//! key  key  key
//!  │    │    │
//!  ├─x  ├─x  ├────────300ms────────▶ submit
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Schedules one-shot callbacks.
pub trait Timer {
	/// Runs `callback` once after `delay`.
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>);
}

/// Browser timer on `setTimeout` through `gloo-timers`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

#[cfg(target_arch = "wasm32")]
impl Timer for BrowserTimer {
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
		let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
		gloo_timers::callback::Timeout::new(millis, callback).forget();
	}
}

/// A per-widget debouncer; only the last scheduled callback runs.
#[derive(Clone)]
pub struct Debouncer {
	timer: Rc<dyn Timer>,
	generation: Rc<Cell<u64>>,
}

impl Debouncer {
	pub fn new(timer: Rc<dyn Timer>) -> Self {
		Self {
			timer,
			generation: Rc::new(Cell::new(0)),
		}
	}

	/// Schedules `f` after `delay`, superseding any pending call.
	pub fn call(&self, delay: Duration, f: impl FnOnce() + 'static) {
		let scheduled = self.generation.get().wrapping_add(1);
		self.generation.set(scheduled);

		let generation = Rc::clone(&self.generation);
		self.timer.set_timeout(
			delay,
			Box::new(move || {
				if generation.get() == scheduled {
					f();
				}
			}),
		);
	}

	/// Drops the pending call, if any.
	pub fn cancel(&self) {
		self.generation.set(self.generation.get().wrapping_add(1));
	}
}

impl std::fmt::Debug for Debouncer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Debouncer")
			.field("generation", &self.generation.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::ManualTimer;
	use rstest::rstest;

	fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Box<dyn FnOnce()>) {
		let hits = Rc::new(Cell::new(0));
		let make = {
			let hits = Rc::clone(&hits);
			move || -> Box<dyn FnOnce()> {
				let hits = Rc::clone(&hits);
				Box::new(move || hits.set(hits.get() + 1))
			}
		};
		(hits, make)
	}

	#[rstest]
	fn test_only_last_call_fires() {
		let timer = ManualTimer::new();
		let debouncer = Debouncer::new(Rc::new(timer.clone()));
		let (hits, make) = counter();
		let delay = Duration::from_millis(300);

		debouncer.call(delay, make());
		timer.advance(Duration::from_millis(100));
		debouncer.call(delay, make());
		timer.advance(Duration::from_millis(100));
		debouncer.call(delay, make());

		timer.advance(Duration::from_millis(299));
		assert_eq!(hits.get(), 0);
		timer.advance(Duration::from_millis(1));
		assert_eq!(hits.get(), 1);

		timer.advance(Duration::from_secs(1));
		assert_eq!(hits.get(), 1);
	}

	#[rstest]
	fn test_cancel_drops_pending_call() {
		let timer = ManualTimer::new();
		let debouncer = Debouncer::new(Rc::new(timer.clone()));
		let (hits, make) = counter();

		debouncer.call(Duration::from_millis(10), make());
		debouncer.cancel();
		timer.advance(Duration::from_millis(10));

		assert_eq!(hits.get(), 0);
	}

	#[rstest]
	fn test_zero_delay_fires_on_next_tick() {
		let timer = ManualTimer::new();
		let debouncer = Debouncer::new(Rc::new(timer.clone()));
		let (hits, make) = counter();

		debouncer.call(Duration::ZERO, make());
		assert_eq!(hits.get(), 0);
		timer.advance(Duration::ZERO);
		assert_eq!(hits.get(), 1);
	}
}
