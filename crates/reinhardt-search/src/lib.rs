//! Reinhardt Search - search form custom element for Reinhardt Pages
//!
//! A `<form>`-wrapping widget that binds a search input to a reactive
//! `value` / `items` pair and resolves each submission through a fetch, an
//! expression, or the global store.
//!
//! ## Features
//!
//! - **Attribute driven**: `action`, `method`, `enctype`, `target`,
//!   `autosubmit` and `data-fetch-*` configure everything
//! - **Native form semantics**: validation, `requestSubmit`, `reset`,
//!   submitter `form*` overrides, cancellable `submit` event
//! - **Debounced auto-submit** while typing
//! - **Pluggable collaborators**: [`Fetcher`], [`Evaluator`] and [`Timer`]
//!   are traits; the browser implementations ship behind `wasm32`
//!
//! ## Architecture
//!
//! - [`widget`]: [`SearchWidget`] and its submit cycle
//! - [`attributes`]: attribute parsing and per-submit settings
//! - [`reactive`]: [`Signal`] properties
//! - [`dom`]: the traits the widget sees its DOM through
//! - [`fetch`]: request building and the [`Fetcher`] trait
//! - [`evaluator`]: the [`Evaluator`] trait and [`FunctionRegistry`]
//! - [`store`]: the [`GlobalStore`] shared by widgets
//! - [`debounce`]: auto-submit scheduling
//! - `web` (WASM only): `web_sys` glue, `mount` and `define`
//! - [`testing`]: in-memory mocks
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_search::{web, WidgetServices};
//!
//! // <reinhardt-search action="/api/items" autosubmit="300">
//! //   <form><input name="value" required></form>
//! // </reinhardt-search>
//! web::define("reinhardt-search", WidgetServices::browser)?;
//! ```
//!
//! Natively, with mocks:
//!
//! ```ignore
//! let (services, fetcher, _, _) = reinhardt_search::testing::services();
//! let widget = SearchWidget::new(services);
//! widget.set_attribute("action", "/api/items");
//! widget.mount(Rc::new(host)).await?;
//! assert_eq!(widget.items(), json!([1, 2, 3]));
//! ```

pub mod attributes;
pub mod callback;
pub mod debounce;
pub mod dom;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod fetch;
pub mod form_data;
pub mod logging;
pub mod reactive;
pub mod store;
pub mod testing;
pub mod widget;

#[cfg(target_arch = "wasm32")]
pub mod web;

// Used by the logging macros.
#[cfg(target_arch = "wasm32")]
#[doc(hidden)]
pub use web_sys as __web_sys;

pub use attributes::{AttributeMap, FetchOptions, ObservedAttribute, SubmitSettings};
pub use callback::Callback;
pub use debounce::{Debouncer, Timer};
pub use dom::{Element, FieldElement, FormElement, Host};
pub use error::{Result, SearchError};
pub use evaluator::{Evaluator, FunctionRegistry, Scope};
pub use event::{ListenerId, SubmitEvent};
pub use fetch::{FetchRequest, FetchResponse, Fetcher, RequestBody};
pub use form_data::{FormData, FormFile, FormValue};
pub use reactive::{Signal, Subscription};
pub use store::GlobalStore;
pub use widget::{SearchWidget, SubmitOutcome, WidgetServices};

#[cfg(not(target_arch = "wasm32"))]
pub use fetch::HttpFetcher;

#[cfg(target_arch = "wasm32")]
pub use debounce::BrowserTimer;
#[cfg(target_arch = "wasm32")]
pub use evaluator::JsEvaluator;
#[cfg(target_arch = "wasm32")]
pub use fetch::BrowserFetcher;

/// Installs the panic hook that forwards panics to the browser console.
#[cfg(all(target_arch = "wasm32", feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {
	console_error_panic_hook::set_once();
}
