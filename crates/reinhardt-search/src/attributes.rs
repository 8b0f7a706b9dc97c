//! Attribute-driven configuration
//!
//! The widget is configured entirely through HTML attributes on its host
//! element. This module owns:
//!
//! - [`AttributeMap`]: the host's current attributes (names lower-cased, as
//!   the HTML parser stores them)
//! - [`ObservedAttribute`]: the table mapping an attribute name to the update
//!   it triggers on the widget
//! - [`FetchOptions`]: `data-fetch-*` attributes as fetch `RequestInit` fields
//! - [`SubmitSettings`]: per-submit resolution of `action`, `method`,
//!   `enctype`, `novalidate`, `target` with submitter (`form*`) overrides
//! - [`parse_debounce`]: the `autosubmit` delay

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::dom::Element;

/// Route name meaning "store locally, no fetch and no evaluation".
pub const GLOBAL_STORE_ROUTE: &str = "globalStoreDynamic";

/// Default `enctype` when neither host nor submitter sets one.
pub const DEFAULT_ENCTYPE: &str = "application/x-www-form-urlencoded";

/// Default request method.
pub const DEFAULT_METHOD: &str = "get";

/// The host element's attributes, keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
	entries: BTreeMap<String, String>,
}

impl AttributeMap {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Raw attribute value; `Some("")` for a present boolean attribute.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.entries
			.get(&name.to_ascii_lowercase())
			.map(String::as_str)
	}

	/// Attribute value, treating an empty string as absent.
	pub fn non_empty(&self, name: &str) -> Option<&str> {
		self.get(name).filter(|value| !value.is_empty())
	}

	/// Whether the attribute is present at all.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(&name.to_ascii_lowercase())
	}

	/// Sets an attribute, returning the previous value.
	pub fn set(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
		self.entries
			.insert(name.to_ascii_lowercase(), value.into())
	}

	/// Removes an attribute, returning its value.
	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.entries.remove(&name.to_ascii_lowercase())
	}

	/// Iterates `(name, value)` pairs in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_str()))
	}

	/// Number of attributes.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether no attribute is set.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut map = Self::new();
		for (name, value) in iter {
			map.set(name.as_ref(), value);
		}
		map
	}
}

/// Attributes whose changes the widget reacts to.
///
/// Every variant but [`Value`](Self::Value) is mirrored onto the internal
/// `<form>`; `value` feeds the widget's `value` property instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservedAttribute {
	/// `value`
	Value,
	/// `action`
	Action,
	/// `method`
	Method,
	/// `enctype`
	Enctype,
	/// `accept-charset`
	AcceptCharset,
	/// `autocomplete`
	Autocomplete,
	/// `autocapitalize`
	Autocapitalize,
	/// `rel`
	Rel,
	/// `disabled`
	Disabled,
	/// `novalidate`
	NoValidate,
}

impl ObservedAttribute {
	/// Every observed attribute, in mirroring order.
	pub const ALL: [Self; 10] = [
		Self::Value,
		Self::Action,
		Self::Method,
		Self::Enctype,
		Self::AcceptCharset,
		Self::Autocomplete,
		Self::Autocapitalize,
		Self::Rel,
		Self::Disabled,
		Self::NoValidate,
	];

	/// Looks up the table entry for an attribute name (case-insensitive).
	pub fn from_name(name: &str) -> Option<Self> {
		let name = name.to_ascii_lowercase();
		Self::ALL.into_iter().find(|attr| attr.name() == name)
	}

	/// HTML attribute name.
	pub fn name(self) -> &'static str {
		match self {
			Self::Value => "value",
			Self::Action => "action",
			Self::Method => "method",
			Self::Enctype => "enctype",
			Self::AcceptCharset => "accept-charset",
			Self::Autocomplete => "autocomplete",
			Self::Autocapitalize => "autocapitalize",
			Self::Rel => "rel",
			Self::Disabled => "disabled",
			Self::NoValidate => "novalidate",
		}
	}

	/// The `<form>` attribute this one mirrors to, if any.
	pub fn form_attribute(self) -> Option<&'static str> {
		match self {
			Self::Value => None,
			other => Some(other.name()),
		}
	}

	/// Boolean attributes mirror their presence; an empty value still counts.
	pub fn is_boolean(self) -> bool {
		matches!(self, Self::Disabled | Self::NoValidate)
	}

	/// The value to mirror onto the form, or `None` to remove the form
	/// attribute.
	pub fn mirrored_value(self, value: Option<&str>) -> Option<String> {
		match value {
			Some(value) if self.is_boolean() => Some(value.to_string()),
			Some(value) if !value.is_empty() => Some(value.to_string()),
			_ => None,
		}
	}
}

/// Fetch `RequestInit` fields configured through `data-fetch-*` attributes.
///
/// Serializes with the fetch API's camelCase names and omits unset fields, so
/// it can be spread into a request init object or a submit context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mode: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub credentials: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cache: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub referrer: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub referrer_policy: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub integrity: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keepalive: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub priority: Option<String>,
}

impl FetchOptions {
	/// Reads `data-fetch-*` attributes. Empty string options are ignored;
	/// `keepalive` is a boolean attribute and counts when merely present.
	pub fn from_attributes(attributes: &AttributeMap) -> Self {
		let option = |name: &str| {
			attributes
				.non_empty(&format!("data-fetch-{name}"))
				.map(str::to_owned)
		};

		Self {
			mode: option("mode"),
			credentials: option("credentials"),
			cache: option("cache"),
			redirect: option("redirect"),
			referrer: option("referrer"),
			referrer_policy: option("referrerpolicy"),
			integrity: option("integrity"),
			keepalive: attributes
				.contains("data-fetch-keepalive")
				.then_some(true),
			priority: option("priority"),
		}
	}

	/// Whether no option is set.
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}
}

/// Submission parameters for one submit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitSettings {
	/// Action route: URL, expression, or [`GLOBAL_STORE_ROUTE`]
	pub action: String,
	/// Lower-cased request method
	pub method: String,
	/// Explicit enctype, if any
	pub enctype: Option<String>,
	/// Skip the validity check
	pub no_validate: bool,
	/// Target route: expression or [`GLOBAL_STORE_ROUTE`]
	pub target: String,
}

impl SubmitSettings {
	/// Resolves settings from host attributes, letting the submitter's
	/// `formaction` / `formmethod` / `formenctype` / `formnovalidate` /
	/// `formtarget` take precedence.
	pub fn resolve(attributes: &AttributeMap, submitter: Option<&dyn Element>) -> Self {
		let lookup = |name: &str| -> Option<String> {
			submitter
				.and_then(|element| element.get_attribute(&format!("form{name}")))
				.filter(|value| !value.is_empty())
				.or_else(|| attributes.non_empty(name).map(str::to_owned))
		};

		let no_validate = attributes.contains("novalidate")
			|| submitter.is_some_and(|element| element.has_attribute("formnovalidate"));

		Self {
			action: lookup("action").unwrap_or_else(|| GLOBAL_STORE_ROUTE.to_string()),
			method: lookup("method")
				.map(|method| method.to_ascii_lowercase())
				.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
			enctype: lookup("enctype"),
			no_validate,
			target: lookup("target").unwrap_or_else(|| GLOBAL_STORE_ROUTE.to_string()),
		}
	}

	/// The enctype used to encode a request body.
	pub fn effective_enctype(&self) -> &str {
		self.enctype.as_deref().unwrap_or(DEFAULT_ENCTYPE)
	}

	/// `get` and `head` requests carry no body.
	pub fn sends_body(&self) -> bool {
		!matches!(self.method.as_str(), "get" | "head")
	}
}

/// Parses an `autosubmit` attribute into a debounce delay.
///
/// Every non-digit is stripped first, so `"300ms"` and `"3,000"` both parse.
/// `None` means auto-submit is off: attribute absent or no digits at all.
pub fn parse_debounce(raw: Option<&str>) -> Option<Duration> {
	let digits: String = raw?.chars().filter(char::is_ascii_digit).collect();
	digits.parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockElement;
	use rstest::rstest;

	#[rstest]
	fn test_attribute_map_is_case_insensitive() {
		let mut attributes = AttributeMap::new();
		attributes.set("data-fetch-referrerPolicy", "no-referrer");

		assert_eq!(
			attributes.get("data-fetch-referrerpolicy"),
			Some("no-referrer")
		);
		assert!(attributes.contains("DATA-FETCH-REFERRERPOLICY"));
	}

	#[rstest]
	fn test_non_empty_treats_blank_as_absent() {
		let attributes: AttributeMap = [("novalidate", "")].into_iter().collect();
		assert!(attributes.contains("novalidate"));
		assert_eq!(attributes.non_empty("novalidate"), None);
	}

	#[rstest]
	#[case("value", Some(ObservedAttribute::Value))]
	#[case("accept-charset", Some(ObservedAttribute::AcceptCharset))]
	#[case("NoValidate", Some(ObservedAttribute::NoValidate))]
	#[case("target", None)]
	#[case("autosubmit", None)]
	fn test_observed_attribute_table(
		#[case] name: &str,
		#[case] expected: Option<ObservedAttribute>,
	) {
		assert_eq!(ObservedAttribute::from_name(name), expected);
	}

	#[rstest]
	fn test_value_is_not_mirrored_to_form() {
		assert_eq!(ObservedAttribute::Value.form_attribute(), None);
		assert_eq!(
			ObservedAttribute::AcceptCharset.form_attribute(),
			Some("accept-charset")
		);
	}

	#[rstest]
	#[case(ObservedAttribute::Action, Some("/api"), Some("/api"))]
	#[case(ObservedAttribute::Action, Some(""), None)]
	#[case(ObservedAttribute::Action, None, None)]
	#[case(ObservedAttribute::Disabled, Some(""), Some(""))]
	#[case(ObservedAttribute::NoValidate, None, None)]
	fn test_mirrored_value(
		#[case] attribute: ObservedAttribute,
		#[case] value: Option<&str>,
		#[case] expected: Option<&str>,
	) {
		assert_eq!(attribute.mirrored_value(value).as_deref(), expected);
	}

	#[rstest]
	fn test_fetch_options_from_attributes() {
		let attributes: AttributeMap = [
			("data-fetch-mode", "cors"),
			("data-fetch-credentials", "include"),
			("data-fetch-referrerPolicy", "origin"),
			("data-fetch-keepalive", ""),
			("data-fetch-cache", ""),
		]
		.into_iter()
		.collect();

		let options = FetchOptions::from_attributes(&attributes);

		assert_eq!(options.mode.as_deref(), Some("cors"));
		assert_eq!(options.credentials.as_deref(), Some("include"));
		assert_eq!(options.referrer_policy.as_deref(), Some("origin"));
		assert_eq!(options.keepalive, Some(true));
		assert_eq!(options.cache, None);
	}

	#[rstest]
	fn test_fetch_options_serialize_camel_case() {
		let options = FetchOptions {
			referrer_policy: Some("origin".to_string()),
			..FetchOptions::default()
		};

		let json = serde_json::to_value(&options).unwrap();
		assert_eq!(json, serde_json::json!({ "referrerPolicy": "origin" }));
	}

	#[rstest]
	fn test_submit_settings_defaults() {
		let settings = SubmitSettings::resolve(&AttributeMap::new(), None);

		assert_eq!(settings.action, GLOBAL_STORE_ROUTE);
		assert_eq!(settings.target, GLOBAL_STORE_ROUTE);
		assert_eq!(settings.method, "get");
		assert_eq!(settings.enctype, None);
		assert_eq!(settings.effective_enctype(), DEFAULT_ENCTYPE);
		assert!(!settings.no_validate);
		assert!(!settings.sends_body());
	}

	#[rstest]
	fn test_submitter_overrides_host_attributes() {
		let attributes: AttributeMap = [("action", "/api/items"), ("method", "GET")]
			.into_iter()
			.collect();
		let submitter = MockElement::new()
			.with_attribute("formaction", "/api/other")
			.with_attribute("formmethod", "POST")
			.with_attribute("formnovalidate", "");

		let settings = SubmitSettings::resolve(&attributes, Some(&submitter));

		assert_eq!(settings.action, "/api/other");
		assert_eq!(settings.method, "post");
		assert!(settings.no_validate);
		assert!(settings.sends_body());
	}

	#[rstest]
	fn test_empty_submitter_override_falls_back() {
		let attributes: AttributeMap = [("action", "/api/items")].into_iter().collect();
		let submitter = MockElement::new().with_attribute("formaction", "");

		let settings = SubmitSettings::resolve(&attributes, Some(&submitter));
		assert_eq!(settings.action, "/api/items");
	}

	#[rstest]
	#[case(None, None)]
	#[case(Some(""), None)]
	#[case(Some("soon"), None)]
	#[case(Some("0"), Some(Duration::ZERO))]
	#[case(Some("300"), Some(Duration::from_millis(300)))]
	#[case(Some("300ms"), Some(Duration::from_millis(300)))]
	#[case(Some("1,500"), Some(Duration::from_millis(1500)))]
	#[case(Some("-20"), Some(Duration::from_millis(20)))]
	fn test_parse_debounce(#[case] raw: Option<&str>, #[case] expected: Option<Duration>) {
		assert_eq!(parse_debounce(raw), expected);
	}
}
