//! Collected form data
//!
//! An ordered multimap of control name to value, mirroring the browser's
//! `FormData`: [`FormData::append`] adds an entry, [`FormData::set`] replaces
//! every entry of a name in place of the first one.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::error::Result;

/// A file selected in a file input.
#[derive(Debug, Clone)]
pub struct FormFile {
	/// Filename reported by the browser
	pub filename: String,
	/// MIME type, when known
	pub content_type: Option<String>,
	/// File contents for natively built forms; empty for browser files,
	/// whose bytes stay in the platform blob.
	pub contents: Vec<u8>,
	#[cfg(target_arch = "wasm32")]
	pub(crate) blob: Option<web_sys::File>,
}

impl FormFile {
	/// Creates a file entry from its name.
	pub fn new(filename: impl Into<String>) -> Self {
		Self {
			filename: filename.into(),
			content_type: None,
			contents: Vec::new(),
			#[cfg(target_arch = "wasm32")]
			blob: None,
		}
	}

	/// Sets the MIME type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());
		self
	}

	/// Sets the contents.
	pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
		self.contents = contents.into();
		self
	}
}

impl PartialEq for FormFile {
	fn eq(&self, other: &Self) -> bool {
		self.filename == other.filename
			&& self.content_type == other.content_type
			&& self.contents == other.contents
	}
}

/// A single form value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
	/// Text control value
	Text(String),
	/// File input value
	File(FormFile),
}

impl FormValue {
	/// The text, or `None` for files.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			Self::File(_) => None,
		}
	}

	/// How the value appears in text encodings: the text itself, or the filename.
	pub fn as_encoded_str(&self) -> &str {
		match self {
			Self::Text(text) => text,
			Self::File(file) => &file.filename,
		}
	}
}

impl From<&str> for FormValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_string())
	}
}

impl From<String> for FormValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<FormFile> for FormValue {
	fn from(file: FormFile) -> Self {
		Self::File(file)
	}
}

/// Ordered name → value entries of a form submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
	entries: Vec<(String, FormValue)>,
}

impl FormData {
	/// Creates an empty form data set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an entry, keeping existing entries of the same name.
	pub fn append(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
		self.entries.push((name.into(), value.into()));
	}

	/// Replaces all entries named `name` with a single one at the position of
	/// the first, or appends if there were none.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
		let name = name.into();
		let value = value.into();
		match self.entries.iter().position(|(key, _)| *key == name) {
			Some(first) => {
				self.entries[first].1 = value;
				let mut index = 0;
				self.entries.retain(|(key, _)| {
					let keep = index <= first || *key != name;
					index += 1;
					keep
				});
			}
			None => self.entries.push((name, value)),
		}
	}

	/// First value for `name`.
	pub fn get(&self, name: &str) -> Option<&FormValue> {
		self.entries
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value)
	}

	/// First value for `name` if it is text.
	pub fn get_text(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(FormValue::as_text)
	}

	/// Every value for `name`.
	pub fn get_all(&self, name: &str) -> Vec<&FormValue> {
		self.entries
			.iter()
			.filter(|(key, _)| key == name)
			.map(|(_, value)| value)
			.collect()
	}

	/// Whether any entry is named `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.iter().any(|(key, _)| key == name)
	}

	/// Removes every entry named `name`.
	pub fn delete(&mut self, name: &str) {
		self.entries.retain(|(key, _)| key != name);
	}

	/// All entries in order.
	pub fn entries(&self) -> impl Iterator<Item = (&str, &FormValue)> {
		self.entries
			.iter()
			.map(|(name, value)| (name.as_str(), value))
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether there are no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// `application/x-www-form-urlencoded` encoding. Files contribute their filename.
	pub fn to_urlencoded(&self) -> Result<String> {
		let pairs: Vec<(&str, &str)> = self
			.entries
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_encoded_str()))
			.collect();
		Ok(serde_urlencoded::to_string(pairs)?)
	}

	/// `text/plain` encoding: one `name=value` per CRLF-terminated line.
	pub fn to_plain_text(&self) -> String {
		self.entries
			.iter()
			.map(|(name, value)| format!("{}={}\r\n", name, value.as_encoded_str()))
			.collect()
	}

	/// JSON object view; names with several entries become arrays.
	pub fn to_json(&self) -> Value {
		Value::Object(self.to_json_map())
	}

	fn to_json_map(&self) -> Map<String, Value> {
		let mut object = Map::new();
		for (name, value) in &self.entries {
			let value = Value::String(value.as_encoded_str().to_string());
			match object.entry(name.clone()) {
				Entry::Vacant(slot) => {
					slot.insert(value);
				}
				Entry::Occupied(mut slot) => match slot.get_mut() {
					Value::Array(values) => values.push(value),
					existing => {
						let first = existing.take();
						*existing = Value::Array(vec![first, value]);
					}
				},
			}
		}
		object
	}
}

impl Serialize for FormData {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		let object = self.to_json_map();
		let mut map = serializer.serialize_map(Some(object.len()))?;
		for (name, value) in &object {
			map.serialize_entry(name, value)?;
		}
		map.end()
	}
}

impl<N: Into<String>, V: Into<FormValue>> FromIterator<(N, V)> for FormData {
	fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
		let mut data = Self::new();
		for (name, value) in iter {
			data.append(name, value);
		}
		data
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_set_replaces_all_entries_of_name() {
		let mut data: FormData = [("tag", "a"), ("q", "x"), ("tag", "b")]
			.into_iter()
			.collect();

		data.set("tag", "c");

		let entries: Vec<_> = data
			.entries()
			.map(|(name, value)| (name, value.as_encoded_str()))
			.collect();
		assert_eq!(entries, vec![("tag", "c"), ("q", "x")]);
	}

	#[rstest]
	fn test_set_appends_missing_name() {
		let mut data = FormData::new();
		data.set("value", "rust");
		assert_eq!(data.get_text("value"), Some("rust"));
		assert_eq!(data.len(), 1);
	}

	#[rstest]
	fn test_file_entries_keep_filename() {
		let mut data = FormData::new();
		data.append("upload", FormFile::new("report.pdf"));

		assert_eq!(data.get_text("upload"), None);
		assert_eq!(data.to_urlencoded().unwrap(), "upload=report.pdf");
	}

	#[rstest]
	fn test_urlencoded_escapes_values() {
		let data: FormData = [("value", "rust lang"), ("lang", "en&ja")]
			.into_iter()
			.collect();
		assert_eq!(
			data.to_urlencoded().unwrap(),
			"value=rust+lang&lang=en%26ja"
		);
	}

	#[rstest]
	fn test_plain_text_encoding() {
		let data: FormData = [("a", "1"), ("b", "2")].into_iter().collect();
		assert_eq!(data.to_plain_text(), "a=1\r\nb=2\r\n");
	}

	#[rstest]
	fn test_json_groups_repeated_names() {
		let data: FormData = [("tag", "a"), ("tag", "b"), ("tag", "c"), ("q", "x")]
			.into_iter()
			.collect();

		assert_eq!(data.to_json(), json!({ "tag": ["a", "b", "c"], "q": "x" }));
		assert_eq!(serde_json::to_value(&data).unwrap(), data.to_json());
	}

	#[rstest]
	fn test_delete_and_contains() {
		let mut data: FormData = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
		data.delete("a");
		assert!(!data.contains("a"));
		assert_eq!(data.get_all("b").len(), 1);
	}
}
