//! Error types for the search widget.
//!
//! Validation failures and listener cancellation are *not* errors: they are
//! reported through [`SubmitOutcome`](crate::SubmitOutcome). Everything here is
//! a failure that aborts a submit cycle and leaves the previously committed
//! `value` / `items` untouched.

/// Errors produced by a [`SearchWidget`](crate::SearchWidget) and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
	/// The fetch stack failed before a response was available
	#[error("Network error: {0}")]
	Network(String),

	/// An `action` or `target` expression failed to evaluate
	#[error("Evaluation error: {0}")]
	Evaluation(String),

	/// Failed to encode the submitted form data or context
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// A response body declared as JSON could not be decoded
	#[error("Deserialization error: {0}")]
	Deserialization(String),

	/// A browser API rejected a DOM operation
	#[error("DOM error: {0}")]
	Dom(String),

	/// The operation needs the internal `<form>` but none is mounted
	#[error("search widget has no mounted form")]
	Detached,
}

impl SearchError {
	/// Create a network error
	pub fn network(msg: impl Into<String>) -> Self {
		Self::Network(msg.into())
	}

	/// Create an evaluation error
	pub fn evaluation(msg: impl Into<String>) -> Self {
		Self::Evaluation(msg.into())
	}

	/// Create a serialization error
	pub fn serialization(msg: impl Into<String>) -> Self {
		Self::Serialization(msg.into())
	}

	/// Create a deserialization error
	pub fn deserialization(msg: impl Into<String>) -> Self {
		Self::Deserialization(msg.into())
	}

	/// Create a DOM error
	pub fn dom(msg: impl Into<String>) -> Self {
		Self::Dom(msg.into())
	}
}

impl From<serde_json::Error> for SearchError {
	fn from(err: serde_json::Error) -> Self {
		if err.is_data() || err.is_syntax() || err.is_eof() {
			Self::Deserialization(err.to_string())
		} else {
			Self::Serialization(err.to_string())
		}
	}
}

impl From<serde_urlencoded::ser::Error> for SearchError {
	fn from(err: serde_urlencoded::ser::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_search_error_display() {
		assert_eq!(
			SearchError::network("connection refused").to_string(),
			"Network error: connection refused"
		);
		assert_eq!(
			SearchError::evaluation("unknown function `lookup`").to_string(),
			"Evaluation error: unknown function `lookup`"
		);
		assert_eq!(
			SearchError::Detached.to_string(),
			"search widget has no mounted form"
		);
	}

	#[rstest]
	fn test_json_syntax_error_maps_to_deserialization() {
		let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
		assert!(matches!(
			SearchError::from(err),
			SearchError::Deserialization(_)
		));
	}
}
