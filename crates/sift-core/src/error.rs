use thiserror::Error;

/// Failures surfaced by the query boundary.
///
/// Selection ids that no longer exist are not errors; they are dropped by
/// [`crate::selection::Selection::prune`]. Unparseable due dates are not
/// errors either; such records sort as undated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
  #[error(
    "invalid {field}: {value:?} \
     (expected one of: {expected})"
  )]
  InvalidInput {
    field:    &'static str,
    value:    String,
    expected: &'static str
  },

  #[error("task text cannot be empty")]
  EmptyText
}

impl QueryError {
  pub(crate) fn invalid(
    field: &'static str,
    value: &str,
    expected: &'static str
  ) -> Self {
    Self::InvalidInput {
      field,
      value: value.to_string(),
      expected
    }
  }
}
