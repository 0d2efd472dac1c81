use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  Utc
};
use tracing::trace;

const DUE_DATE_FORMAT: &str =
  "%Y-%m-%d";

/// Parse a stored due date.
///
/// Only calendar dates are accepted; impossible dates such as `2025-02-30`
/// are rejected like any other malformed value.
#[must_use]
pub fn parse_due_date(
  raw: &str
) -> Option<NaiveDate> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match NaiveDate::parse_from_str(
    trimmed,
    DUE_DATE_FORMAT
  ) {
    | Ok(date) => Some(date),
    | Err(err) => {
      trace!(raw = %raw, error = %err, "unparseable due date treated as absent");
      None
    }
  }
}

#[must_use]
pub fn format_due_date(
  date: NaiveDate
) -> String {
  date
    .format(DUE_DATE_FORMAT)
    .to_string()
}

/// Creation timestamp for a new record: `now`, unless that would not be
/// strictly after the newest existing timestamp.
#[must_use]
pub fn next_created_at(
  newest: Option<DateTime<Utc>>,
  now: DateTime<Utc>
) -> DateTime<Utc> {
  match newest {
    | Some(latest) if now <= latest => {
      latest + Duration::milliseconds(1)
    }
    | _ => now
  }
}
