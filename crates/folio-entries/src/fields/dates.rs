use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use folio_types::Value;
use tracing::warn;

use super::{FieldHook, ON_FETCH_AND_CREATE};
use crate::config::DEFAULT_DATE_FORMAT;
use crate::error::EntriesResult;
use crate::event::{Event, HookContext};

/// Maintains a date field such as `published_at` or `created_at`.
///
/// On fetch a missing value becomes the document's modification time and a
/// string is normalized to unix seconds. On create a missing value becomes
/// the current time rendered with `date_format`.
#[derive(Debug, Clone)]
pub struct DateFieldHook {
    field: &'static str,
}

impl DateFieldHook {
    pub fn new(field: &'static str) -> Self {
        Self { field }
    }

    fn on_fetch(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        match ctx.field(self.field) {
            None | Some(Value::Null) => {
                if let Some(stamp) = ctx.document_stamp()? {
                    ctx.set_field(self.field, stamp.modified_secs());
                }
            }
            Some(Value::String(raw)) => {
                let raw = raw.clone();
                match normalize_date(&raw, &ctx.settings().date_format) {
                    Some(ts) => ctx.set_field(self.field, ts),
                    None => warn!(
                        field = self.field,
                        value = %raw,
                        "unrecognized date left unchanged"
                    ),
                }
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn on_create(&self, ctx: &mut HookContext<'_>) {
        if ctx.field_is_set(self.field) {
            return;
        }
        let now = ctx.now();
        let formatted = format_date(now, &ctx.settings().date_format);
        ctx.set_field(self.field, formatted);
    }
}

impl FieldHook for DateFieldHook {
    fn name(&self) -> &'static str {
        self.field
    }

    fn events(&self) -> &'static [Event] {
        ON_FETCH_AND_CREATE
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        match ctx.event() {
            Event::Create => {
                self.on_create(ctx);
                Ok(())
            }
            _ => self.on_fetch(ctx),
        }
    }
}

/// Parse a date string into unix seconds (UTC).
///
/// Tries `format` first (as a date-time, then as a bare date), then RFC 3339,
/// the default format, `%Y-%m-%d`, and finally a plain integer.
pub fn normalize_date(raw: &str, format: &str) -> Option<i64> {
    let raw = raw.trim();
    let as_datetime = |fmt: &str| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|dt| dt.and_utc().timestamp())
    };
    let as_date = |fmt: &str| {
        NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
    };

    as_datetime(format)
        .or_else(|| as_date(format))
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.timestamp()))
        .or_else(|| as_datetime(DEFAULT_DATE_FORMAT))
        .or_else(|| as_date("%Y-%m-%d"))
        .or_else(|| raw.parse::<i64>().ok())
}

/// Render `now` with `format`, falling back to the default format when the
/// pattern is invalid.
fn format_date(now: DateTime<Utc>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_ok() {
        return out;
    }
    warn!(format, "invalid date_format, using default");
    now.format(DEFAULT_DATE_FORMAT).to_string()
}
