//! Just-in-time resolution of size and time bounds.
//!
//! A raw bound is one of:
//! - a whole-string variable reference `${name}` whose typed value is used
//!   directly (a string value is parsed like a literal instead)
//! - a date-math expression in single quotes, `'NOW-1DAY'` (dates only)
//! - a literal: an integer, or a `yyyy-MM-dd HH:mm:ss` local date
//!
//! Embedded references (`'NOW-${days}DAYS'`) are expanded textually first.
//! Anything that does not resolve cleanly is a configuration error.

use crate::context::{attr, Context, Value, TOKEN_PATTERN};
use crate::datemath::DateMath;
use crate::error::{DredgeError, Result};
use crate::filter::{SizeRange, TimeRange};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^'(.*?)'$").expect("valid quote regex"));

/// Literal date format for `newerThan` / `olderThan`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of looking a bound up as a variable reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder<T> {
    /// The reference resolved to a value of the wanted type.
    Resolved(T),
    /// Text to parse as a literal or expression.
    WasString(String),
}

/// First resolution step shared by every bound type.
///
/// `extract` picks the wanted type out of a resolved value; `expected` names
/// that type for error messages.
pub fn resolve_placeholder<T>(
    raw: &str,
    ctx: &dyn Context,
    expected: &'static str,
    extract: impl Fn(&Value) -> Option<T>,
) -> Result<Placeholder<T>> {
    let Some(name) = whole_reference(raw) else {
        return Ok(Placeholder::WasString(ctx.replace_tokens(raw)));
    };

    match ctx.resolve(name) {
        Some(value) => {
            if let Some(typed) = extract(&value) {
                return Ok(Placeholder::Resolved(typed));
            }
            match value {
                Value::Text(text) => Ok(Placeholder::WasString(ctx.replace_tokens(&text))),
                other => Err(DredgeError::TypeMismatch {
                    name: name.to_string(),
                    expected,
                    found: other.type_name(),
                }),
            }
        }
        None => Err(DredgeError::UnresolvedVariable(name.to_string())),
    }
}

/// `Some(name)` when `raw` is exactly one `${name}` reference.
fn whole_reference(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let caps = TOKEN_PATTERN.captures(trimmed)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == trimmed.len() {
        caps.get(1).map(|m| m.as_str().trim())
    } else {
        None
    }
}

/// Resolve a `newerThan`/`olderThan` style bound.
pub fn resolve_date(
    attribute: &str,
    raw: Option<&str>,
    ctx: &dyn Context,
    date_math: &dyn DateMath,
) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let text = match resolve_placeholder(raw, ctx, "date", |v| match v {
        Value::Date(d) => Some(*d),
        _ => None,
    })? {
        Placeholder::Resolved(date) => return Ok(Some(date)),
        Placeholder::WasString(text) => text,
    };

    let invalid = |reason: String| DredgeError::InvalidBound {
        attribute: attribute.to_string(),
        value: text.clone(),
        reason,
    };

    if let Some(caps) = QUOTED.captures(&text) {
        let expr = caps[1].strip_prefix("NOW").unwrap_or(&caps[1]);
        return date_math
            .evaluate(expr)
            .map(Some)
            .map_err(|source| DredgeError::DateMath {
                attribute: attribute.to_string(),
                source,
            });
    }

    let naive = NaiveDateTime::parse_from_str(&text, DATE_FORMAT)
        .map_err(|e| invalid(format!("expected yyyy-MM-dd HH:mm:ss: {}", e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| Some(local.with_timezone(&Utc)))
        .ok_or_else(|| invalid("time does not exist in the local zone".to_string()))
}

/// Resolve a `biggerThan`/`smallerThan` style bound.
pub fn resolve_size(attribute: &str, raw: Option<&str>, ctx: &dyn Context) -> Result<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match resolve_placeholder(raw, ctx, "number", |v| match v {
        Value::Int(n) => Some(*n),
        Value::Float(f) => Some(f.trunc() as i64),
        _ => None,
    })? {
        Placeholder::Resolved(size) => Ok(Some(size)),
        Placeholder::WasString(text) => text.parse::<i64>().map(Some).map_err(|e| {
            DredgeError::InvalidBound {
                attribute: attribute.to_string(),
                value: text.clone(),
                reason: e.to_string(),
            }
        }),
    }
}

/// Size and time windows for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedBounds {
    pub size: SizeRange,
    pub time: TimeRange,
}

impl ResolvedBounds {
    /// Read and resolve all four bound attributes from the context.
    pub fn resolve(ctx: &dyn Context, date_math: &dyn DateMath) -> Result<Self> {
        let newer_than = ctx.entity_attribute(attr::NEWER_THAN);
        let older_than = ctx.entity_attribute(attr::OLDER_THAN);
        let bigger_than = ctx.entity_attribute(attr::BIGGER_THAN);
        let smaller_than = ctx.entity_attribute(attr::SMALLER_THAN);

        let time = TimeRange::new(
            resolve_date(attr::NEWER_THAN, newer_than.as_deref(), ctx, date_math)?,
            resolve_date(attr::OLDER_THAN, older_than.as_deref(), ctx, date_math)?,
        );
        let size = SizeRange::new(
            resolve_size(attr::BIGGER_THAN, bigger_than.as_deref(), ctx)?,
            resolve_size(attr::SMALLER_THAN, smaller_than.as_deref(), ctx)?,
        );
        Ok(Self { size, time })
    }
}
