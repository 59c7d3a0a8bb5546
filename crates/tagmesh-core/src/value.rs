// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Decoded, user-visible tag values.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Kind of embedded expression carried by an unevaluated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// Evaluated during value resolution when an evaluator is present.
    Formula,
    /// Executed by an external action runtime; never evaluated for values.
    Script,
}

/// Embedded expression text with its kind (prefix marker stripped).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr {
    /// Formula or script.
    pub kind: ExprKind,
    /// Expression source without the prefix marker.
    pub source: String,
}

impl Expr {
    /// Creates a formula expression.
    pub fn formula(source: impl Into<String>) -> Self {
        Self {
            kind: ExprKind::Formula,
            source: source.into(),
        }
    }

    /// Creates an action-script expression.
    pub fn script(source: impl Into<String>) -> Self {
        Self {
            kind: ExprKind::Script,
            source: source.into(),
        }
    }
}

/// Zone a date value is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateZone {
    /// Coordinated universal time (`Z`).
    Utc,
    /// The process-local calendar zone. Not portable across machines.
    Local,
    /// A fixed numeric UTC offset.
    Offset(FixedOffset),
    /// A named IANA zone.
    Named(Tz),
}

/// Timezone-aware instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateValue {
    /// The absolute instant.
    pub instant: DateTime<Utc>,
    /// Zone used for the wall-clock representation.
    pub zone: DateZone,
}

impl DateValue {
    /// Creates a UTC date value.
    #[must_use]
    pub fn utc(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            zone: DateZone::Utc,
        }
    }

    /// Wall-clock time of the instant in its zone.
    #[must_use]
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self.zone {
            DateZone::Utc => self.instant.naive_utc(),
            DateZone::Local => self.instant.with_timezone(&Local).naive_local(),
            DateZone::Offset(offset) => self.instant.with_timezone(&offset).naive_local(),
            DateZone::Named(tz) => self.instant.with_timezone(&tz).naive_local(),
        }
    }
}

/// Typed tag value produced by [`crate::codec::decode`].
///
/// "No value" is represented by `Option::None` at the call sites.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// IEEE-754 number (may be NaN or infinite).
    Number(f64),
    /// Boolean literal.
    Bool(bool),
    /// Plain string.
    Str(String),
    /// Bracketed list literal.
    Array(Vec<TypedValue>),
    /// Ordered list of record ids.
    Link(Vec<String>),
    /// Timezone-aware instant.
    Date(DateValue),
    /// Embedded expression that has not been evaluated.
    Unevaluated(Expr),
}

impl TypedValue {
    /// Convenience constructor for strings.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Returns the number when the value is numeric.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean when the value is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string slice when the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for embedded formulas awaiting evaluation.
    #[must_use]
    pub fn is_formula(&self) -> bool {
        matches!(
            self,
            Self::Unevaluated(Expr {
                kind: ExprKind::Formula,
                ..
            })
        )
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// User-facing rendering: strings without prefix markers, numbers in
/// shortest form, formulas and scripts as their original text.
impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&crate::codec::format_number(*n)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Link(_) | Self::Date(_) | Self::Unevaluated(_) => {
                f.write_str(&crate::codec::encode(self))
            }
        }
    }
}
