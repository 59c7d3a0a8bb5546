// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Textual tag value codec.
//!
//! Raw tag text is sniffed once, in a fixed priority order, and turned into a
//! [`TypedValue`]. Decoding is total: malformed literals become `NaN` or "no
//! value" (`None`), never an error.
//!
//! | marker | meaning |
//! |---|---|
//! | `=` | formula, evaluated during resolution |
//! | `@` | action script, never evaluated here |
//! | `🔗` | comma-separated record ids |
//! | `📅` | date, optionally followed by ` local`, ` utc` or an IANA zone |
//! | `🔢` | forced number (`NaN` when unparsable) |
//! | `📝` | forced string |
//!
//! Unprefixed text is tried as `true`/`false`, then as a number, then as a
//! bracketed list, and otherwise kept as a string. List elements are split on
//! top-level commas and trimmed; an element that decodes to no value (a bad
//! date, say) is kept as its text.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::record::RawValue;
use crate::value::{DateValue, DateZone, Expr, ExprKind, TypedValue};

/// Marks a formula.
pub const FORMULA_PREFIX: &str = "=";
/// Marks an action script.
pub const SCRIPT_PREFIX: &str = "@";
/// Marks a forced number.
pub const NUMBER_TAG_PREFIX: &str = "🔢";
/// Marks a forced string.
pub const STRING_TAG_PREFIX: &str = "📝";
/// Marks a list of record ids.
pub const LINK_TAG_PREFIX: &str = "🔗";
/// Marks a date.
pub const DATE_TAG_PREFIX: &str = "📅";

const STAMP: &str = "%Y-%m-%dT%H:%M:%S%.f";
const STAMP_WITH_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
const LOCAL_ZONE_WORD: &str = "local";
const UTC_ZONE_WORD: &str = "utc";

/// Decodes raw tag text.
#[must_use]
pub fn decode(text: &str) -> Option<TypedValue> {
    if let Some(source) = text.strip_prefix(FORMULA_PREFIX) {
        return Some(TypedValue::Unevaluated(Expr::formula(source)));
    }
    if let Some(source) = text.strip_prefix(SCRIPT_PREFIX) {
        return Some(TypedValue::Unevaluated(Expr::script(source)));
    }
    if let Some(rest) = text.strip_prefix(LINK_TAG_PREFIX) {
        return Some(TypedValue::Link(parse_links(rest)));
    }
    if let Some(rest) = text.strip_prefix(DATE_TAG_PREFIX) {
        return parse_date(rest).map(TypedValue::Date);
    }
    if let Some(rest) = text.strip_prefix(NUMBER_TAG_PREFIX) {
        return Some(TypedValue::Number(parse_number(rest).unwrap_or(f64::NAN)));
    }
    if let Some(rest) = text.strip_prefix(STRING_TAG_PREFIX) {
        return Some(TypedValue::Str(rest.to_owned()));
    }
    match text {
        "true" => return Some(TypedValue::Bool(true)),
        "false" => return Some(TypedValue::Bool(false)),
        _ => {}
    }
    if let Some(n) = parse_number(text) {
        return Some(TypedValue::Number(n));
    }
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let items = split_list(inner)
            .into_iter()
            .map(|token| {
                let token = token.trim();
                decode(token).unwrap_or_else(|| TypedValue::str(token))
            })
            .collect();
        return Some(TypedValue::Array(items));
    }
    Some(TypedValue::Str(text.to_owned()))
}

/// Decodes a stored raw value. `Null` decodes to "no value".
#[must_use]
pub fn decode_raw(raw: &RawValue) -> Option<TypedValue> {
    match raw {
        RawValue::Null => None,
        RawValue::Bool(b) => Some(TypedValue::Bool(*b)),
        RawValue::Number(n) => Some(TypedValue::Number(*n)),
        RawValue::Text(text) => decode(text),
        RawValue::List(items) => Some(TypedValue::Array(
            items.iter().filter_map(decode_raw).collect(),
        )),
    }
}

/// Encodes a typed value back into tag text.
///
/// `decode(&encode(v)) == Some(v)` for every representable value, with these
/// exceptions:
/// - dates in [`DateZone::Local`] only round-trip inside the same process
///   timezone;
/// - array elements whose text contains a top-level comma or an unbalanced
///   bracket, or starts or ends with whitespace, are split or trimmed on the
///   way back. This covers links with more than one id (`[🔗a,b]` decodes
///   as a one-id link followed by the string `b`).
#[must_use]
pub fn encode(value: &TypedValue) -> String {
    match value {
        TypedValue::Number(n) if n.is_nan() => format!("{NUMBER_TAG_PREFIX}NaN"),
        TypedValue::Number(n) => format_number(*n),
        TypedValue::Bool(b) => b.to_string(),
        TypedValue::Str(s) => {
            if decode(s).as_ref().and_then(TypedValue::as_str) == Some(s.as_str()) {
                s.clone()
            } else {
                format!("{STRING_TAG_PREFIX}{s}")
            }
        }
        TypedValue::Array(items) => {
            let parts: Vec<String> = items.iter().map(encode_element).collect();
            format!("[{}]", parts.join(", "))
        }
        TypedValue::Link(ids) => format!("{LINK_TAG_PREFIX}{}", ids.join(",")),
        TypedValue::Date(date) => format!("{DATE_TAG_PREFIX}{}", format_date(date)),
        TypedValue::Unevaluated(expr) => match expr.kind {
            ExprKind::Formula => format!("{FORMULA_PREFIX}{}", expr.source),
            ExprKind::Script => format!("{SCRIPT_PREFIX}{}", expr.source),
        },
    }
}

/// List elements need a marker where bare text would vanish: `[]` is the
/// empty list, not a list holding one empty string.
fn encode_element(value: &TypedValue) -> String {
    match value {
        TypedValue::Str(s) if s.is_empty() => STRING_TAG_PREFIX.to_owned(),
        other => encode(other),
    }
}

/// Returns `true` when the raw value is formula text.
#[must_use]
pub fn is_formula(raw: &RawValue) -> bool {
    raw.as_text().is_some_and(|t| t.starts_with(FORMULA_PREFIX))
}

/// Returns `true` when the raw value is action-script text.
#[must_use]
pub fn is_script(raw: &RawValue) -> bool {
    raw.as_text().is_some_and(|t| t.starts_with(SCRIPT_PREFIX))
}

/// Returns `true` when `text` matches the numeric literal grammar.
#[must_use]
pub fn is_number(text: &str) -> bool {
    parse_number(text).is_some()
}

/// Parses a numeric literal.
///
/// Grammar: optional `-`, digits, optional `.digits`, optional exponent, or
/// a case-insensitive `infinity`. At least one digit is required and a
/// trailing dot (`"1."`) is rejected.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if body.eq_ignore_ascii_case("infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let bytes = body.as_bytes();
    let mut i = 0;
    let int_digits = count_digits(bytes, &mut i);
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = count_digits(bytes, &mut i);
        if frac_digits == 0 {
            return None;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if count_digits(bytes, &mut i) == 0 {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok()
}

fn count_digits(bytes: &[u8], i: &mut usize) -> usize {
    let start = *i;
    while bytes.get(*i).is_some_and(u8::is_ascii_digit) {
        *i += 1;
    }
    *i - start
}

/// Shortest decimal text for a number (`Infinity`, `-Infinity`, `NaN` for
/// the non-finite cases).
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n == f64::INFINITY {
        "Infinity".to_owned()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        format!("{n}")
    }
}

fn parse_links(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Splits list content on top-level commas (nested brackets kept intact).
fn split_list(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in inner.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

// --- dates -----------------------------------------------------------------

#[derive(Clone, Copy)]
enum StampOffset {
    Utc,
    Fixed(FixedOffset),
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Reads exactly `n` ASCII digits.
    fn digits(&mut self, n: usize) -> Option<u32> {
        let slice = self.bytes.get(self.pos..self.pos + n)?;
        let mut value = 0u32;
        for b in slice {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value * 10 + u32::from(b - b'0');
        }
        self.pos += n;
        Some(value)
    }

    /// Reads a fractional-second digit run as nanoseconds (max 9 digits kept).
    fn fraction(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let run = &self.bytes[start..self.pos];
        if run.is_empty() {
            return None;
        }
        let mut nanos = 0u32;
        for i in 0..9 {
            let digit = run.get(i).map_or(0, |b| u32::from(b - b'0'));
            nanos = nanos * 10 + digit;
        }
        Some(nanos)
    }

    fn done(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

fn parse_stamp(text: &str) -> Option<(NaiveDateTime, Option<StampOffset>)> {
    let mut cur = Cursor::new(text);
    let year = cur.digits(4)?;
    let mut month = 1;
    let mut day = 1;
    if cur.eat(b'-') {
        month = cur.digits(2)?;
        if cur.eat(b'-') {
            day = cur.digits(2)?;
        }
    }
    let (mut hour, mut minute, mut second, mut nanos) = (0, 0, 0, 0);
    if cur.eat(b'T') {
        hour = cur.digits(2)?;
        if !cur.eat(b':') {
            return None;
        }
        minute = cur.digits(2)?;
        if cur.eat(b':') {
            second = cur.digits(2)?;
            if cur.eat(b'.') {
                nanos = cur.fraction()?;
            }
        }
    }
    let offset = match cur.peek() {
        Some(b'Z') => {
            cur.pos += 1;
            Some(StampOffset::Utc)
        }
        Some(sign @ (b'+' | b'-')) => {
            cur.pos += 1;
            let hh = cur.digits(2)?;
            let mm = if cur.eat(b':') {
                cur.digits(2)?
            } else {
                cur.digits(2).unwrap_or(0)
            };
            let secs = i32::try_from(hh * 3600 + mm * 60).ok()?;
            let secs = if sign == b'-' { -secs } else { secs };
            Some(StampOffset::Fixed(FixedOffset::east_opt(secs)?))
        }
        _ => None,
    };
    if !cur.done() {
        return None;
    }
    let year = i32::try_from(year).ok()?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_nano_opt(hour, minute, second, nanos)?;
    Some((naive, offset))
}

fn parse_zone_word(word: &str) -> Option<DateZone> {
    if word.eq_ignore_ascii_case(LOCAL_ZONE_WORD) {
        Some(DateZone::Local)
    } else if word.eq_ignore_ascii_case(UTC_ZONE_WORD) {
        Some(DateZone::Utc)
    } else {
        word.parse::<Tz>().ok().map(DateZone::Named)
    }
}

/// Interprets a wall-clock time in `zone`. Gaps yield `None`; folds take
/// the earlier instant.
fn localize(naive: &NaiveDateTime, zone: DateZone) -> Option<DateTime<Utc>> {
    match zone {
        DateZone::Utc => Some(Utc.from_utc_datetime(naive)),
        DateZone::Local => Local
            .from_local_datetime(naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
        DateZone::Offset(offset) => offset
            .from_local_datetime(naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        DateZone::Named(tz) => tz
            .from_local_datetime(naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn parse_date(text: &str) -> Option<DateValue> {
    let (stamp, zone_word) = match text.split_once(' ') {
        Some((stamp, word)) => (stamp, Some(word.trim())),
        None => (text, None),
    };
    let (naive, offset) = parse_stamp(stamp)?;
    let zone = match zone_word {
        None | Some("") => None,
        Some(word) => Some(parse_zone_word(word)?),
    };

    let (instant, zone) = match offset {
        Some(StampOffset::Utc) => (
            Utc.from_utc_datetime(&naive),
            zone.unwrap_or(DateZone::Utc),
        ),
        Some(StampOffset::Fixed(fixed)) => (
            localize(&naive, DateZone::Offset(fixed))?,
            zone.unwrap_or(DateZone::Offset(fixed)),
        ),
        None => {
            let zone = zone.unwrap_or(DateZone::Utc);
            (localize(&naive, zone)?, zone)
        }
    };
    Some(DateValue { instant, zone })
}

fn format_date(date: &DateValue) -> String {
    match date.zone {
        DateZone::Utc => format!("{}Z", date.instant.format(STAMP)),
        DateZone::Local => format!(
            "{} {LOCAL_ZONE_WORD}",
            date.instant.with_timezone(&Local).format(STAMP)
        ),
        DateZone::Offset(offset) => date
            .instant
            .with_timezone(&offset)
            .format(STAMP_WITH_OFFSET)
            .to_string(),
        DateZone::Named(tz) => format!(
            "{} {}",
            date.instant.with_timezone(&tz).format(STAMP_WITH_OFFSET),
            tz.name()
        ),
    }
}
