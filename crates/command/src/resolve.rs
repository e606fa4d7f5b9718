//! Name and value resolution for `name:value` requests.
//!
//! Names are matched against the LCD templates. A template that starts with
//! a letter is an Options parameter and matches the bare name. A template
//! that starts with a space is a function parameter: the bare name addresses
//! the Common context, a leading `a` or `b` addresses that channel.

use params::descriptor::DESCRIPTORS;
use params::{Bounds, Context, Descriptor, Mode, ParamKind, ParamStore, Selection};
use thiserror_no_std::Error;

/// Why a request was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// No template matches the name.
    #[error("no parameter matches the name")]
    UnknownName,
    /// Channel prefix other than `a` or `b`.
    #[error("channel prefix is not a or b")]
    BadChannel,
    /// Common context addressed in a separate mode, or a channel in common
    /// mode.
    #[error("context does not exist in the current mode")]
    WrongMode,
    /// Parameter is not part of the function assigned to the context.
    #[error("parameter belongs to an inactive function")]
    InactiveFunction,
    /// Value text matches no label of an enumerated parameter.
    #[error("value matches no label")]
    NoSuchLabel,
}

/// What a request does with the resolved parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    /// Empty value: report the current value.
    Read,
    /// New raw value, already clamped for numeric parameters.
    Write(i32),
}

/// Case-insensitive prefix comparison: the strings match if they agree up to
/// the end of the shorter one. An empty string matches anything.
pub fn string_compare(a: &str, b: &str) -> bool {
    a.bytes()
        .zip(b.bytes())
        .all(|(x, y)| x.eq_ignore_ascii_case(&y))
}

/// Resolve a request name to the parameter it addresses, checking it against
/// the current mode and function assignment.
pub fn resolve_name(name: &str, store: &ParamStore) -> Result<Selection, ParseError> {
    let (index, context, in_options) = search(name)?;
    if in_options {
        return Ok(Selection::option(index));
    }

    let mode = store.mode();
    match (mode, context) {
        (Mode::Common, Context::A | Context::B) => return Err(ParseError::WrongMode),
        (Mode::Separate | Mode::ChannelAOnly, Context::Common) => {
            return Err(ParseError::WrongMode)
        }
        _ => {}
    }
    if index != 0 && !store.function(context).owns(index) {
        return Err(ParseError::InactiveFunction);
    }
    Ok(Selection {
        param: index,
        context,
        in_options: false,
    })
}

/// First table row whose template matches `name`, in table order.
fn search(name: &str) -> Result<(usize, Context, bool), ParseError> {
    for (index, d) in DESCRIPTORS.iter().enumerate() {
        if string_compare(d.template, name) {
            return Ok((index, Context::A, true));
        }
        let Some(rest) = d.template.strip_prefix(' ') else {
            continue;
        };
        if string_compare(rest, name) {
            return Ok((index, Context::Common, false));
        }
        let mut chars = name.chars();
        let prefix = chars.next();
        if string_compare(rest, chars.as_str()) {
            let context = match prefix.map(|c| c.to_ascii_lowercase()) {
                Some('a') => Context::A,
                Some('b') => Context::B,
                _ => return Err(ParseError::BadChannel),
            };
            return Ok((index, context, false));
        }
    }
    Err(ParseError::UnknownName)
}

/// Interpret the value text of a request for `descriptor`.
///
/// Leading spaces are skipped; nothing left means a read. Enumerated values
/// match a label by case-insensitive prefix. Numeric values are decimal with
/// an optional `-` and `.`; digits past the descriptor's fraction width are
/// dropped, missing ones count as zero. The result is clamped to `bounds`.
pub fn parse_value(
    text: &str,
    descriptor: &Descriptor,
    bounds: Bounds,
) -> Result<Value, ParseError> {
    let text = text.trim_start_matches(' ');
    if text.is_empty() {
        return Ok(Value::Read);
    }

    match descriptor.layout.kind {
        ParamKind::Enumerated { labels } => {
            if labels.is_empty() {
                return Ok(Value::Write(0));
            }
            labels
                .iter()
                .position(|label| string_compare(label.trim_start_matches(' '), text))
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Write)
                .ok_or(ParseError::NoSuchLabel)
        }
        ParamKind::Numeric { frac_digits, .. } => {
            Ok(Value::Write(bounds.clamp(parse_fixed(text, frac_digits))))
        }
    }
}

/// Fixed-point decimal with `frac` digits after the point.
///
/// The first non-digit marks the decimal point; from there exactly `frac`
/// more positions are taken, digits where present and zeros past the end.
fn parse_fixed(text: &str, frac: u8) -> i32 {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut bytes = digits.bytes();
    let mut value: i64 = 0;
    let mut seen_point = false;
    let mut taken: u8 = 0;
    loop {
        let digit = bytes
            .next()
            .filter(u8::is_ascii_digit)
            .map(|b| i64::from(b.saturating_sub(b'0')));
        match digit {
            None if !seen_point => seen_point = true,
            d => {
                value = value
                    .saturating_mul(10)
                    .saturating_add(d.unwrap_or(0))
                    .clamp(i64::from(i32::MIN), i64::from(i32::MAX));
                if seen_point {
                    taken = taken.saturating_add(1);
                }
            }
        }
        if seen_point && taken >= frac {
            break;
        }
    }

    let value = if negative { value.saturating_neg() } else { value };
    i32::try_from(value).unwrap_or(if negative { i32::MIN } else { i32::MAX })
}

/// Built-in commands recognised by their name prefix before any parameter
/// lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Factory reset.
    Reset,
    /// Show text on the LCD, or redisplay when empty.
    Display,
    /// Transmit the serial number after a random delay.
    SendSn,
    /// Suppress later `sendsn` replies.
    QuietSn,
    /// Show and transmit the value text.
    Echo,
    /// Anything else addresses a parameter.
    Parameter,
}

impl Command {
    /// Classify a request name.
    pub fn classify(name: &str) -> Self {
        const PREFIXES: [(&str, Command); 5] = [
            ("reset", Command::Reset),
            ("display", Command::Display),
            ("sendsn", Command::SendSn),
            ("quietsn", Command::QuietSn),
            ("echo", Command::Echo),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(*prefix))
            .map_or(Command::Parameter, |(_, cmd)| *cmd)
    }
}
