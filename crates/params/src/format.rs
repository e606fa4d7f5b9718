//! Fixed-point number rendering shared by the LCD and serial replies.

use heapless::String;

/// Longest rendered number: sign, ten digits, a point and a leading zero.
pub const NUM_CAPACITY: usize = 16;

/// Render `value` with `frac_digits` digits after an implied decimal point.
///
/// Digits are produced least significant first; the point is inserted once
/// `frac_digits` digits have been emitted, and production stops when the
/// value is exhausted after the point. There is no leading zero before the
/// point:
/// `(5, 2)` → `".05"`, `(100, 2)` → `"1.00"`, `(0, 0)` → `"0"`.
pub fn num_to_string(value: i32, frac_digits: u8) -> String<NUM_CAPACITY> {
    let mut rev: heapless::Vec<u8, NUM_CAPACITY> = heapless::Vec::new();
    let mut n = value.unsigned_abs();
    let mut emitted: u8 = 0;
    loop {
        if frac_digits != 0 && emitted == frac_digits {
            let _ = rev.push(b'.');
        }
        if n == 0 && emitted >= frac_digits && emitted > 0 {
            break;
        }
        let digit = u8::try_from(n % 10).unwrap_or(0);
        let _ = rev.push(b'0'.saturating_add(digit));
        n /= 10;
        emitted = emitted.saturating_add(1);
    }
    if value < 0 {
        let _ = rev.push(b'-');
    }

    let mut out = String::new();
    for &b in rev.iter().rev() {
        let _ = out.push(char::from(b));
    }
    out
}

/// Render `value` right-aligned in `width` columns. A number that does not
/// fit is replaced by `width` asterisks.
pub fn render_field(value: i32, width: u8, frac_digits: u8) -> String<NUM_CAPACITY> {
    let text = num_to_string(value, frac_digits);
    let width = usize::from(width).min(NUM_CAPACITY);
    let mut out = String::new();
    if text.len() > width {
        for _ in 0..width {
            let _ = out.push('*');
        }
        return out;
    }
    for _ in text.len()..width {
        let _ = out.push(' ');
    }
    let _ = out.push_str(&text);
    out
}
