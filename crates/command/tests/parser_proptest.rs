//! Property-based tests for the serial path.
//! Random traffic must never produce events without an authorization
//! header, and the receive ring must never lose ordering.

use command::{Event, Parser, ParserContext, SerialRx};
use proptest::prelude::*;

const CTX: ParserContext = ParserContext {
    serial: 132_001,
    max_taps: 128,
};

fn run(p: &mut Parser, bytes: &[u8]) -> Vec<Event> {
    bytes.iter().filter_map(|b| p.feed(*b, &CTX)).collect()
}

proptest! {
    /// Traffic that never contains an `at` header is ignored entirely.
    #[test]
    fn headerless_traffic_is_ignored(bytes in proptest::collection::vec(
        any::<u8>().prop_filter("no 't'", |b| !b.eq_ignore_ascii_case(&b't')), 0..400)) {
        let mut p = Parser::new();
        prop_assert!(run(&mut p, &bytes).is_empty());
    }

    /// A line addressed to a different serial number never executes,
    /// whatever request follows the header.
    #[test]
    fn foreign_serial_is_ignored(
        serial in 0u32..1_000_000,
        name in "[b-z]{1,12}",
        value in "[0-9]{0,6}",
    ) {
        prop_assume!(serial != CTX.serial);
        let mut p = Parser::new();
        let line = format!("at sn:{serial},{name}:{value}\r");
        prop_assert!(run(&mut p, line.as_bytes()).is_empty());
        prop_assert!(p.is_idle());
    }

    /// After any garbage, a well-formed `at all` line still parses once the
    /// parser has returned to idle.
    #[test]
    fn recovers_after_garbage(garbage in proptest::collection::vec(any::<u8>(), 0..200)) {
        let mut p = Parser::new();
        let _ = run(&mut p, &garbage);
        p.reset();
        let ev = run(&mut p, b"at all lpgain:1\r");
        prop_assert_eq!(ev.len(), 1);
        let is_execute = matches!(ev.first(), Some(Event::Execute(r)) if r.name == "lpgain");
        prop_assert!(is_execute);
    }

    /// The ring delivers bytes in order and raises the error flag exactly
    /// when it overflowed.
    #[test]
    fn ring_order_and_overflow(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let rx: SerialRx<32> = SerialRx::new();
        for b in &bytes {
            rx.on_byte(*b);
        }
        let cap = rx.capacity();
        let mut out = Vec::new();
        while let Some(b) = rx.read() {
            out.push(b);
        }
        let kept = bytes.len().min(cap);
        prop_assert_eq!(&out[..], &bytes[..kept]);
        prop_assert_eq!(rx.take_error(), bytes.len() > cap);
        prop_assert!(!rx.take_error());
    }
}
