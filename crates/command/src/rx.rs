//! Serial receive ring.
//!
//! The UART receive interrupt pushes bytes with [`SerialRx::on_byte`]; the
//! foreground drains them with [`SerialRx::read`]. A full ring or a line
//! error (framing, overrun) raises the comm-error flag once; it stays raised
//! until the foreground takes it with [`SerialRx::take_error`], however many
//! bytes are lost in between.
//!
//! The ring lives in a `static` shared by both sides, so every method takes
//! `&self` and runs inside a critical section.
//!
//! [`SerialRx::suspend`] masks intake: bytes and line errors that arrive
//! while suspended are discarded without raising the flag.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::spsc::Queue;

struct Ring<const N: usize> {
    queue: Queue<u8, N>,
    error: bool,
    dropped: u32,
    suspended: bool,
}

impl<const N: usize> Ring<N> {
    fn raise(&mut self) {
        if !self.error {
            #[cfg(feature = "defmt")]
            defmt::debug!("serial rx: error episode started");
        }
        self.error = true;
    }
}

/// Interrupt-safe byte ring with a comm-error flag.
pub struct SerialRx<const N: usize> {
    ring: Mutex<RefCell<Ring<N>>>,
}

impl<const N: usize> SerialRx<N> {
    /// Empty ring, no error pending, intake enabled.
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(Ring {
                queue: Queue::new(),
                error: false,
                dropped: 0,
                suspended: false,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Ring<N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.ring.borrow_ref_mut(cs)))
    }

    /// Interrupt side: store a received byte. A full ring drops the byte
    /// and raises the error flag.
    pub fn on_byte(&self, byte: u8) {
        self.with(|ring| {
            if ring.suspended {
                return;
            }
            if ring.queue.enqueue(byte).is_err() {
                ring.dropped = ring.dropped.saturating_add(1);
                ring.raise();
            }
        });
    }

    /// Interrupt side: the UART reported a framing or overrun error.
    pub fn on_line_error(&self) {
        self.with(|ring| {
            if !ring.suspended {
                ring.raise();
            }
        });
    }

    /// Foreground side: next received byte.
    pub fn read(&self) -> Option<u8> {
        self.with(|ring| ring.queue.dequeue())
    }

    /// Foreground side: consume the error flag. Returns `true` once per
    /// error episode.
    pub fn take_error(&self) -> bool {
        self.with(|ring| {
            if ring.error {
                #[cfg(feature = "defmt")]
                defmt::warn!("serial rx: comm error, {} bytes dropped", ring.dropped);
                ring.dropped = 0;
            }
            core::mem::take(&mut ring.error)
        })
    }

    /// Foreground side: discard everything buffered (receive path reset).
    pub fn flush(&self) {
        self.with(|ring| while ring.queue.dequeue().is_some() {});
    }

    /// Foreground side: stop accepting bytes until [`resume`](Self::resume).
    /// Bytes already buffered stay.
    pub fn suspend(&self) {
        self.with(|ring| ring.suspended = true);
    }

    /// Foreground side: accept bytes again.
    pub fn resume(&self) {
        self.with(|ring| ring.suspended = false);
    }

    /// `true` while intake is suspended.
    pub fn is_suspended(&self) -> bool {
        self.with(|ring| ring.suspended)
    }

    /// Bytes waiting.
    pub fn len(&self) -> usize {
        self.with(|ring| ring.queue.len())
    }

    /// `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.with(|ring| ring.queue.is_empty())
    }

    /// Bytes the ring can hold.
    pub fn capacity(&self) -> usize {
        self.with(|ring| ring.queue.capacity())
    }

    /// Bytes dropped since the last [`take_error`](Self::take_error).
    pub fn dropped(&self) -> u32 {
        self.with(|ring| ring.dropped)
    }
}

impl<const N: usize> Default for SerialRx<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn bytes_come_out_in_order() {
        let rx: SerialRx<8> = SerialRx::new();
        for b in b"at" {
            rx.on_byte(*b);
        }
        assert_eq!(rx.read(), Some(b'a'));
        assert_eq!(rx.read(), Some(b't'));
        assert_eq!(rx.read(), None);
        assert!(!rx.take_error());
    }

    #[test]
    fn overflow_raises_one_episode() {
        let rx: SerialRx<8> = SerialRx::new();
        let cap = rx.capacity();
        for i in 0..cap + 5 {
            rx.on_byte(u8::try_from(i).unwrap());
        }
        assert_eq!(rx.len(), cap);
        assert_eq!(rx.dropped(), 5);
        assert!(rx.take_error());
        assert!(!rx.take_error());
        // Oldest bytes were kept.
        assert_eq!(rx.read(), Some(0));
    }

    #[test]
    fn line_error_and_flush() {
        let rx: SerialRx<8> = SerialRx::new();
        rx.on_byte(1);
        rx.on_line_error();
        rx.flush();
        assert!(rx.is_empty());
        assert!(rx.take_error());
    }

    #[test]
    fn suspended_intake_discards_without_error() {
        let rx: SerialRx<8> = SerialRx::new();
        rx.on_byte(b'a');
        rx.suspend();
        assert!(rx.is_suspended());
        for _ in 0..3 * rx.capacity() {
            rx.on_byte(b'x');
        }
        rx.on_line_error();
        rx.resume();
        assert!(!rx.take_error());
        assert_eq!(rx.dropped(), 0);
        assert_eq!(rx.read(), Some(b'a'));
        assert_eq!(rx.read(), None);

        rx.on_byte(b'b');
        assert_eq!(rx.read(), Some(b'b'));
    }
}
