//! Byte-at-a-time command parser.
//!
//! A line is accepted only after an authorization header: `at all` addresses
//! every module on the bus, `at sn:<number>` addresses one module (several
//! numbers may be listed, each followed by `,`). After the header come
//! `name[:value[:taps]]` requests terminated by `\r`, or a binary
//! `program: s:<start> l:<len> d:` session.
//!
//! An `at sn:` header whose numbers do not include this module's serial
//! sends the parser back to idle; the rest of that line is skipped until the
//! next `at` and nothing is emitted.

use heapless::{String, Vec};
use params::Context;
use platform::config::PARSER_IDLE_TICKS;

/// Longest request name or value, in bytes.
pub const FIELD_LEN: usize = 16;

/// Largest tap list a `name:value:taps` request can carry.
pub const MAX_TAPS: usize = 256;

/// Words a program session can carry.
pub const PROGRAM_WORDS: usize = 0x2000;

/// Number of checksum characters that close a program session.
const CHECKSUM_CHARS: u8 = 8;

/// Program images are sent with the count refreshed every this many words.
const PROGRESS_MASK: usize = 0x2f;

/// A parsed `name:value` pair. Names are lower-cased, values keep their case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    /// Parameter or command name
    pub name: String<FIELD_LEN>,
    /// Value text; empty for a read
    pub value: String<FIELD_LEN>,
}

/// Output of [`Parser::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A complete `name[:value]` line.
    Execute(Request),
    /// A `name:value:taps` line. The taps are available from
    /// [`Parser::taps`]; `order` is the tap count raised to at least 3.
    UserFir {
        /// Channel the taps belong to
        context: Context,
        /// Filter order to store
        order: u16,
        /// Request that follows the tap load
        request: Request,
    },
    /// Program session progress: `words` received so far.
    Progress {
        /// Words received
        words: usize,
        /// All words are in; the checksum follows
        done: bool,
    },
    /// Program session complete with a matching checksum. The image is in
    /// [`Parser::program_words_mut`].
    Program {
        /// Start word address
        start: u32,
        /// Image length in words
        len: usize,
    },
    /// Bad program header or checksum mismatch.
    ProgramError,
}

/// Values the parser needs from the rest of the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserContext {
    /// Numeric serial number of this module
    pub serial: u32,
    /// Tap ceiling for User-FIR loads (the current maximum filter order)
    pub max_taps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Idle,
    A,
    At,
    AtA,
    AtAl,
    AtS,
    AtSn,
    SerialStart,
    SerialDigits,
    Command,
    Name,
    Value,
    TapStart,
    TapDigits,
    ProgS,
    ProgSColon,
    ProgStartFirst,
    ProgStart,
    ProgLColon,
    ProgLenFirst,
    ProgLen,
    ProgDColon,
    ProgData,
    ProgChecksum,
}

/// The serial command parser.
pub struct Parser {
    state: State,
    authorized: bool,
    number: u32,
    request: Request,
    tap_context: Context,
    taps: Vec<i16, MAX_TAPS>,
    tap_value: i32,
    tap_negative: bool,
    prog_start: u32,
    prog_len: usize,
    received: usize,
    sum: u32,
    checksum: u32,
    checksum_chars: u8,
    image: [u16; PROGRAM_WORDS],
    idle_ticks: u16,
}

impl Parser {
    /// A parser waiting for a header.
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            authorized: false,
            number: 0,
            request: Request {
                name: String::new(),
                value: String::new(),
            },
            tap_context: Context::A,
            taps: Vec::new(),
            tap_value: 0,
            tap_negative: false,
            prog_start: 0,
            prog_len: 0,
            received: 0,
            sum: 0,
            checksum: 0,
            checksum_chars: 0,
            image: [0; PROGRAM_WORDS],
            idle_ticks: 0,
        }
    }

    /// `true` when no line is in progress.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Taps of the last [`Event::UserFir`].
    pub fn taps(&self) -> &[i16] {
        &self.taps
    }

    /// Image of the last [`Event::Program`]. Mutable so the caller can patch
    /// it before programming.
    pub fn program_words_mut(&mut self) -> &mut [u16] {
        let len = self.prog_len.min(PROGRAM_WORDS);
        self.image.get_mut(..len).unwrap_or(&mut [])
    }

    /// Drop any half-received line.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.authorized = false;
        self.idle_ticks = 0;
    }

    /// One foreground tick without input. A line left unfinished for
    /// [`PARSER_IDLE_TICKS`] ticks is dropped.
    pub fn tick(&mut self) {
        if self.state == State::Idle {
            return;
        }
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        if self.idle_ticks >= PARSER_IDLE_TICKS {
            #[cfg(feature = "defmt")]
            defmt::debug!("parser: idle timeout in {}", self.state);
            self.reset();
        }
    }

    /// Consume one received byte.
    pub fn feed(&mut self, byte: u8, ctx: &ParserContext) -> Option<Event> {
        self.idle_ticks = 0;
        let event = self.step(byte, ctx);
        if self.authorized {
            event
        } else {
            None
        }
    }

    fn step(&mut self, raw: u8, ctx: &ParserContext) -> Option<Event> {
        let c = raw.to_ascii_lowercase();
        match self.state {
            State::Idle => {
                self.authorized = false;
                if c == b'a' {
                    self.state = State::A;
                }
            }
            State::A => {
                self.state = match c {
                    b't' => State::At,
                    b'a' => State::A,
                    _ => State::Idle,
                }
            }
            State::At => {
                self.state = match c {
                    b'a' => State::AtA,
                    b's' => State::AtS,
                    b' ' => State::At,
                    _ => State::Idle,
                }
            }
            State::AtA => {
                self.state = match c {
                    b't' => State::At,
                    b'l' => State::AtAl,
                    _ => State::Idle,
                }
            }
            State::AtAl => {
                if c == b'l' {
                    self.authorized = true;
                    self.state = State::Command;
                } else {
                    self.state = State::Idle;
                }
            }
            State::AtS => self.expect(c, b'n', State::AtSn),
            State::AtSn => self.expect(c, b':', State::SerialStart),
            State::SerialStart => match c {
                b' ' => {}
                d if d.is_ascii_digit() => {
                    self.number = digit(d);
                    self.state = State::SerialDigits;
                }
                _ => self.state = State::Idle,
            },
            State::SerialDigits => match c {
                d if d.is_ascii_digit() => self.number = push_digit(self.number, d),
                b' ' => {}
                b',' => {
                    if self.number == ctx.serial {
                        self.authorized = true;
                        self.state = State::Command;
                    }
                    self.number = 0;
                }
                _ => {
                    if self.number == ctx.serial {
                        self.authorized = true;
                        self.state = State::Command;
                        return self.step(raw, ctx);
                    }
                    self.state = State::Idle;
                }
            },
            State::Command => match c {
                b'\r' => self.state = State::Idle,
                l if l.is_ascii_alphabetic() => {
                    self.request.name.clear();
                    self.request.value.clear();
                    self.append_name(l);
                    self.state = State::Name;
                }
                _ => {}
            },
            State::Name => match c {
                b'\r' => return Some(self.finish_line()),
                b':' if self.request.name.starts_with("program") => {
                    self.prog_start = 0;
                    self.prog_len = 0;
                    self.state = State::ProgS;
                }
                b':' => self.state = State::Value,
                _ => self.append_name(c),
            },
            State::Value => match c {
                b'\r' => return Some(self.finish_line()),
                b':' => self.start_taps(),
                _ => {
                    if self.request.value.push(char::from(raw)).is_err() {
                        self.state = State::Idle;
                    }
                }
            },
            State::TapStart => match c {
                b' ' => {}
                b'-' => {
                    self.tap_negative = true;
                    self.tap_value = 0;
                    self.state = State::TapDigits;
                }
                d if d.is_ascii_digit() => {
                    self.tap_negative = false;
                    self.tap_value = i32::from(d.saturating_sub(b'0'));
                    self.state = State::TapDigits;
                }
                b'\r' => return Some(self.finish_taps()),
                _ => self.abort_taps(),
            },
            State::TapDigits => match c {
                d if d.is_ascii_digit() => {
                    self.tap_value = self
                        .tap_value
                        .saturating_mul(10)
                        .saturating_add(i32::from(d.saturating_sub(b'0')));
                }
                b' ' | b'\r' => {
                    let value = if self.tap_negative {
                        self.tap_value.saturating_neg()
                    } else {
                        self.tap_value
                    };
                    let tap = i16::try_from(value)
                        .unwrap_or(if value < 0 { i16::MIN } else { i16::MAX });
                    let ceiling = ctx.max_taps.min(MAX_TAPS);
                    if self.taps.len() < ceiling {
                        let _ = self.taps.push(tap);
                    }
                    if c == b'\r' || self.taps.len() >= ceiling {
                        return Some(self.finish_taps());
                    }
                    self.state = State::TapStart;
                }
                _ => self.abort_taps(),
            },
            State::ProgS => self.expect_spaced(c, b's', State::ProgSColon),
            State::ProgSColon => self.expect_spaced(c, b':', State::ProgStartFirst),
            State::ProgStartFirst => match c {
                b' ' => {}
                d if d.is_ascii_digit() => {
                    self.prog_start = digit(d);
                    self.state = State::ProgStart;
                }
                _ => self.state = State::Idle,
            },
            State::ProgStart => match c {
                d if d.is_ascii_digit() => self.prog_start = push_digit(self.prog_start, d),
                b' ' => {}
                b'l' => self.state = State::ProgLColon,
                _ => self.state = State::Idle,
            },
            State::ProgLColon => self.expect_spaced(c, b':', State::ProgLenFirst),
            State::ProgLenFirst => match c {
                b' ' => {}
                d if d.is_ascii_digit() => {
                    self.prog_len = usize::from(d.saturating_sub(b'0'));
                    self.state = State::ProgLen;
                }
                _ => self.state = State::Idle,
            },
            State::ProgLen => match c {
                d if d.is_ascii_digit() => {
                    self.prog_len = self
                        .prog_len
                        .saturating_mul(10)
                        .saturating_add(usize::from(d.saturating_sub(b'0')));
                }
                b' ' => {}
                b'd' => self.state = State::ProgDColon,
                _ => self.state = State::Idle,
            },
            State::ProgDColon => match c {
                b' ' => {}
                b':' => return Some(self.begin_program()),
                _ => self.state = State::Idle,
            },
            State::ProgData => return self.program_byte(raw),
            State::ProgChecksum => return self.checksum_char(c),
        }
        None
    }

    fn expect(&mut self, c: u8, want: u8, next: State) {
        self.state = if c == want { next } else { State::Idle };
    }

    fn expect_spaced(&mut self, c: u8, want: u8, next: State) {
        if c != b' ' {
            self.expect(c, want, next);
        }
    }

    fn append_name(&mut self, c: u8) {
        if self.request.name.push(char::from(c)).is_err() {
            self.state = State::Idle;
        }
    }

    fn finish_line(&mut self) -> Event {
        self.state = State::Idle;
        Event::Execute(core::mem::take(&mut self.request))
    }

    fn start_taps(&mut self) {
        self.tap_context = match self.request.name.as_bytes().first() {
            Some(b'a') => Context::A,
            Some(b'b') => Context::B,
            Some(b'f') => Context::Common,
            _ => {
                self.state = State::Idle;
                return;
            }
        };
        self.taps.clear();
        self.state = State::TapStart;
    }

    fn abort_taps(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::debug!("parser: tap list aborted after {} taps", self.taps.len());
        self.taps.clear();
        self.state = State::Idle;
    }

    fn finish_taps(&mut self) -> Event {
        self.state = State::Idle;
        let order = u16::try_from(self.taps.len().max(3)).unwrap_or(u16::MAX);
        Event::UserFir {
            context: self.tap_context,
            order,
            request: core::mem::take(&mut self.request),
        }
    }

    fn begin_program(&mut self) -> Event {
        let start_ok = self.prog_start & 0x1fff == 0 && self.prog_start <= 0xE000;
        let len_ok = self.prog_len > 0 && self.prog_len <= PROGRAM_WORDS;
        if !(start_ok && len_ok) {
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "parser: bad program header s:{} l:{}",
                self.prog_start,
                self.prog_len
            );
            self.state = State::Idle;
            return Event::ProgramError;
        }
        self.received = 0;
        self.sum = 0;
        self.state = State::ProgData;
        Event::Progress {
            words: 0,
            done: false,
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: received < 2 * prog_len ≤ 2 * PROGRAM_WORDS
    fn program_byte(&mut self, raw: u8) -> Option<Event> {
        let word = self.received / 2;
        if let Some(slot) = self.image.get_mut(word) {
            if self.received % 2 == 0 {
                *slot = u16::from(raw) << 8;
            } else {
                *slot |= u16::from(raw);
            }
        }
        self.sum = self.sum.wrapping_add(u32::from(raw));
        self.received += 1;

        if self.received >= 2 * self.prog_len {
            self.checksum = 0;
            self.checksum_chars = 0;
            self.state = State::ProgChecksum;
            return Some(Event::Progress {
                words: self.prog_len,
                done: true,
            });
        }
        if self.received % 2 == 0 && (word + 1) & PROGRESS_MASK == 0 {
            return Some(Event::Progress {
                words: word + 1,
                done: false,
            });
        }
        None
    }

    fn checksum_char(&mut self, c: u8) -> Option<Event> {
        match c {
            d if d.is_ascii_digit() => self.checksum = push_digit(self.checksum, d),
            b' ' => {}
            _ => {
                self.state = State::Idle;
                return Some(Event::ProgramError);
            }
        }
        self.checksum_chars = self.checksum_chars.saturating_add(1);
        if self.checksum_chars < CHECKSUM_CHARS {
            return None;
        }
        self.state = State::Idle;
        if self.checksum == self.sum {
            Some(Event::Program {
                start: self.prog_start,
                len: self.prog_len,
            })
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "parser: program checksum {} != {}",
                self.checksum,
                self.sum
            );
            Some(Event::ProgramError)
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn digit(d: u8) -> u32 {
    u32::from(d.saturating_sub(b'0'))
}

fn push_digit(acc: u32, d: u8) -> u32 {
    acc.saturating_mul(10).saturating_add(digit(d))
}
