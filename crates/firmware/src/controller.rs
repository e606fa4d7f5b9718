//! Foreground controller.
//!
//! Owns the control state, the serial parser, the settings log and the
//! panel peripherals. The interrupt side only fills a [`SerialRx`] ring and
//! an [`InputQueue`]; everything else happens in [`Controller::poll`], called
//! once per [`TICK_US`] foreground tick:
//!
//! 1. report a serial line error
//! 2. run received bytes through the parser and execute what it produces
//! 3. route knob events
//! 4. dispatch the pending parameter change
//! 5. blink the cursor and count towards the automatic level display
//!
//! Operator messages are shown for a fixed time with the [`DelayNs`] the
//! controller was built with; the foreground does nothing else meanwhile.
//!
//! [`TICK_US`]: platform::config::TICK_US

use command::{
    parse_value, resolve_name, Command, Event, Parser, ParserContext, Request, SerialRx, Value,
};
use control::screen::{place_cursor, redisplay, show_message, show_number};
use control::{Action, ControlState, Dispatcher, InputQueue, LevelDisplay, Reaction, Router};
use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use embedded_storage::nor_flash::NorFlash;
use flash_log::{FlashLog, Identity, LogError, LogHealth, SectorProgrammer, Stage, STAGING_WORDS};
use heapless::String;
use params::descriptor::id;
use params::format::{num_to_string, render_field, NUM_CAPACITY};
use params::serial::{code_words_blank, SERIAL_WORDS};
use params::{descriptor, Descriptor, ParamKind, ParamStore, Selection, SerialNumber, Severity};
use platform::config::{version_banner, CURSOR_PERIOD, FIRMWARE_VERSION, SERIAL_BUF_LEN};
use platform::display::{BEEP_BOUNDARY, BEEP_CONFIRM, BEEP_ERROR};
use platform::flash::{sector_of, FlashError, SERIAL_LOC};
use platform::{Annunciator, FilterEngine, InputEvent, TextDisplay, LCD_COLUMNS};

use crate::backoff::Lcg;
use crate::error::ControlError;

/// Words of a sector 0/4 code image holding the module serial number.
#[allow(clippy::arithmetic_side_effects)] // Safety: constant offsets well inside a sector
const SERIAL_BLOCK: core::ops::Range<usize> = SERIAL_LOC + 2..SERIAL_LOC + 2 + SERIAL_WORDS;

/// Start addresses of the code images that carry a serial number block.
const SERIAL_IMAGE_STARTS: [u32; 2] = [0x0000, 0x8000];

/// One LCD line.
type Line = String<{ LCD_COLUMNS as usize }>;

/// The panel peripherals the controller drives.
pub struct Peripherals<D, A, E, W, T> {
    /// Character LCD
    pub display: D,
    /// Speaker
    pub speaker: A,
    /// DSP filter routines
    pub engine: E,
    /// Serial transmitter
    pub serial: W,
    /// Busy-wait timer for operator messages
    pub delay: T,
}

/// Cursor blink phase.
#[derive(Debug, Default)]
struct Blink {
    ticks: u16,
    off: bool,
}

/// The module's foreground loop.
pub struct Controller<F, D, A, E, W, T> {
    state: ControlState,
    router: Router,
    dispatcher: Dispatcher,
    parser: Parser,
    log: FlashLog<F>,
    serial_number: SerialNumber,
    rng: Lcg,
    quiet_sn: bool,
    blink: Blink,
    meter_on: bool,
    staging: [u16; STAGING_WORDS],
    io: Peripherals<D, A, E, W, T>,
}

impl<F, D, A, E, W, T> Controller<F, D, A, E, W, T>
where
    F: NorFlash<Error = FlashError>,
    D: TextDisplay,
    A: Annunciator,
    E: FilterEngine,
    W: Write,
    T: DelayNs,
{
    /// Controller with factory settings. Call [`Controller::start`] before
    /// the first [`Controller::poll`].
    #[allow(clippy::large_stack_arrays)] // FLASH staging buffer, one sector
    pub fn new(flash: F, serial_number: SerialNumber, io: Peripherals<D, A, E, W, T>) -> Self {
        let log = FlashLog::new(SectorProgrammer::new(flash), Identity::of(&serial_number));
        Self {
            state: ControlState::new(ParamStore::factory()),
            router: Router::new(),
            dispatcher: Dispatcher::new(),
            parser: Parser::new(),
            log,
            serial_number,
            rng: Lcg::from_serial(serial_number.value()),
            quiet_sn: false,
            blink: Blink::default(),
            meter_on: false,
            staging: [0; STAGING_WORDS],
            io,
        }
    }

    /// Power-up: validate the settings log (reseeding it when blank or
    /// corrupt), recall location 0 and sign on.
    ///
    /// A log that cannot be reseeded is reported on the LCD and returned as
    /// an error; the controller keeps running on factory settings.
    pub fn start(&mut self) -> Result<(), ControlError> {
        let health = self.log.startup_scan();
        #[cfg(feature = "defmt")]
        defmt::info!("startup: settings log {}", health);

        let reseed = match health {
            Ok(LogHealth::Healthy { .. }) => Ok(()),
            Ok(LogHealth::Blank | LogHealth::Corrupt) | Err(LogError::Corrupt) => {
                self.log.store_all(&self.state.store, &mut self.staging)
            }
            Err(e) => Err(e),
        };
        if let Err(e) = reseed {
            self.report_log_error(e);
            self.apply_settings();
            self.sign_on();
            return Err(e.into());
        }

        self.recall(0);
        self.sign_on();
        Ok(())
    }

    /// One foreground tick.
    pub fn poll<const N: usize>(
        &mut self,
        rx: &SerialRx<N>,
        input: &InputQueue,
    ) -> Result<(), ControlError> {
        if rx.take_error() {
            #[cfg(feature = "defmt")]
            defmt::warn!("serial: line error");
            self.message("RS-232 Error!   ");
            self.beep(BEEP_ERROR);
            rx.flush();
        }

        while let Some(byte) = rx.read() {
            let ctx = ParserContext {
                serial: self.serial_number.value(),
                max_taps: usize::try_from(self.state.store.max_order()).unwrap_or(0),
            };
            if let Some(event) = self.parser.feed(byte, &ctx) {
                self.execute(event, rx)?;
                self.dispatch();
            }
        }

        while let Some(event) = input.pop() {
            self.knob(event);
            self.dispatch();
        }

        self.dispatch();
        self.tick();
        self.sync_level_meter();
        Ok(())
    }

    /// Control state (tests, emulator status).
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// The peripherals.
    pub fn peripherals(&self) -> &Peripherals<D, A, E, W, T> {
        &self.io
    }

    /// Mutable access to the peripherals.
    pub fn peripherals_mut(&mut self) -> &mut Peripherals<D, A, E, W, T> {
        &mut self.io
    }

    /// The settings log.
    pub fn log_mut(&mut self) -> &mut FlashLog<F> {
        &mut self.log
    }

    /// Shut down and hand back the FLASH device and the peripherals.
    pub fn into_parts(self) -> (F, Peripherals<D, A, E, W, T>) {
        (self.log.into_programmer().into_inner(), self.io)
    }

    // ── knob ────────────────────────────────────────────────────────────

    fn knob(&mut self, event: InputEvent) {
        if event != InputEvent::ButtonRelease {
            self.state.restart_auto_level();
        }
        match self
            .router
            .handle(event, &mut self.state, &mut self.io.display)
        {
            Reaction::Handled => {}
            Reaction::Boundary => self.beep(BEEP_BOUNDARY),
            Reaction::Cancelled => {
                self.io.delay.delay_ms(750);
                self.redisplay();
            }
        }
    }

    // ── dispatch and actions ────────────────────────────────────────────

    fn dispatch(&mut self) {
        if let Some(action) = self.dispatcher.dispatch(&mut self.state, &mut self.io.engine) {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: Action) {
        #[cfg(feature = "defmt")]
        defmt::debug!("action: {}", action);
        match action {
            Action::Store(location) => self.store(location),
            Action::Recall(location) => self.recall(location),
            Action::FactoryReset => self.factory_reset(),
            Action::ShowFirmware => {
                show_number(
                    &self.state,
                    &mut self.io.display,
                    i32::from(FIRMWARE_VERSION),
                    13,
                    4,
                    2,
                );
                place_cursor(&mut self.state, &mut self.io.display, 1, true);
            }
            Action::ShowSerial => {
                let value = i32::try_from(self.serial_number.value()).unwrap_or(0);
                show_number(&self.state, &mut self.io.display, value, 11, 6, 0);
            }
            Action::ShowTap(tap) => {
                show_number(&self.state, &mut self.io.display, i32::from(tap), 11, 6, 0);
            }
        }
    }

    fn store(&mut self, location: u16) {
        self.message(&location_line(location, 8, " Stored "));
        self.beep(BEEP_CONFIRM);
        match self.log.store(location, &self.state.store, &mut self.staging) {
            Ok(_outcome) => {
                #[cfg(feature = "defmt")]
                defmt::info!("store: {}", _outcome);
            }
            Err(e) => self.report_log_error(e),
        }
        self.io.delay.delay_ms(500);
        self.redisplay();
    }

    fn recall(&mut self, location: u16) {
        self.message(&location_line(location, 7, " Recalled"));
        self.beep(BEEP_CONFIRM);
        if let Err(e) = self
            .log
            .recall(location, &mut self.state.store, &mut self.staging)
        {
            self.report_log_error(e);
        }
        self.apply_settings();
        self.io.delay.delay_ms(600);
        self.redisplay();
    }

    fn factory_reset(&mut self) {
        self.state.store = ParamStore::factory();
        self.apply_settings();
        self.redisplay();
        self.io.delay.delay_ms(500);
        if let Err(e) = self.log.store_all(&self.state.store, &mut self.staging) {
            self.report_log_error(e);
        }
        self.redisplay();
    }

    /// Program the engine from the store after a recall or reset.
    fn apply_settings(&mut self) {
        let _ = self.state.store.take_change();
        let store = &self.state.store;
        let engine = &mut self.io.engine;
        engine.set_sample_rate(store.sample_rate_hz());
        engine.set_white_noise(store.get(id::INPUT_SRC, params::Context::A) != 0);
        engine.set_cascade(store.get(id::CASCADE, params::Context::A) != 0);
        self.dispatcher.set_all_gains(store, engine);

        self.state.selection = Selection::home(self.state.store.mode());
        self.state.level = LevelDisplay::Off;
        self.state.confirm_armed = false;
        self.state.restart_auto_level();
        self.dispatcher
            .init_functions(&mut self.state, &mut self.io.engine);
        self.state.store.raise(Severity::SelectionOnly);
    }

    fn report_log_error(&mut self, error: LogError) {
        #[cfg(feature = "defmt")]
        defmt::warn!("flash log: {}", error);
        match error {
            LogError::LocationBlank => {
                self.message("Location Blank! ");
                self.io.delay.delay_ms(1000);
            }
            LogError::Flash { stage, error } => self.prog_error(error, stage),
            LogError::Corrupt
            | LogError::Full
            | LogError::Staging
            | LogError::Location => {
                self.message("Error-MemCorrupt");
                self.io.delay.delay_ms(1500);
            }
        }
    }

    /// `ProgERR<code><stage>` for two seconds.
    fn prog_error(&mut self, error: FlashError, stage: Stage) {
        self.message("ProgERR");
        self.io
            .display
            .show(&num_to_string(i32::from(error.code()), 0), 8, false);
        self.io.display.show(stage.label(), 9, false);
        self.io.delay.delay_ms(2000);
    }

    // ── serial requests ─────────────────────────────────────────────────

    fn execute<const N: usize>(
        &mut self,
        event: Event,
        rx: &SerialRx<N>,
    ) -> Result<(), ControlError> {
        match event {
            Event::Execute(request) => self.execute_request(&request, rx)?,
            Event::UserFir {
                context,
                order,
                request,
            } => {
                for (k, &tap) in self.parser.taps().iter().enumerate() {
                    self.state.store.set_user_fir_tap(context, k, tap);
                }
                self.state.store.put(id::UF_ORDER, context, i32::from(order));
                self.state.store.put(id::UF_TAP, context, 1);
                self.execute_request(&request, rx)?;
            }
            Event::Progress { words, done: _ } => {
                if words == 0 {
                    self.message("Recvd    0 Words");
                } else {
                    let words = i32::try_from(words).unwrap_or(i32::MAX);
                    show_number(&self.state, &mut self.io.display, words, 6, 5, 0);
                }
            }
            Event::Program { start, len } => self.program(start, len),
            Event::ProgramError => {
                self.message("PARAMETER ERROR ");
                self.io.delay.delay_ms(1000);
                self.message("WRITE ABORTED!  ");
                self.io.delay.delay_ms(2000);
                self.redisplay();
                self.state.store.raise(Severity::Full);
            }
        }
        Ok(())
    }

    fn execute_request<const N: usize>(
        &mut self,
        request: &Request,
        rx: &SerialRx<N>,
    ) -> Result<(), ControlError> {
        match Command::classify(&request.name) {
            Command::Reset => {
                self.state.store = ParamStore::factory();
                self.apply_settings();
                self.redisplay();
            }
            Command::Display => {
                if request.value.is_empty() {
                    self.redisplay();
                    self.state.store.raise(Severity::SelectionOnly);
                    self.state.flash_cursor = true;
                } else {
                    self.message(&request.value);
                    self.state.flash_cursor = false;
                }
            }
            Command::SendSn => {
                if !self.quiet_sn {
                    // Every module on the bus answers at once; the others'
                    // replies must not overrun the ring while we wait.
                    let wait = self.rng.next_delay_us();
                    rx.suspend();
                    self.io.delay.delay_us(wait);
                    rx.resume();
                    let serial = self.serial_number;
                    self.transmit(serial.as_str())?;
                }
            }
            Command::QuietSn => self.quiet_sn = true,
            Command::Echo => {
                self.message(&request.value);
                self.state.flash_cursor = false;
                self.transmit(&request.value)?;
            }
            Command::Parameter => self.parameter_request(request)?,
        }
        Ok(())
    }

    fn parameter_request(&mut self, request: &Request) -> Result<(), ControlError> {
        let selection = match resolve_name(&request.name, &self.state.store) {
            Ok(selection) => selection,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("serial: '{}' ignored: {}", request.name.as_str(), _e);
                return Ok(());
            }
        };
        let Some(d) = descriptor(selection.param) else {
            return Ok(());
        };
        self.dispatcher
            .refresh_bounds(&mut self.state.store, selection.param, selection.context);
        let bounds = self.state.store.get_bounds(selection.param);
        let value = match parse_value(&request.value, d, bounds) {
            Ok(value) => value,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("serial: value of '{}' ignored: {}", request.name.as_str(), _e);
                return Ok(());
            }
        };

        self.state.selection = selection;
        match value {
            Value::Write(v) => {
                self.state.store.set(selection.param, selection.context, v);
                self.state.store.raise(Severity::Confirmed);
            }
            Value::Read => {
                self.reply_value(selection, d)?;
                self.state.store.raise(Severity::SelectionOnly);
            }
        }
        self.redisplay();
        self.state.flash_cursor = true;
        Ok(())
    }

    fn reply_value(&mut self, selection: Selection, d: &Descriptor) -> Result<(), ControlError> {
        let value = self.state.store.get(selection.param, selection.context);
        let text: String<NUM_CAPACITY> = match d.layout.kind {
            ParamKind::Enumerated { .. } => match selection.param {
                id::LEVELS => return Ok(()),
                id::FIRMWARE => num_to_string(i32::from(FIRMWARE_VERSION), 2),
                id::SERIAL_NO => num_to_string(
                    i32::try_from(self.serial_number.value()).unwrap_or(0),
                    0,
                ),
                _ => {
                    let mut label = String::new();
                    let _ = label.push_str(d.label(value).unwrap_or(""));
                    label
                }
            },
            ParamKind::Numeric { frac_digits, .. } => num_to_string(value, frac_digits),
        };
        self.transmit(&text)
    }

    /// Write a host-supplied code image. Images for sectors 0 and 4 carry
    /// the serial number; a blank or invalid one is replaced by this
    /// module's before anything is erased.
    fn program(&mut self, start: u32, len: usize) {
        let serial = self.serial_number;
        let image = self.parser.program_words_mut();
        if SERIAL_IMAGE_STARTS.contains(&start) {
            substitute_serial(image, &serial);
        }

        self.message("Programming...  ");
        let image = self.parser.program_words_mut();
        let result = match image.get(..len) {
            Some(words) => self.log.programmer().unlock().program(start, words, true),
            None => Err(FlashError::Parameter),
        };
        match result {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("program: {} words at {=u32:#x}", len, start);
                self.message("Sector   Prog OK");
                let sector = i32::try_from(sector_of(start)).unwrap_or(0);
                show_number(&self.state, &mut self.io.display, sector, 7, 2, 0);
            }
            Err(error) => {
                self.prog_error(error, Stage::Program);
                self.redisplay();
            }
        }
    }

    fn transmit(&mut self, text: &str) -> Result<(), ControlError> {
        self.io
            .serial
            .write_all(text.as_bytes())
            .and_then(|()| self.io.serial.write_all(b"\r"))
            .map_err(|_| ControlError::Serial)
    }

    // ── display ─────────────────────────────────────────────────────────

    fn sign_on(&mut self) {
        self.message(version_banner());
        self.io.delay.delay_ms(1000);
        let mut line = Line::new();
        let _ = line.push_str("SN ");
        let _ = line.push_str(self.serial_number.as_str().get(..6).unwrap_or(""));
        self.message(&line);
        self.io.delay.delay_ms(1000);
        self.redisplay();
    }

    fn message(&mut self, text: &str) {
        show_message(&mut self.state, &mut self.io.display, text);
    }

    fn redisplay(&mut self) {
        redisplay(&mut self.state, &mut self.io.display, 1);
    }

    fn beep(&mut self, (cycles, half_period_us): (u16, u16)) {
        self.io.speaker.beep(cycles, half_period_us);
    }

    /// Cursor blink and the automatic level display. The cursor stays on
    /// while the knob is held and off while a confirmation is pending.
    fn tick(&mut self) {
        self.parser.tick();
        let _ = self.rng.next_value();

        self.blink.ticks = self.blink.ticks.saturating_add(1);
        if self.blink.ticks < CURSOR_PERIOD {
            return;
        }
        self.blink.ticks = 0;
        self.blink.off = !self.blink.off;

        let pos = self.state.cursor;
        if self.blink.off && !self.router.is_held() {
            place_cursor(&mut self.state, &mut self.io.display, pos, false);
            if self.state.tick_auto_level() {
                self.show_auto_levels();
            }
        } else if !self.state.confirm_armed {
            let visible = self.state.flash_cursor;
            place_cursor(&mut self.state, &mut self.io.display, pos, visible);
        }
    }

    fn show_auto_levels(&mut self) {
        self.state.saved_cursor = self.state.cursor;
        if let Some(levels) = descriptor(id::LEVELS) {
            self.io.display.show(levels.template, 1, false);
        }
        let pos = self.state.saved_cursor;
        place_cursor(&mut self.state, &mut self.io.display, pos, false);
        self.state.level = LevelDisplay::Auto;
    }

    fn sync_level_meter(&mut self) {
        let on = self.state.level.is_on();
        if on != self.meter_on {
            self.io.engine.set_level_meter(on);
            self.meter_on = on;
        }
    }
}

/// Receive ring sized for the module's UART.
pub type ModuleRx = SerialRx<SERIAL_BUF_LEN>;

/// `"       3 Stored "` style line: the location right-aligned in `width`
/// columns followed by `suffix`.
fn location_line(location: u16, width: u8, suffix: &str) -> Line {
    let mut line = Line::new();
    let _ = line.push_str(&render_field(i32::from(location), width, 0));
    let _ = line.push_str(suffix);
    line
}

/// Replace a blank or invalid serial block with `serial`. Returns `true`
/// when the image was patched.
fn substitute_serial(image: &mut [u16], serial: &SerialNumber) -> bool {
    let Some(block) = image.get_mut(SERIAL_BLOCK) else {
        return false;
    };
    if !code_words_blank(block) && SerialNumber::from_code_words(block).is_ok() {
        return false;
    }
    block.copy_from_slice(&serial.code_words());
    true
}
