//! Static parameter descriptors.
//!
//! Each template is exactly what the left of the LCD shows. A numeric field
//! is marked with `#` digits, an optional `.` and one `_` for the ones digit
//! (the first cursor stop). Templates without `#`/`_` are enumerated: their
//! label is written right after the template text.
//!
//! Layouts are derived from the template at compile time, so the table is
//! pure `'static` data.

/// Row index into the parameter table.
pub type ParamId = usize;

/// Number of rows with a descriptor.
pub const NDESCRIPTORS: usize = 43;

/// First row of the packed User-FIR coefficient area.
pub const USER_FIR_BASE: ParamId = NDESCRIPTORS;

/// Rows reserved for User-FIR taps (two taps per cell, 256 taps max).
pub const USER_FIR_ROWS: usize = 128;

/// Total rows in the parameter table.
pub const NPARAMS: usize = NDESCRIPTORS + USER_FIR_ROWS;

/// First id of the device-options menu.
pub const OPTIONS_START: ParamId = 1;

/// Last id of the device-options menu.
pub const OPTIONS_END: ParamId = 13;

/// Named parameter ids.
#[allow(missing_docs)]
pub mod id {
    use super::ParamId;

    pub const FUNC: ParamId = 0;
    pub const LEVELS: ParamId = 1;
    pub const REVERT_TO_LEVELS: ParamId = 2;
    pub const FULL_SCALE_IN: ParamId = 3;
    pub const SAMPLE_RATE: ParamId = 4;
    pub const INPUT_SRC: ParamId = 5;
    pub const MODE: ParamId = 6;
    pub const CASCADE: ParamId = 7;
    pub const MASTER_MODE: ParamId = 8;
    pub const INITIALIZE: ParamId = 9;
    pub const STORE: ParamId = 10;
    pub const RECALL: ParamId = 11;
    pub const FIRMWARE: ParamId = 12;
    pub const SERIAL_NO: ParamId = 13;
    pub const NF_GAIN: ParamId = 14;
    pub const AP_GAIN: ParamId = 15;
    pub const LP_FCUT: ParamId = 16;
    pub const LP_ORDER: ParamId = 17;
    pub const LP_GAIN: ParamId = 18;
    pub const HP_FCUT: ParamId = 19;
    pub const HP_ORDER: ParamId = 20;
    pub const HP_GAIN: ParamId = 21;
    pub const BP_F1: ParamId = 22;
    pub const BP_F2: ParamId = 23;
    pub const BP_FCNTR: ParamId = 24;
    pub const BP_FWDTH: ParamId = 25;
    pub const BP_ORDER: ParamId = 26;
    pub const BP_GAIN: ParamId = 27;
    pub const BS_F1: ParamId = 28;
    pub const BS_F2: ParamId = 29;
    pub const BS_FCNTR: ParamId = 30;
    pub const BS_FWDTH: ParamId = 31;
    pub const BS_ORDER: ParamId = 32;
    pub const BS_GAIN: ParamId = 33;
    pub const N_FNOTCH: ParamId = 34;
    pub const N_FWIDTH: ParamId = 35;
    pub const N_GAIN: ParamId = 36;
    pub const IN_FCNTR: ParamId = 37;
    pub const IN_FWIDTH: ParamId = 38;
    pub const IN_GAIN: ParamId = 39;
    pub const UF_ORDER: ParamId = 40;
    pub const UF_TAP: ParamId = 41;
    pub const UF_GAIN: ParamId = 42;
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Filter function assigned to a channel context (the value of FUNC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Function {
    /// Output silenced
    NoFunc,
    /// Input copied to output
    AllPass,
    /// Windowed-sinc low pass
    LowPass,
    /// Windowed-sinc high pass
    HighPass,
    /// Windowed-sinc band pass
    BandPass,
    /// Windowed-sinc band stop
    BandStop,
    /// Lattice notch
    Notch,
    /// Lattice inverse notch (peak)
    InvNotch,
    /// Host-loaded FIR taps
    UserFir,
}

impl Function {
    /// All functions in FUNC label order.
    pub const ALL: [Function; 9] = [
        Function::NoFunc,
        Function::AllPass,
        Function::LowPass,
        Function::HighPass,
        Function::BandPass,
        Function::BandStop,
        Function::Notch,
        Function::InvNotch,
        Function::UserFir,
    ];

    /// Decode a stored FUNC value.
    pub fn from_value(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// First parameter id owned by this function.
    pub const fn first(self) -> ParamId {
        match self {
            Self::NoFunc => id::NF_GAIN,
            Self::AllPass => id::AP_GAIN,
            Self::LowPass => id::LP_FCUT,
            Self::HighPass => id::HP_FCUT,
            Self::BandPass => id::BP_F1,
            Self::BandStop => id::BS_F1,
            Self::Notch => id::N_FNOTCH,
            Self::InvNotch => id::IN_FCNTR,
            Self::UserFir => id::UF_ORDER,
        }
    }

    /// Last parameter id owned by this function; always its gain.
    pub const fn last(self) -> ParamId {
        match self {
            Self::NoFunc => id::NF_GAIN,
            Self::AllPass => id::AP_GAIN,
            Self::LowPass => id::LP_GAIN,
            Self::HighPass => id::HP_GAIN,
            Self::BandPass => id::BP_GAIN,
            Self::BandStop => id::BS_GAIN,
            Self::Notch => id::N_GAIN,
            Self::InvNotch => id::IN_GAIN,
            Self::UserFir => id::UF_GAIN,
        }
    }

    /// `true` if `param` lies in this function's id range.
    pub const fn owns(self, param: ParamId) -> bool {
        param >= self.first() && param <= self.last()
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// How a parameter value is shown and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Value is an index into `labels`.
    Enumerated {
        /// Label shown for each value
        labels: &'static [&'static str],
    },
    /// Value is a fixed-point number.
    Numeric {
        /// Field width including sign and decimal point
        width: u8,
        /// Digits after the decimal point (0 for integers)
        frac_digits: u8,
        /// Offset of the ones digit (`_`) from the field start
        cursor_offset: u8,
    },
}

/// Template-derived placement of a value on the LCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// 1-based column where the label or number starts.
    pub start: u8,
    /// Enumerated or numeric formatting.
    pub kind: ParamKind,
}

impl Layout {
    /// Cursor width of the value field: the label column for enumerated
    /// values, the number width otherwise.
    pub const fn width(&self) -> u8 {
        match self.kind {
            ParamKind::Enumerated { .. } => 1,
            ParamKind::Numeric { width, .. } => width,
        }
    }

    /// Fractional digits (0 for enumerated values and integers).
    pub const fn frac_digits(&self) -> u8 {
        match self.kind {
            ParamKind::Enumerated { .. } => 0,
            ParamKind::Numeric { frac_digits, .. } => frac_digits,
        }
    }

    /// Cursor offset of the ones digit (0 for enumerated values).
    pub const fn cursor_offset(&self) -> u8 {
        match self.kind {
            ParamKind::Enumerated { .. } => 0,
            ParamKind::Numeric { cursor_offset, .. } => cursor_offset,
        }
    }
}

#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // Safety: every index is guarded by `j < bytes.len()`; templates are ≤ 16 bytes
#[allow(clippy::cast_possible_truncation)] // template offsets are < 17
const fn derive_layout(template: &'static str, labels: &'static [&'static str]) -> Layout {
    let bytes = template.as_bytes();
    let mut j = 0;
    while j < bytes.len() && bytes[j] != b'#' && bytes[j] != b'_' {
        j += 1;
    }
    if j == bytes.len() {
        return Layout {
            start: (j + 1) as u8,
            kind: ParamKind::Enumerated { labels },
        };
    }

    let first = j;
    let mut offset = 0;
    let mut point = 0;
    let mut has_point = false;
    while j < bytes.len() && matches!(bytes[j], b'#' | b'_' | b'.') {
        if bytes[j] == b'_' {
            offset = j - first;
        }
        if bytes[j] == b'.' {
            point = j;
            has_point = true;
        }
        j += 1;
    }
    let width = j - first;
    let frac_digits = if has_point { first + width - point - 1 } else { 0 };

    Layout {
        start: (first + 1) as u8,
        kind: ParamKind::Numeric {
            width: width as u8,
            frac_digits: frac_digits as u8,
            cursor_offset: offset as u8,
        },
    }
}

// ---------------------------------------------------------------------------
// Descriptor table
// ---------------------------------------------------------------------------

/// Static description of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// 16-column LCD template.
    pub template: &'static str,
    /// Derived value placement.
    pub layout: Layout,
    /// A press on the value arms a "Press to …" confirmation.
    pub confirm: bool,
}

impl Descriptor {
    const fn new(template: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            template,
            layout: derive_layout(template, labels),
            confirm: false,
        }
    }

    const fn confirmed(template: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            template,
            layout: derive_layout(template, labels),
            confirm: true,
        }
    }

    /// `true` for label-valued parameters.
    pub const fn is_enumerated(&self) -> bool {
        matches!(self.layout.kind, ParamKind::Enumerated { .. })
    }

    /// Labels of an enumerated parameter (empty for numeric ones).
    pub const fn labels(&self) -> &'static [&'static str] {
        match self.layout.kind {
            ParamKind::Enumerated { labels } => labels,
            ParamKind::Numeric { .. } => &[],
        }
    }

    /// Label for `value`, if any.
    pub fn label(&self, value: i32) -> Option<&'static str> {
        usize::try_from(value)
            .ok()
            .and_then(|i| self.labels().get(i).copied())
    }

    /// Short name used in "Press to <name>": the template up to its `:`,
    /// at most seven characters.
    pub fn confirm_name(&self) -> &'static str {
        let head = self.template.get(..7).unwrap_or(self.template);
        match head.find(':') {
            Some(colon) => head.get(..colon).unwrap_or(head),
            None => head,
        }
    }
}

const FUNC_LABELS: &[&str] = &[
    "NoFunc     ",
    "AllPass    ",
    "LowPass    ",
    "HighPass   ",
    "BandPass   ",
    "BandStop   ",
    "Notch      ",
    "InvNotch   ",
    "UserFIR    ",
];
const NO_YES: &[&str] = &["N", "Y"];
const SAMPLE_RATE_LABELS: &[&str] = &[" 8KHz", "48KHz"];
const INPUT_SRC_LABELS: &[&str] = &["Analog ", "WtNoise"];
const MODE_LABELS: &[&str] = &["A&B Common ", "A&BSeparate", "Ch A Only  "];
const MASTER_LABELS: &[&str] = &["N   ", "Y   "];
const INITIALIZE_LABELS: &[&str] = &["press"];
const NONE: &[&str] = &[];

/// The descriptor table, indexed by [`ParamId`].
pub static DESCRIPTORS: [Descriptor; NDESCRIPTORS] = [
    Descriptor::new(" FUNC:", FUNC_LABELS),
    // Options
    Descriptor::new("Levels-In  Out  ", NONE),
    Descriptor::new("RevertToLevels:", NO_YES),
    Descriptor::new("FullScalIn:#_Vpp", NONE),
    Descriptor::new("SampleRate:", SAMPLE_RATE_LABELS),
    Descriptor::new("InputSrc:", INPUT_SRC_LABELS),
    Descriptor::new("Mode:", MODE_LABELS),
    Descriptor::new("Cascade Ch A&B:", NO_YES),
    Descriptor::new("Master Mode:", MASTER_LABELS),
    Descriptor::confirmed("Initialize:", INITIALIZE_LABELS),
    Descriptor::confirmed("Store:  # press ", NONE),
    Descriptor::confirmed("Recall: # press ", NONE),
    Descriptor::new("Firmware:  V", NONE),
    Descriptor::new("Serial No:", NONE),
    // Function parameters
    Descriptor::new(" NFgain:###_.##x", NONE),
    Descriptor::new(" APgain:###_.##x", NONE),
    Descriptor::new(" LPfcut: #####Hz", NONE),
    Descriptor::new(" LPorder:    ###", NONE),
    Descriptor::new(" LPgain:###_.##x", NONE),
    Descriptor::new(" HPfcut: #####Hz", NONE),
    Descriptor::new(" HPorder:    ###", NONE),
    Descriptor::new(" HPgain:###_.##x", NONE),
    Descriptor::new(" BPf1:   #####Hz", NONE),
    Descriptor::new(" BPf2:   #####Hz", NONE),
    Descriptor::new(" BPfcntr:#####Hz", NONE),
    Descriptor::new(" BPfwdth:#####Hz", NONE),
    Descriptor::new(" BPorder:    ###", NONE),
    Descriptor::new(" BPgain:###_.##x", NONE),
    Descriptor::new(" BSf1:   #####Hz", NONE),
    Descriptor::new(" BSf2:   #####Hz", NONE),
    Descriptor::new(" BSfcntr:#####Hz", NONE),
    Descriptor::new(" BSfwdth:#####Hz", NONE),
    Descriptor::new(" BSorder:    ###", NONE),
    Descriptor::new(" BSgain:###_.##x", NONE),
    Descriptor::new(" Nfnotch:#####Hz", NONE),
    Descriptor::new(" Nfwidth:#####Hz", NONE),
    Descriptor::new(" Ngain: ###_.##x", NONE),
    Descriptor::new(" INfcntr:#####Hz", NONE),
    Descriptor::new(" INfwdth:#####Hz", NONE),
    Descriptor::new(" INgain:###_.##x", NONE),
    Descriptor::new(" UForder:    ###", NONE),
    Descriptor::new(" UFtap:##_      ", NONE),
    Descriptor::new(" UFgain:###_.##x", NONE),
];

/// Descriptor for `param`, or `None` for User-FIR rows and out-of-range ids.
pub fn descriptor(param: ParamId) -> Option<&'static Descriptor> {
    DESCRIPTORS.get(param)
}
