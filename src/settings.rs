//! Equalizer settings: band specs, the parameter table and the
//! parameter-source boundary the scheduler polls.

use nih_plug::prelude::Enum;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dsp::chain::{BandSlot, CutSlot};
use crate::dsp::coefficients::{clamp_finite, MAX_BAND_GAIN_DB, MAX_FREQ_HZ, MIN_FREQ_HZ};

pub const MIN_OUTPUT_GAIN_DB: f32 = -60.0;
pub const MAX_OUTPUT_GAIN_DB: f32 = 12.0;
pub const MIN_BAND_Q: f32 = 0.1;
pub const MAX_BAND_Q: f32 = 5.0;

// =============================================================================
// SLOPE
// =============================================================================

/// Cut-filter steepness. Each step adds one cascaded 12 dB/oct section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[serde(from = "u32", into = "u32")]
pub enum Slope {
    #[name = "12 dB/oct"]
    Db12,
    #[default]
    #[name = "24 dB/oct"]
    Db24,
    #[name = "36 dB/oct"]
    Db36,
}

impl Slope {
    pub const ALL: [Slope; 3] = [Slope::Db12, Slope::Db24, Slope::Db36];

    /// Number of cascaded sections.
    pub fn stages(self) -> usize {
        match self {
            Slope::Db12 => 1,
            Slope::Db24 => 2,
            Slope::Db36 => 3,
        }
    }

    pub fn db_per_octave(self) -> u32 {
        self.stages() as u32 * 12
    }

    /// Section count to slope, clamped to the nearest valid value.
    pub fn from_stages(stages: usize) -> Self {
        match stages {
            0 | 1 => Slope::Db12,
            2 => Slope::Db24,
            _ => Slope::Db36,
        }
    }

    /// dB/oct to slope, snapped to the nearest of 12/24/36.
    pub fn from_db_per_octave(db: u32) -> Self {
        Self::from_stages((db.saturating_add(6) / 12) as usize)
    }
}

impl From<u32> for Slope {
    fn from(db: u32) -> Self {
        Slope::from_db_per_octave(db)
    }
}

impl From<Slope> for u32 {
    fn from(slope: Slope) -> Self {
        slope.db_per_octave()
    }
}

// =============================================================================
// BAND / CUT SPECS
// =============================================================================

/// Parameters of a shelf or peak band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
    pub bypassed: bool,
}

impl BandSpec {
    pub const fn new(frequency: f32) -> Self {
        Self {
            frequency,
            gain_db: 0.0,
            q: 1.0,
            bypassed: false,
        }
    }

    /// True when both specs produce the same coefficients. Bitwise, so NaN
    /// compares equal to itself and never forces a redesign on its own.
    pub fn same_shape(&self, other: &BandSpec) -> bool {
        self.frequency.to_bits() == other.frequency.to_bits()
            && self.gain_db.to_bits() == other.gain_db.to_bits()
            && self.q.to_bits() == other.q.to_bits()
    }

    pub fn same_as(&self, other: &BandSpec) -> bool {
        self.same_shape(other) && self.bypassed == other.bypassed
    }
}

/// Parameters of a high-pass or low-pass cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutSpec {
    pub frequency: f32,
    pub slope: Slope,
    pub bypassed: bool,
}

impl CutSpec {
    pub const fn new(frequency: f32) -> Self {
        Self {
            frequency,
            slope: Slope::Db24,
            bypassed: false,
        }
    }

    pub fn same_frequency(&self, other: &CutSpec) -> bool {
        self.frequency.to_bits() == other.frequency.to_bits()
    }

    pub fn same_as(&self, other: &CutSpec) -> bool {
        self.same_frequency(other) && self.slope == other.slope && self.bypassed == other.bypassed
    }
}

// =============================================================================
// PARAMETER SOURCE
// =============================================================================

/// The parameter store as seen from the audio thread.
///
/// Every read must be lock-free. Values may be out of range or non-finite;
/// consumers clamp.
pub trait EqParamSource {
    fn output_gain_db(&self) -> f32;
    fn polarity_flipped(&self) -> bool;
    fn cut(&self, slot: CutSlot) -> CutSpec;
    fn band(&self, slot: BandSlot) -> BandSpec;
}

// =============================================================================
// SETTINGS SNAPSHOT
// =============================================================================

/// A complete, plain-value parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqSettings {
    pub output_gain_db: f32,
    pub polarity_flipped: bool,
    pub low_cut: CutSpec,
    pub low_shelf: BandSpec,
    pub low_mid: BandSpec,
    pub mid: BandSpec,
    pub high_mid: BandSpec,
    pub high_shelf: BandSpec,
    pub high_cut: CutSpec,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            output_gain_db: 0.0,
            polarity_flipped: false,
            low_cut: CutSpec::new(20.0),
            low_shelf: BandSpec::new(100.0),
            low_mid: BandSpec::new(200.0),
            mid: BandSpec::new(1_000.0),
            high_mid: BandSpec::new(4_000.0),
            high_shelf: BandSpec::new(10_000.0),
            high_cut: CutSpec::new(20_000.0),
        }
    }
}

impl EqSettings {
    /// Defaults with every unit bypassed: a transparent chain.
    pub fn bypassed() -> Self {
        let mut s = Self::default();
        for slot in CutSlot::ALL {
            s.cut_mut(slot).bypassed = true;
        }
        for slot in BandSlot::ALL {
            s.band_mut(slot).bypassed = true;
        }
        s
    }

    pub fn cut_mut(&mut self, slot: CutSlot) -> &mut CutSpec {
        match slot {
            CutSlot::LowCut => &mut self.low_cut,
            CutSlot::HighCut => &mut self.high_cut,
        }
    }

    pub fn band_mut(&mut self, slot: BandSlot) -> &mut BandSpec {
        match slot {
            BandSlot::LowShelf => &mut self.low_shelf,
            BandSlot::LowMid => &mut self.low_mid,
            BandSlot::Mid => &mut self.mid,
            BandSlot::HighMid => &mut self.high_mid,
            BandSlot::HighShelf => &mut self.high_shelf,
        }
    }

    /// Plain value of one parameter. Bools read as 0/1, slopes as dB/oct.
    pub fn plain(&self, id: ParamId) -> f32 {
        match id.target() {
            ParamTarget::OutputGain => self.output_gain_db,
            ParamTarget::Polarity => bool_plain(self.polarity_flipped),
            ParamTarget::Cut(slot, field) => {
                let cut = EqParamSource::cut(self, slot);
                match field {
                    CutField::Frequency => cut.frequency,
                    CutField::Slope => cut.slope.db_per_octave() as f32,
                    CutField::Bypass => bool_plain(cut.bypassed),
                }
            }
            ParamTarget::Band(slot, field) => {
                let band = EqParamSource::band(self, slot);
                match field {
                    BandField::Frequency => band.frequency,
                    BandField::Gain => band.gain_db,
                    BandField::Q => band.q,
                    BandField::Bypass => bool_plain(band.bypassed),
                }
            }
        }
    }

    /// Set one parameter from a plain value, clamped to its declared range.
    pub fn set_plain(&mut self, id: ParamId, value: f32) {
        let value = match id.range() {
            Some((lo, hi)) => clamp_finite(value, lo, hi, id.default_plain()),
            None => value,
        };
        let flag = value >= 0.5;
        match id.target() {
            ParamTarget::OutputGain => self.output_gain_db = value,
            ParamTarget::Polarity => self.polarity_flipped = flag,
            ParamTarget::Cut(slot, field) => {
                let cut = self.cut_mut(slot);
                match field {
                    CutField::Frequency => cut.frequency = value,
                    CutField::Slope => {
                        cut.slope = Slope::from_db_per_octave(value.max(0.0).round() as u32)
                    }
                    CutField::Bypass => cut.bypassed = flag,
                }
            }
            ParamTarget::Band(slot, field) => {
                let band = self.band_mut(slot);
                match field {
                    BandField::Frequency => band.frequency = value,
                    BandField::Gain => band.gain_db = value,
                    BandField::Q => band.q = value,
                    BandField::Bypass => band.bypassed = flag,
                }
            }
        }
    }

    /// First continuous parameter holding a non-finite value, if any.
    pub fn first_non_finite(&self) -> Option<ParamId> {
        ParamId::ALL
            .iter()
            .copied()
            .filter(|id| id.range().is_some())
            .find(|&id| !self.plain(id).is_finite())
    }

    /// Copy with every continuous parameter clamped into its declared range.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for id in ParamId::ALL {
            if id.range().is_some() {
                out.set_plain(id, self.plain(id));
            }
        }
        out
    }
}

fn bool_plain(v: bool) -> f32 {
    if v {
        1.0
    } else {
        0.0
    }
}

impl EqParamSource for EqSettings {
    fn output_gain_db(&self) -> f32 {
        self.output_gain_db
    }

    fn polarity_flipped(&self) -> bool {
        self.polarity_flipped
    }

    fn cut(&self, slot: CutSlot) -> CutSpec {
        match slot {
            CutSlot::LowCut => self.low_cut,
            CutSlot::HighCut => self.high_cut,
        }
    }

    fn band(&self, slot: BandSlot) -> BandSpec {
        match slot {
            BandSlot::LowShelf => self.low_shelf,
            BandSlot::LowMid => self.low_mid,
            BandSlot::Mid => self.mid,
            BandSlot::HighMid => self.high_mid,
            BandSlot::HighShelf => self.high_shelf,
        }
    }
}

// =============================================================================
// PARAMETER TABLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutField {
    Frequency,
    Slope,
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandField {
    Frequency,
    Gain,
    Q,
    Bypass,
}

/// Where a parameter lands in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamTarget {
    OutputGain,
    Polarity,
    Cut(CutSlot, CutField),
    Band(BandSlot, BandField),
}

/// Every host-visible parameter, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    OutGain,
    Polarity,
    HpfFreq,
    HpfSlope,
    HpfBypass,
    LowShelfFreq,
    LowShelfGain,
    LowShelfQ,
    LowShelfBypass,
    LowMidFreq,
    LowMidGain,
    LowMidQ,
    LowMidBypass,
    MidFreq,
    MidGain,
    MidQ,
    MidBypass,
    HighMidFreq,
    HighMidGain,
    HighMidQ,
    HighMidBypass,
    HighShelfFreq,
    HighShelfGain,
    HighShelfQ,
    HighShelfBypass,
    LpfFreq,
    LpfSlope,
    LpfBypass,
}

static ID_LOOKUP: Lazy<HashMap<&'static str, ParamId>> =
    Lazy::new(|| ParamId::ALL.iter().map(|&p| (p.id(), p)).collect());

impl ParamId {
    pub const COUNT: usize = 28;

    pub const ALL: [ParamId; ParamId::COUNT] = [
        ParamId::OutGain,
        ParamId::Polarity,
        ParamId::HpfFreq,
        ParamId::HpfSlope,
        ParamId::HpfBypass,
        ParamId::LowShelfFreq,
        ParamId::LowShelfGain,
        ParamId::LowShelfQ,
        ParamId::LowShelfBypass,
        ParamId::LowMidFreq,
        ParamId::LowMidGain,
        ParamId::LowMidQ,
        ParamId::LowMidBypass,
        ParamId::MidFreq,
        ParamId::MidGain,
        ParamId::MidQ,
        ParamId::MidBypass,
        ParamId::HighMidFreq,
        ParamId::HighMidGain,
        ParamId::HighMidQ,
        ParamId::HighMidBypass,
        ParamId::HighShelfFreq,
        ParamId::HighShelfGain,
        ParamId::HighShelfQ,
        ParamId::HighShelfBypass,
        ParamId::LpfFreq,
        ParamId::LpfSlope,
        ParamId::LpfBypass,
    ];

    /// Stable identifier, shared with the host declaration and state blobs.
    pub fn id(self) -> &'static str {
        match self {
            ParamId::OutGain => "out_gain",
            ParamId::Polarity => "polarity",
            ParamId::HpfFreq => "hpf_freq",
            ParamId::HpfSlope => "hpf_slope",
            ParamId::HpfBypass => "hpf_bypass",
            ParamId::LowShelfFreq => "low_shelf_freq",
            ParamId::LowShelfGain => "low_shelf_gain",
            ParamId::LowShelfQ => "low_shelf_q",
            ParamId::LowShelfBypass => "low_shelf_bypass",
            ParamId::LowMidFreq => "low_mid_freq",
            ParamId::LowMidGain => "low_mid_gain",
            ParamId::LowMidQ => "low_mid_q",
            ParamId::LowMidBypass => "low_mid_bypass",
            ParamId::MidFreq => "mid_freq",
            ParamId::MidGain => "mid_gain",
            ParamId::MidQ => "mid_q",
            ParamId::MidBypass => "mid_bypass",
            ParamId::HighMidFreq => "high_mid_freq",
            ParamId::HighMidGain => "high_mid_gain",
            ParamId::HighMidQ => "high_mid_q",
            ParamId::HighMidBypass => "high_mid_bypass",
            ParamId::HighShelfFreq => "high_shelf_freq",
            ParamId::HighShelfGain => "high_shelf_gain",
            ParamId::HighShelfQ => "high_shelf_q",
            ParamId::HighShelfBypass => "high_shelf_bypass",
            ParamId::LpfFreq => "lpf_freq",
            ParamId::LpfSlope => "lpf_slope",
            ParamId::LpfBypass => "lpf_bypass",
        }
    }

    pub fn from_id(id: &str) -> Option<ParamId> {
        ID_LOOKUP.get(id).copied()
    }

    pub fn target(self) -> ParamTarget {
        use BandField as B;
        use CutField as C;
        match self {
            ParamId::OutGain => ParamTarget::OutputGain,
            ParamId::Polarity => ParamTarget::Polarity,
            ParamId::HpfFreq => ParamTarget::Cut(CutSlot::LowCut, C::Frequency),
            ParamId::HpfSlope => ParamTarget::Cut(CutSlot::LowCut, C::Slope),
            ParamId::HpfBypass => ParamTarget::Cut(CutSlot::LowCut, C::Bypass),
            ParamId::LowShelfFreq => ParamTarget::Band(BandSlot::LowShelf, B::Frequency),
            ParamId::LowShelfGain => ParamTarget::Band(BandSlot::LowShelf, B::Gain),
            ParamId::LowShelfQ => ParamTarget::Band(BandSlot::LowShelf, B::Q),
            ParamId::LowShelfBypass => ParamTarget::Band(BandSlot::LowShelf, B::Bypass),
            ParamId::LowMidFreq => ParamTarget::Band(BandSlot::LowMid, B::Frequency),
            ParamId::LowMidGain => ParamTarget::Band(BandSlot::LowMid, B::Gain),
            ParamId::LowMidQ => ParamTarget::Band(BandSlot::LowMid, B::Q),
            ParamId::LowMidBypass => ParamTarget::Band(BandSlot::LowMid, B::Bypass),
            ParamId::MidFreq => ParamTarget::Band(BandSlot::Mid, B::Frequency),
            ParamId::MidGain => ParamTarget::Band(BandSlot::Mid, B::Gain),
            ParamId::MidQ => ParamTarget::Band(BandSlot::Mid, B::Q),
            ParamId::MidBypass => ParamTarget::Band(BandSlot::Mid, B::Bypass),
            ParamId::HighMidFreq => ParamTarget::Band(BandSlot::HighMid, B::Frequency),
            ParamId::HighMidGain => ParamTarget::Band(BandSlot::HighMid, B::Gain),
            ParamId::HighMidQ => ParamTarget::Band(BandSlot::HighMid, B::Q),
            ParamId::HighMidBypass => ParamTarget::Band(BandSlot::HighMid, B::Bypass),
            ParamId::HighShelfFreq => ParamTarget::Band(BandSlot::HighShelf, B::Frequency),
            ParamId::HighShelfGain => ParamTarget::Band(BandSlot::HighShelf, B::Gain),
            ParamId::HighShelfQ => ParamTarget::Band(BandSlot::HighShelf, B::Q),
            ParamId::HighShelfBypass => ParamTarget::Band(BandSlot::HighShelf, B::Bypass),
            ParamId::LpfFreq => ParamTarget::Cut(CutSlot::HighCut, C::Frequency),
            ParamId::LpfSlope => ParamTarget::Cut(CutSlot::HighCut, C::Slope),
            ParamId::LpfBypass => ParamTarget::Cut(CutSlot::HighCut, C::Bypass),
        }
    }

    /// Declared range of continuous parameters; `None` for bools and slopes.
    pub fn range(self) -> Option<(f32, f32)> {
        match self.target() {
            ParamTarget::OutputGain => Some((MIN_OUTPUT_GAIN_DB, MAX_OUTPUT_GAIN_DB)),
            ParamTarget::Cut(_, CutField::Frequency)
            | ParamTarget::Band(_, BandField::Frequency) => Some((MIN_FREQ_HZ, MAX_FREQ_HZ)),
            ParamTarget::Band(_, BandField::Gain) => Some((-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB)),
            ParamTarget::Band(_, BandField::Q) => Some((MIN_BAND_Q, MAX_BAND_Q)),
            _ => None,
        }
    }

    pub fn default_plain(self) -> f32 {
        EqSettings::default().plain(self)
    }
}
