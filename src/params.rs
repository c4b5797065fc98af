//! Host-visible parameters.
//!
//! Ids match `ParamId::id()`: nested groups prefix their fields, so the mid
//! band's gain is `mid_gain` and the low cut's slope is `hpf_slope`.
//! Values are read unsmoothed once per block by the scheduler.

use nih_plug::prelude::*;
use std::sync::Arc;

use crate::dsp::chain::{BandSlot, CutSlot};
use crate::dsp::coefficients::{MAX_BAND_GAIN_DB, MAX_FREQ_HZ, MIN_FREQ_HZ};
use crate::settings::{
    BandSpec, CutSpec, EqParamSource, EqSettings, Slope, MAX_BAND_Q, MAX_OUTPUT_GAIN_DB,
    MIN_BAND_Q, MIN_OUTPUT_GAIN_DB,
};

fn format_db(v: f32) -> String {
    format!("{:.1} dB", v)
}

fn frequency_param(name: String, default: f32) -> FloatParam {
    FloatParam::new(
        name,
        default,
        FloatRange::Skewed {
            min: MIN_FREQ_HZ,
            max: MAX_FREQ_HZ,
            factor: FloatRange::skew_factor(-2.0),
        },
    )
    .with_step_size(1.0)
    .with_value_to_string(formatters::v2s_f32_hz_then_khz(1))
    .with_string_to_value(formatters::s2v_f32_hz_then_khz())
}

#[derive(Params)]
pub struct CutParams {
    #[id = "freq"]
    pub frequency: FloatParam,

    #[id = "slope"]
    pub slope: EnumParam<Slope>,

    #[id = "bypass"]
    pub bypass: BoolParam,
}

impl CutParams {
    fn new(prefix: &str, spec: CutSpec) -> Self {
        Self {
            frequency: frequency_param(format!("{prefix} Freq"), spec.frequency),
            slope: EnumParam::new(format!("{prefix} Slope"), spec.slope),
            bypass: BoolParam::new(format!("{prefix} Bypass"), spec.bypassed),
        }
    }

    fn spec(&self) -> CutSpec {
        CutSpec {
            frequency: self.frequency.value(),
            slope: self.slope.value(),
            bypassed: self.bypass.value(),
        }
    }
}

#[derive(Params)]
pub struct BandParams {
    #[id = "freq"]
    pub frequency: FloatParam,

    #[id = "gain"]
    pub gain: FloatParam,

    #[id = "q"]
    pub q: FloatParam,

    #[id = "bypass"]
    pub bypass: BoolParam,
}

impl BandParams {
    fn new(prefix: &str, spec: BandSpec) -> Self {
        Self {
            frequency: frequency_param(format!("{prefix} Freq"), spec.frequency),
            gain: FloatParam::new(
                format!("{prefix} Gain"),
                spec.gain_db,
                FloatRange::Linear {
                    min: -MAX_BAND_GAIN_DB,
                    max: MAX_BAND_GAIN_DB,
                },
            )
            .with_step_size(0.5)
            .with_value_to_string(Arc::new(format_db)),
            q: FloatParam::new(
                format!("{prefix} Q"),
                spec.q,
                FloatRange::Linear {
                    min: MIN_BAND_Q,
                    max: MAX_BAND_Q,
                },
            )
            .with_step_size(0.1)
            .with_value_to_string(formatters::v2s_f32_rounded(1)),
            bypass: BoolParam::new(format!("{prefix} Bypass"), spec.bypassed),
        }
    }

    fn spec(&self) -> BandSpec {
        BandSpec {
            frequency: self.frequency.value(),
            gain_db: self.gain.value(),
            q: self.q.value(),
            bypassed: self.bypass.value(),
        }
    }
}

#[derive(Params)]
pub struct EqParams {
    #[id = "out_gain"]
    pub output_gain: FloatParam,

    #[id = "polarity"]
    pub polarity: BoolParam,

    #[nested(id_prefix = "hpf", group = "Low Cut")]
    pub low_cut: CutParams,

    #[nested(id_prefix = "low_shelf", group = "Low Shelf")]
    pub low_shelf: BandParams,

    #[nested(id_prefix = "low_mid", group = "Low-Mid")]
    pub low_mid: BandParams,

    #[nested(id_prefix = "mid", group = "Mid")]
    pub mid: BandParams,

    #[nested(id_prefix = "high_mid", group = "High-Mid")]
    pub high_mid: BandParams,

    #[nested(id_prefix = "high_shelf", group = "High Shelf")]
    pub high_shelf: BandParams,

    #[nested(id_prefix = "lpf", group = "High Cut")]
    pub high_cut: CutParams,
}

impl Default for EqParams {
    fn default() -> Self {
        let defaults = EqSettings::default();
        Self {
            output_gain: FloatParam::new(
                "Out Gain",
                defaults.output_gain_db,
                FloatRange::Skewed {
                    min: MIN_OUTPUT_GAIN_DB,
                    max: MAX_OUTPUT_GAIN_DB,
                    factor: 1.5,
                },
            )
            .with_step_size(0.5)
            .with_value_to_string(Arc::new(format_db)),

            polarity: BoolParam::new("Polarity", defaults.polarity_flipped),

            low_cut: CutParams::new("HPF", defaults.low_cut),
            low_shelf: BandParams::new("Low Shelf", defaults.low_shelf),
            low_mid: BandParams::new("Low-Mid", defaults.low_mid),
            mid: BandParams::new("Mid", defaults.mid),
            high_mid: BandParams::new("High-Mid", defaults.high_mid),
            high_shelf: BandParams::new("High Shelf", defaults.high_shelf),
            high_cut: CutParams::new("LPF", defaults.high_cut),
        }
    }
}

impl EqParams {
    fn cut_params(&self, slot: CutSlot) -> &CutParams {
        match slot {
            CutSlot::LowCut => &self.low_cut,
            CutSlot::HighCut => &self.high_cut,
        }
    }

    fn band_params(&self, slot: BandSlot) -> &BandParams {
        match slot {
            BandSlot::LowShelf => &self.low_shelf,
            BandSlot::LowMid => &self.low_mid,
            BandSlot::Mid => &self.mid,
            BandSlot::HighMid => &self.high_mid,
            BandSlot::HighShelf => &self.high_shelf,
        }
    }

    /// Plain-value snapshot of every parameter.
    pub fn snapshot(&self) -> EqSettings {
        EqSettings {
            output_gain_db: self.output_gain_db(),
            polarity_flipped: self.polarity_flipped(),
            low_cut: self.cut(CutSlot::LowCut),
            low_shelf: self.band(BandSlot::LowShelf),
            low_mid: self.band(BandSlot::LowMid),
            mid: self.band(BandSlot::Mid),
            high_mid: self.band(BandSlot::HighMid),
            high_shelf: self.band(BandSlot::HighShelf),
            high_cut: self.cut(CutSlot::HighCut),
        }
    }
}

impl EqParamSource for EqParams {
    fn output_gain_db(&self) -> f32 {
        self.output_gain.value()
    }

    fn polarity_flipped(&self) -> bool {
        self.polarity.value()
    }

    fn cut(&self, slot: CutSlot) -> CutSpec {
        self.cut_params(slot).spec()
    }

    fn band(&self, slot: BandSlot) -> BandSpec {
        self.band_params(slot).spec()
    }
}
