//! Biquad Coefficient Calculator (RBJ cookbook, bilinear transform)
//!
//! Maps musical parameters (Hz, dB, Q) to normalized second-order section
//! coefficients at an arbitrary sample rate.
//!
//! # Design Notes
//! - Pure: no state survives between calls
//! - Total: every input is clamped before the transform, so the output is
//!   always finite and the resulting filter is always stable
//! - Designed in f64, stored in f32

use std::f64::consts::PI;

/// Lowest frequency any band can be tuned to.
pub const MIN_FREQ_HZ: f32 = 20.0;
/// Highest frequency any band can be tuned to (further limited by Nyquist).
pub const MAX_FREQ_HZ: f32 = 20_000.0;
/// Fraction of the sample rate a design frequency may reach.
pub const NYQUIST_GUARD: f32 = 0.49;

pub const MIN_Q: f32 = 0.05;
pub const MAX_Q: f32 = 40.0;

/// Shelf/peak gain limit in dB.
pub const MAX_BAND_GAIN_DB: f32 = 24.0;

/// Q of a single Butterworth section, used for every cut-filter stage.
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

pub const MIN_SAMPLE_RATE: f32 = 8_000.0;
pub const MAX_SAMPLE_RATE: f32 = 768_000.0;
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

const FLAT_GAIN_DB: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    HighPass,
    LowPass,
    LowShelf,
    HighShelf,
    Peak,
}

impl FilterKind {
    /// Whether the gain argument participates in the design.
    pub fn uses_gain(self) -> bool {
        !matches!(self, FilterKind::HighPass | FilterKind::LowPass)
    }
}

/// Normalized biquad coefficients (a0 == 1).
///
/// `y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Coefficients {
    pub const IDENTITY: Coefficients = Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Design a section of the given kind.
    ///
    /// `gain_db` is ignored for high/low-pass. Out-of-range and non-finite
    /// inputs are clamped, never rejected.
    pub fn compute(kind: FilterKind, sample_rate: f32, freq: f32, q: f32, gain_db: f32) -> Self {
        let sr = clamp_sample_rate(sample_rate);
        let freq = clamp_frequency(freq, sr);
        let q = clamp_finite(q, MIN_Q, MAX_Q, BUTTERWORTH_Q);
        let gain_db = clamp_finite(gain_db, -MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB, 0.0);

        if kind.uses_gain() && gain_db.abs() < FLAT_GAIN_DB {
            return Self::IDENTITY;
        }

        let w0 = 2.0 * PI * freq as f64 / sr as f64;
        let cw = w0.cos();
        let alpha = w0.sin() / (2.0 * q as f64);
        let a = 10.0_f64.powf(gain_db as f64 / 40.0);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::HighPass => (
                (1.0 + cw) * 0.5,
                -(1.0 + cw),
                (1.0 + cw) * 0.5,
                1.0 + alpha,
                -2.0 * cw,
                1.0 - alpha,
            ),
            FilterKind::LowPass => (
                (1.0 - cw) * 0.5,
                1.0 - cw,
                (1.0 - cw) * 0.5,
                1.0 + alpha,
                -2.0 * cw,
                1.0 - alpha,
            ),
            FilterKind::Peak => (
                1.0 + alpha * a,
                -2.0 * cw,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cw,
                1.0 - alpha / a,
            ),
            FilterKind::LowShelf => (
                a * ((a + 1.0) - (a - 1.0) * cw + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cw),
                a * ((a + 1.0) - (a - 1.0) * cw - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cw + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cw),
                (a + 1.0) + (a - 1.0) * cw - two_sqrt_a_alpha,
            ),
            FilterKind::HighShelf => (
                a * ((a + 1.0) + (a - 1.0) * cw + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cw),
                a * ((a + 1.0) + (a - 1.0) * cw - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cw + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cw),
                (a + 1.0) - (a - 1.0) * cw - two_sqrt_a_alpha,
            ),
        };

        let inv_a0 = 1.0 / a0;
        Self {
            b0: (b0 * inv_a0) as f32,
            b1: (b1 * inv_a0) as f32,
            b2: (b2 * inv_a0) as f32,
            a1: (a1 * inv_a0) as f32,
            a2: (a2 * inv_a0) as f32,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.b0.is_finite()
            && self.b1.is_finite()
            && self.b2.is_finite()
            && self.a1.is_finite()
            && self.a2.is_finite()
    }

    /// Largest pole radius of `z^2 + a1*z + a2`. Below 1.0 means stable.
    pub fn max_pole_radius(&self) -> f32 {
        let a1 = self.a1 as f64;
        let a2 = self.a2 as f64;
        let disc = a1 * a1 - 4.0 * a2;
        let r = if disc < 0.0 {
            a2.sqrt()
        } else {
            let s = disc.sqrt();
            ((-a1 + s) * 0.5).abs().max(((-a1 - s) * 0.5).abs())
        };
        r as f32
    }

    /// Linear magnitude of the frequency response at `freq`.
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * freq as f64 / sample_rate as f64;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 as f64 + self.b1 as f64 * c1 + self.b2 as f64 * c2;
        let num_im = -(self.b1 as f64 * s1 + self.b2 as f64 * s2);
        let den_re = 1.0 + self.a1 as f64 * c1 + self.a2 as f64 * c2;
        let den_im = -(self.a1 as f64 * s1 + self.a2 as f64 * s2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt().max(1e-30);
        (num / den) as f32
    }
}

pub fn db_to_gain(db: f32) -> f32 {
    (10.0f32).powf(db / 20.0)
}

pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.max(1e-12).log10()
}

/// Clamp to `[lo, hi]`, mapping NaN to `fallback`. Infinities land on the bounds.
#[inline]
pub fn clamp_finite(v: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if v.is_nan() {
        fallback
    } else {
        v.clamp(lo, hi)
    }
}

pub fn clamp_sample_rate(sample_rate: f32) -> f32 {
    clamp_finite(sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE, DEFAULT_SAMPLE_RATE)
}

/// Clamp a design frequency to `[20, min(20000, 0.49 * sr)]`.
pub fn clamp_frequency(freq: f32, sample_rate: f32) -> f32 {
    let hi = (NYQUIST_GUARD * clamp_sample_rate(sample_rate)).min(MAX_FREQ_HZ);
    clamp_finite(freq, MIN_FREQ_HZ, hi, 1_000.0)
}
