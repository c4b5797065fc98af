//! Cut Filter (cascaded high-pass / low-pass)
//!
//! Up to three identical Butterworth sections in series. Each active section
//! adds 12 dB/octave to the roll-off, so the slope selection is simply the
//! number of active sections.

use super::biquad::Biquad;
use super::coefficients::{Coefficients, FilterKind, BUTTERWORTH_Q};

pub const MAX_CUT_STAGES: usize = 3;

#[derive(Debug, Clone)]
pub struct CutFilter {
    kind: FilterKind,
    stages: [Biquad; MAX_CUT_STAGES],
    active: usize,
    bypassed: bool,
}

impl CutFilter {
    /// `kind` must be `HighPass` or `LowPass`.
    pub fn new(kind: FilterKind) -> Self {
        debug_assert!(matches!(kind, FilterKind::HighPass | FilterKind::LowPass));
        let mut filter = Self {
            kind,
            stages: [Biquad::new(); MAX_CUT_STAGES],
            active: 2,
            bypassed: false,
        };
        filter.refresh_bypass();
        filter
    }

    pub fn high_pass() -> Self {
        Self::new(FilterKind::HighPass)
    }

    pub fn low_pass() -> Self {
        Self::new(FilterKind::LowPass)
    }

    #[inline]
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// The coefficient set shared by every section of the cascade.
    pub fn design(&self, sample_rate: f32, freq: f32) -> Coefficients {
        Coefficients::compute(self.kind, sample_rate, freq, BUTTERWORTH_Q, 0.0)
    }

    /// Load one coefficient set into every section. Delay state is kept.
    pub fn set_coefficients(&mut self, coeffs: Coefficients) {
        for stage in &mut self.stages {
            stage.set_coefficients(coeffs);
        }
    }

    #[inline]
    pub fn coefficients(&self) -> Coefficients {
        self.stages[0].coefficients()
    }

    /// Activate sections `0..stages`, bypass the rest.
    ///
    /// Values outside `1..=3` are clamped to the nearest valid count.
    pub fn set_slope(&mut self, stages: usize) {
        self.active = stages.clamp(1, MAX_CUT_STAGES);
        self.refresh_bypass();
    }

    #[inline]
    pub fn slope(&self) -> usize {
        self.active
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
        self.refresh_bypass();
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Number of sections currently filtering audio.
    pub fn active_stages(&self) -> usize {
        self.stages.iter().filter(|s| !s.is_bypassed()).count()
    }

    #[inline]
    pub fn stage(&self, index: usize) -> &Biquad {
        &self.stages[index]
    }

    fn refresh_bypass(&mut self) {
        for (i, stage) in self.stages.iter_mut().enumerate() {
            stage.set_bypassed(self.bypassed || i >= self.active);
        }
    }

    pub fn process_block(&mut self, samples: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for stage in &mut self.stages {
            stage.process_block(samples);
        }
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Linear magnitude of the whole cascade at `freq`.
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        self.stages
            .iter()
            .filter(|s| !s.is_bypassed())
            .map(|s| s.coefficients().magnitude_at(freq, sample_rate))
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::coefficients::gain_to_db;

    #[test]
    fn test_slope_selects_stage_count() {
        let mut hp = CutFilter::high_pass();
        for n in 1..=3 {
            hp.set_slope(n);
            assert_eq!(hp.active_stages(), n);
            for i in 0..MAX_CUT_STAGES {
                assert_eq!(hp.stage(i).is_bypassed(), i >= n);
            }
        }
    }

    #[test]
    fn test_invalid_slope_is_clamped() {
        let mut lp = CutFilter::low_pass();
        lp.set_slope(0);
        assert_eq!(lp.active_stages(), 1);
        lp.set_slope(7);
        assert_eq!(lp.active_stages(), 3);
    }

    #[test]
    fn test_slope_change_keeps_coefficients() {
        let mut hp = CutFilter::high_pass();
        let c = hp.design(48_000.0, 250.0);
        hp.set_coefficients(c);
        hp.set_slope(1);
        hp.set_slope(3);
        for i in 0..MAX_CUT_STAGES {
            assert_eq!(hp.stage(i).coefficients(), c);
        }
    }

    #[test]
    fn test_bypass_disables_every_stage() {
        let mut hp = CutFilter::high_pass();
        hp.set_slope(3);
        hp.set_bypassed(true);
        assert_eq!(hp.active_stages(), 0);
        hp.set_bypassed(false);
        assert_eq!(hp.active_stages(), 3);
    }

    #[test]
    fn test_each_stage_adds_twelve_db_per_octave() {
        let sr = 48_000.0;
        let mut hp = CutFilter::high_pass();
        hp.set_coefficients(hp.design(sr, 1_000.0));

        let mut previous = 0.0;
        for n in 1..=3 {
            hp.set_slope(n);
            // well inside the stop band one octave changes ~12 dB per stage
            let drop = gain_to_db(hp.magnitude_at(100.0, sr)) - gain_to_db(hp.magnitude_at(50.0, sr));
            assert!((drop - 12.0 * n as f32).abs() < 1.0, "n={n} drop={drop}");
            assert!(drop > previous);
            previous = drop;
        }
    }

    #[test]
    fn test_bypassed_cascade_is_passthrough() {
        let mut lp = CutFilter::low_pass();
        lp.set_coefficients(lp.design(48_000.0, 500.0));
        lp.set_bypassed(true);
        let mut block: Vec<f32> = (0..64).map(|i| (i as f32 * 0.9).sin()).collect();
        let expected = block.clone();
        lp.process_block(&mut block);
        assert_eq!(block, expected);
    }
}
