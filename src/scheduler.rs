//! Update Scheduler
//!
//! Polls the parameter source once per block and pushes the minimal set of
//! changes into the chains before any sample of that block is processed.
//!
//! ## Rules
//! - One "last applied" snapshot per unit; `None` forces a full apply
//! - Coefficients are designed once per changed unit and shared by every
//!   channel
//! - Bypass and slope changes only flip bypass flags
//! - Units are visited in chain order so runs are deterministic
//!
//! INVARIANT: after `update` returns, every stage's coefficients match the
//! values just read from the source.

use crate::dsp::chain::{BandSlot, CutSlot, MonoChain, StageId};
use crate::settings::{BandSpec, CutSpec, EqParamSource};

/// What one `update` call changed, as bitmasks over `StageId`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub recomputed: u8,
    pub toggled: u8,
}

impl UpdateReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.recomputed == 0 && self.toggled == 0
    }

    #[inline]
    pub fn recomputed(&self, stage: StageId) -> bool {
        self.recomputed & stage.bit() != 0
    }

    #[inline]
    pub fn toggled(&self, stage: StageId) -> bool {
        self.toggled & stage.bit() != 0
    }

    pub fn recompute_count(&self) -> u32 {
        self.recomputed.count_ones()
    }
}

#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    sample_rate: f32,
    applied_cuts: [Option<CutSpec>; 2],
    applied_bands: [Option<BandSpec>; 5],
    recompute_count: u64,
}

impl UpdateScheduler {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            applied_cuts: [None; 2],
            applied_bands: [None; 5],
            recompute_count: 0,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Change the design rate. Every unit is redesigned on the next update.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.invalidate();
    }

    /// Forget every snapshot so the next update reapplies everything.
    pub fn invalidate(&mut self) {
        self.applied_cuts = [None; 2];
        self.applied_bands = [None; 5];
    }

    /// Total coefficient designs performed since construction.
    #[inline]
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    /// Bring `chains` in line with `params`.
    pub fn update<P: EqParamSource + ?Sized>(
        &mut self,
        params: &P,
        chains: &mut [MonoChain],
    ) -> UpdateReport {
        let mut report = UpdateReport::default();
        self.update_cut(CutSlot::LowCut, params.cut(CutSlot::LowCut), chains, &mut report);
        for slot in BandSlot::ALL {
            self.update_band(slot, params.band(slot), chains, &mut report);
        }
        self.update_cut(CutSlot::HighCut, params.cut(CutSlot::HighCut), chains, &mut report);
        report
    }

    fn update_cut(
        &mut self,
        slot: CutSlot,
        spec: CutSpec,
        chains: &mut [MonoChain],
        report: &mut UpdateReport,
    ) {
        let applied = &mut self.applied_cuts[slot.index()];
        if applied.map_or(false, |prev| prev.same_as(&spec)) {
            return;
        }
        let stage = slot.stage();

        if !applied.map_or(false, |prev| prev.same_frequency(&spec)) {
            if let Some(first) = chains.first() {
                let coeffs = first.cut(slot).design(self.sample_rate, spec.frequency);
                self.recompute_count += 1;
                report.recomputed |= stage.bit();
                for chain in chains.iter_mut() {
                    chain.cut_mut(slot).set_coefficients(coeffs);
                }
            }
        }

        let flags_changed = applied.map_or(true, |prev| {
            prev.slope != spec.slope || prev.bypassed != spec.bypassed
        });
        if flags_changed {
            report.toggled |= stage.bit();
            for chain in chains.iter_mut() {
                let cut = chain.cut_mut(slot);
                cut.set_slope(spec.slope.stages());
                cut.set_bypassed(spec.bypassed);
            }
        }

        *applied = Some(spec);
    }

    fn update_band(
        &mut self,
        slot: BandSlot,
        spec: BandSpec,
        chains: &mut [MonoChain],
        report: &mut UpdateReport,
    ) {
        let applied = &mut self.applied_bands[slot.index()];
        if applied.map_or(false, |prev| prev.same_as(&spec)) {
            return;
        }
        let stage = slot.stage();

        if !applied.map_or(false, |prev| prev.same_shape(&spec)) {
            if let Some(first) = chains.first() {
                let coeffs =
                    first
                        .band(slot)
                        .design(self.sample_rate, spec.frequency, spec.q, spec.gain_db);
                self.recompute_count += 1;
                report.recomputed |= stage.bit();
                for chain in chains.iter_mut() {
                    chain.band_mut(slot).set_coefficients(coeffs);
                }
            }
        }

        if applied.map_or(true, |prev| prev.bypassed != spec.bypassed) {
            report.toggled |= stage.bit();
            for chain in chains.iter_mut() {
                chain.band_mut(slot).set_bypassed(spec.bypassed);
            }
        }

        *applied = Some(spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::coefficients::{Coefficients, FilterKind, BUTTERWORTH_Q};
    use crate::settings::{EqSettings, Slope};

    const SR: f32 = 48_000.0;

    fn setup() -> (UpdateScheduler, [MonoChain; 2]) {
        (UpdateScheduler::new(SR), [MonoChain::new(), MonoChain::new()])
    }

    #[test]
    fn test_first_update_designs_every_unit() {
        let (mut sched, mut chains) = setup();
        let report = sched.update(&EqSettings::default(), &mut chains);
        assert_eq!(report.recompute_count(), 7);
        assert_eq!(sched.recompute_count(), 7);
        for stage in StageId::ALL {
            assert!(report.recomputed(stage));
            assert!(report.toggled(stage));
        }
    }

    #[test]
    fn test_second_update_is_idle() {
        let (mut sched, mut chains) = setup();
        let settings = EqSettings::default();
        sched.update(&settings, &mut chains);
        let before = sched.recompute_count();
        let report = sched.update(&settings, &mut chains);
        assert!(report.is_empty());
        assert_eq!(sched.recompute_count(), before);
    }

    #[test]
    fn test_only_changed_band_is_redesigned() {
        let (mut sched, mut chains) = setup();
        let mut settings = EqSettings::default();
        sched.update(&settings, &mut chains);

        settings.mid.gain_db = 6.0;
        let report = sched.update(&settings, &mut chains);
        assert_eq!(report.recomputed, StageId::Mid.bit());
        assert_eq!(report.toggled, 0);
        assert_eq!(sched.recompute_count(), 8);

        let expected = Coefficients::compute(FilterKind::Peak, SR, 1_000.0, 1.0, 6.0);
        for chain in &chains {
            assert_eq!(chain.band(BandSlot::Mid).coefficients(), expected);
        }
    }

    #[test]
    fn test_bypass_toggle_does_not_redesign() {
        let (mut sched, mut chains) = setup();
        let mut settings = EqSettings::default();
        sched.update(&settings, &mut chains);

        settings.high_shelf.bypassed = true;
        let report = sched.update(&settings, &mut chains);
        assert_eq!(report.recomputed, 0);
        assert_eq!(report.toggled, StageId::HighShelf.bit());
        for chain in &chains {
            assert!(chain.band(BandSlot::HighShelf).is_bypassed());
        }
    }

    #[test]
    fn test_slope_change_only_flips_flags() {
        let (mut sched, mut chains) = setup();
        let mut settings = EqSettings::default();
        settings.low_cut.frequency = 150.0;
        settings.low_cut.slope = Slope::Db12;
        sched.update(&settings, &mut chains);
        let coeffs = chains[0].cut(CutSlot::LowCut).coefficients();
        assert_eq!(chains[0].cut(CutSlot::LowCut).active_stages(), 1);

        for (slope, active) in [(Slope::Db24, 2), (Slope::Db36, 3), (Slope::Db12, 1)] {
            settings.low_cut.slope = slope;
            let report = sched.update(&settings, &mut chains);
            assert_eq!(report.recomputed, 0);
            assert!(report.toggled(StageId::LowCut));
            for chain in &chains {
                let cut = chain.cut(CutSlot::LowCut);
                assert_eq!(cut.active_stages(), active);
                for i in 0..active {
                    assert_eq!(cut.stage(i).coefficients(), coeffs);
                }
            }
        }
    }

    #[test]
    fn test_cut_frequency_change_updates_every_stage() {
        let (mut sched, mut chains) = setup();
        let mut settings = EqSettings::default();
        settings.high_cut.slope = Slope::Db36;
        sched.update(&settings, &mut chains);

        settings.high_cut.frequency = 6_000.0;
        let report = sched.update(&settings, &mut chains);
        assert_eq!(report.recomputed, StageId::HighCut.bit());
        let expected = Coefficients::compute(FilterKind::LowPass, SR, 6_000.0, BUTTERWORTH_Q, 0.0);
        for chain in &chains {
            for i in 0..3 {
                assert_eq!(chain.cut(CutSlot::HighCut).stage(i).coefficients(), expected);
            }
        }
    }

    #[test]
    fn test_bypassed_band_still_tracks_parameters() {
        let (mut sched, mut chains) = setup();
        let mut settings = EqSettings::default();
        settings.low_mid.bypassed = true;
        sched.update(&settings, &mut chains);

        settings.low_mid.frequency = 350.0;
        settings.low_mid.gain_db = -5.0;
        sched.update(&settings, &mut chains);
        settings.low_mid.bypassed = false;
        let report = sched.update(&settings, &mut chains);
        assert_eq!(report.recomputed, 0);

        let expected = Coefficients::compute(FilterKind::Peak, SR, 350.0, 1.0, -5.0);
        assert_eq!(chains[1].band(BandSlot::LowMid).coefficients(), expected);
    }

    #[test]
    fn test_corrupt_values_never_reach_audio_as_nan() {
        let (mut sched, mut chains) = setup();
        let mut settings = EqSettings::default();
        settings.mid.frequency = f32::NAN;
        settings.mid.q = -3.0;
        settings.mid.gain_db = f32::INFINITY;
        settings.low_cut.frequency = 1e12;
        sched.update(&settings, &mut chains);
        assert!(chains[0].band(BandSlot::Mid).coefficients().is_finite());
        assert!(chains[0].cut(CutSlot::LowCut).coefficients().is_finite());

        // NaN compares equal to its own snapshot bitwise: no redesign storm
        let before = sched.recompute_count();
        sched.update(&settings, &mut chains);
        assert_eq!(sched.recompute_count(), before);
    }

    #[test]
    fn test_sample_rate_change_redesigns_everything() {
        let (mut sched, mut chains) = setup();
        let settings = EqSettings::default();
        sched.update(&settings, &mut chains);
        sched.set_sample_rate(96_000.0);
        let report = sched.update(&settings, &mut chains);
        assert_eq!(report.recompute_count(), 7);
        let expected = Coefficients::compute(FilterKind::Peak, 96_000.0, 1_000.0, 1.0, 0.0);
        assert_eq!(chains[0].band(BandSlot::Mid).coefficients(), expected);
    }

    #[test]
    fn test_update_order_does_not_matter() {
        let mut settings = EqSettings::default();
        settings.low_shelf.gain_db = 3.0;
        settings.high_mid.gain_db = -7.0;
        settings.high_cut.frequency = 9_000.0;

        let (mut a, mut chains_a) = setup();
        a.update(&settings, &mut chains_a);

        // apply the same end state in two steps
        let (mut b, mut chains_b) = setup();
        let mut partial = settings;
        partial.high_mid.gain_db = 0.0;
        b.update(&partial, &mut chains_b);
        b.update(&settings, &mut chains_b);

        for slot in BandSlot::ALL {
            assert_eq!(
                chains_a[0].band(slot).coefficients(),
                chains_b[0].band(slot).coefficients(),
                "{slot:?}"
            );
        }
        for slot in CutSlot::ALL {
            assert_eq!(
                chains_a[0].cut(slot).coefficients(),
                chains_b[0].cut(slot).coefficients(),
                "{slot:?}"
            );
        }
    }
}
