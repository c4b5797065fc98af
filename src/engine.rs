//! EQ Engine (block processor)
//!
//! Owns one `MonoChain` per channel and the scheduler that feeds them.
//!
//! Per block:
//! 1. scheduler update (coefficients and bypass flags)
//! 2. each channel through its chain, in place
//! 3. polarity flip and output gain over the whole buffer
//!
//! No allocation, no locking, no logging on this path.

use crate::dsp::chain::MonoChain;
use crate::dsp::coefficients::{clamp_finite, clamp_sample_rate, db_to_gain};
use crate::scheduler::{UpdateReport, UpdateScheduler};
use crate::settings::{EqParamSource, MAX_OUTPUT_GAIN_DB, MIN_OUTPUT_GAIN_DB};

pub const MAX_CHANNELS: usize = 2;

#[derive(Debug, Clone)]
pub struct EqEngine {
    chains: [MonoChain; MAX_CHANNELS],
    scheduler: UpdateScheduler,
    sample_rate: Option<f32>,
    max_block_size: usize,
}

impl Default for EqEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EqEngine {
    pub fn new() -> Self {
        Self {
            chains: [MonoChain::new(), MonoChain::new()],
            scheduler: UpdateScheduler::new(crate::dsp::coefficients::DEFAULT_SAMPLE_RATE),
            sample_rate: None,
            max_block_size: 0,
        }
    }

    /// Must run before the first `process`. Clears all filter state and
    /// forces a full redesign at the new rate.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        let sample_rate = clamp_sample_rate(sample_rate);
        self.sample_rate = Some(sample_rate);
        self.max_block_size = max_block_size;
        self.scheduler.set_sample_rate(sample_rate);
        for chain in &mut self.chains {
            chain.reset();
        }
    }

    /// Stream restart: clear delay state, keep the prepared configuration.
    pub fn reset(&mut self) {
        for chain in &mut self.chains {
            chain.reset();
        }
        self.scheduler.invalidate();
    }

    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.sample_rate.is_some()
    }

    #[inline]
    pub fn sample_rate(&self) -> Option<f32> {
        self.sample_rate
    }

    #[inline]
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    #[inline]
    pub fn chain(&self, channel: usize) -> &MonoChain {
        &self.chains[channel]
    }

    #[inline]
    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// Process one block in place.
    ///
    /// Only the first two input channels run through a chain. Polarity and
    /// output gain apply to every input channel. Channels at or beyond
    /// `input_channels` are silenced.
    pub fn process<P: EqParamSource + ?Sized>(
        &mut self,
        params: &P,
        channels: &mut [&mut [f32]],
        input_channels: usize,
    ) -> UpdateReport {
        debug_assert!(self.is_prepared(), "EqEngine::process called before prepare");
        if !self.is_prepared() {
            return UpdateReport::default();
        }
        debug_assert!(channels
            .iter()
            .all(|c| self.max_block_size == 0 || c.len() <= self.max_block_size));

        let report = self.scheduler.update(params, &mut self.chains);

        for (index, samples) in channels.iter_mut().enumerate() {
            if index >= input_channels {
                samples.fill(0.0);
            } else if let Some(chain) = self.chains.get_mut(index) {
                chain.process_block(samples);
            }
        }

        let gain_db = clamp_finite(
            params.output_gain_db(),
            MIN_OUTPUT_GAIN_DB,
            MAX_OUTPUT_GAIN_DB,
            0.0,
        );
        let mut gain = db_to_gain(gain_db);
        if params.polarity_flipped() {
            gain = -gain;
        }
        if gain != 1.0 {
            for samples in channels.iter_mut().take(input_channels) {
                for s in samples.iter_mut() {
                    *s *= gain;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::chain::{BandSlot, CutSlot};
    use crate::settings::{EqSettings, Slope};
    use std::f32::consts::PI;

    const SR: f32 = 48_000.0;
    const BLOCK: usize = 480;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len).map(|n| (2.0 * PI * freq * n as f32 / SR).sin()).collect()
    }

    /// Run a mono signal through both channels in blocks; return the left output.
    fn run(engine: &mut EqEngine, settings: &EqSettings, input: &[f32]) -> Vec<f32> {
        let mut left = input.to_vec();
        let mut right = input.to_vec();
        for (l, r) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
            let mut block: [&mut [f32]; 2] = [l, r];
            engine.process(settings, &mut block, 2);
        }
        assert_eq!(left, right);
        left
    }

    fn peak_abs(x: &[f32]) -> f32 {
        x.iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }

    fn prepared() -> EqEngine {
        let mut engine = EqEngine::new();
        engine.prepare(SR, BLOCK);
        engine
    }

    #[test]
    fn test_low_cut_attenuates_below_corner() {
        // 100 Hz, 12 dB/oct, everything else bypassed
        let mut settings = EqSettings::bypassed();
        settings.low_cut = crate::settings::CutSpec {
            frequency: 100.0,
            slope: Slope::Db12,
            bypassed: false,
        };

        let len = SR as usize * 2;
        let settle = SR as usize;
        let mut engine = prepared();
        let low = run(&mut engine, &settings, &sine(30.0, len));
        let mut engine = prepared();
        let high = run(&mut engine, &settings, &sine(1_000.0, len));

        let low_peak = peak_abs(&low[settle..]);
        let high_peak = peak_abs(&high[settle..]);
        let ratio_db = 20.0 * (low_peak / high_peak).log10();
        assert!(ratio_db < -5.0, "ratio_db={ratio_db}");
        assert!((high_peak - 1.0).abs() < 0.01);
        assert_eq!(engine.chain(0).cut(CutSlot::LowCut).active_stages(), 1);
    }

    #[test]
    fn test_peak_boost_at_center() {
        let mut settings = EqSettings::bypassed();
        settings.mid.frequency = 1_000.0;
        settings.mid.gain_db = 6.0;
        settings.mid.q = 1.0;
        settings.mid.bypassed = false;

        let mut engine = prepared();
        let out = run(&mut engine, &settings, &sine(1_000.0, SR as usize));
        let ratio = peak_abs(&out[SR as usize / 2..]);
        assert!((ratio - 10f32.powf(6.0 / 20.0)).abs() < 0.01, "ratio={ratio}");
    }

    #[test]
    fn test_polarity_flip_negates_exactly() {
        let mut settings = EqSettings::bypassed();
        settings.polarity_flipped = true;

        let input: Vec<f32> = (0..2_000).map(|n| ((n as f32) * 0.013).sin() * 0.7 - 0.1).collect();
        let mut engine = prepared();
        let out = run(&mut engine, &settings, &input);
        for (o, i) in out.iter().zip(&input) {
            assert_eq!(*o, -*i);
        }
    }

    #[test]
    fn test_output_gain_minus_sixty() {
        let mut settings = EqSettings::bypassed();
        settings.output_gain_db = -60.0;

        let input = sine(440.0, 4_800);
        let mut engine = prepared();
        let out = run(&mut engine, &settings, &input);
        for (o, i) in out.iter().zip(&input) {
            assert!((o - i * 0.001).abs() < 1e-7);
        }
    }

    #[test]
    fn test_transparent_settings_leave_audio_untouched() {
        let input = sine(123.0, 3_000);
        let mut engine = prepared();
        let out = run(&mut engine, &EqSettings::bypassed(), &input);
        assert_eq!(out, input);
    }

    #[test]
    fn test_extra_output_channels_are_silenced() {
        let mut engine = prepared();
        let mut l = vec![0.5f32; 64];
        let mut r = vec![0.25f32; 64];
        let mut third = vec![0.9f32; 64];
        {
            let mut block: [&mut [f32]; 3] = [&mut l, &mut r, &mut third];
            engine.process(&EqSettings::bypassed(), &mut block, 1);
        }
        assert!(l.iter().all(|&s| s == 0.5));
        assert!(r.iter().all(|&s| s == 0.0));
        assert!(third.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_channels_beyond_chain_count_get_gain_only() {
        let mut settings = EqSettings::bypassed();
        settings.mid.gain_db = 12.0;
        settings.mid.bypassed = false;
        settings.output_gain_db = -6.0;

        let mut engine = prepared();
        let input = sine(1_000.0, 256);
        let mut a = input.clone();
        let mut b = input.clone();
        let mut c = input.clone();
        {
            let mut block: [&mut [f32]; 3] = [&mut a, &mut b, &mut c];
            engine.process(&settings, &mut block, 3);
        }
        let g = db_to_gain(-6.0);
        for (o, i) in c.iter().zip(&input) {
            assert_eq!(*o, i * g);
        }
        assert_ne!(a, c);
        assert_eq!(a, b);
    }

    #[test]
    fn test_polarity_flips_every_input_channel() {
        let mut settings = EqSettings::bypassed();
        settings.polarity_flipped = true;

        let mut engine = prepared();
        let mut a = vec![0.5f32; 32];
        let mut b = vec![0.5f32; 32];
        let mut c = vec![0.5f32; 32];
        let mut d = vec![0.5f32; 32];
        {
            let mut block: [&mut [f32]; 4] = [&mut a, &mut b, &mut c, &mut d];
            engine.process(&settings, &mut block, 3);
        }
        for ch in [&a, &b, &c] {
            assert!(ch.iter().all(|&s| s == -0.5));
        }
        assert!(d.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_steady_parameters_do_not_recompute() {
        let settings = EqSettings::default();
        let mut engine = prepared();
        run(&mut engine, &settings, &sine(200.0, BLOCK));
        let after_first = engine.scheduler().recompute_count();
        run(&mut engine, &settings, &sine(200.0, BLOCK * 10));
        assert_eq!(engine.scheduler().recompute_count(), after_first);
    }

    #[test]
    fn test_parameter_change_applies_on_next_block() {
        let mut settings = EqSettings::bypassed();
        let mut engine = prepared();
        let mut l = sine(1_000.0, BLOCK);
        let mut r = l.clone();
        engine.process(&settings, &mut [&mut l[..], &mut r[..]], 2);

        settings.high_mid.bypassed = false;
        settings.high_mid.frequency = 2_000.0;
        settings.high_mid.gain_db = -9.0;
        let report = engine.process(&settings, &mut [&mut l[..], &mut r[..]], 2);
        assert!(report.recomputed(crate::dsp::StageId::HighMid));
        assert!(!engine.chain(0).band(BandSlot::HighMid).is_bypassed());
        assert!(!engine.chain(1).band(BandSlot::HighMid).is_bypassed());
    }

    #[test]
    fn test_reset_forces_full_reapply() {
        let settings = EqSettings::default();
        let mut engine = prepared();
        run(&mut engine, &settings, &sine(100.0, BLOCK));
        engine.reset();
        let mut l = vec![0.0; BLOCK];
        let mut r = vec![0.0; BLOCK];
        let report = engine.process(&settings, &mut [&mut l[..], &mut r[..]], 2);
        assert_eq!(report.recompute_count(), 7);
    }

    #[test]
    fn test_out_of_range_gain_is_clamped() {
        let mut settings = EqSettings::bypassed();
        settings.output_gain_db = 200.0;
        let mut engine = prepared();
        let out = run(&mut engine, &settings, &[0.1; 16]);
        assert!((out[0] - 0.1 * db_to_gain(MAX_OUTPUT_GAIN_DB)).abs() < 1e-6);

        settings.output_gain_db = f32::NAN;
        let out = run(&mut engine, &settings, &[0.1; 16]);
        assert_eq!(out[0], 0.1);
    }
}
