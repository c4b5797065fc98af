//! Biquad Filter Stage (IIR 2nd Order)
//!
//! The atomic unit of every equalizer band. One stage owns one coefficient
//! set and one pair of delay registers for a single channel.
//!
//! # Design Notes
//! - Transposed direct form II recurrence
//! - Coefficient swaps never touch the delay registers (no clicks on retune)
//! - A bypassed stage passes audio through untouched and does not advance
//!   its state; re-enabling it restarts from cleared registers
//! - All operations are safe for the audio thread (no allocations)

use super::coefficients::Coefficients;

/// Biquad filter stage (IIR 2nd order)
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    coeffs: Coefficients,
    z1: f32,
    z2: f32,
    bypassed: bool,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Biquad {
    pub fn new() -> Self {
        Self::with_coefficients(Coefficients::IDENTITY)
    }

    pub fn with_coefficients(coeffs: Coefficients) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
            bypassed: false,
        }
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.bypassed {
            return input;
        }
        self.tick(input)
    }

    /// Process a block in place.
    #[inline]
    pub fn process_block(&mut self, samples: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for s in samples.iter_mut() {
            *s = self.tick(*s);
        }
    }

    #[inline(always)]
    fn tick(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let out = input * c.b0 + self.z1;

        // Anti-denormal: tiny DC offset
        self.z1 = input * c.b1 + self.z2 - c.a1 * out + 1e-25;
        self.z2 = input * c.b2 - c.a2 * out + 1e-25;

        out
    }

    /// Swap the coefficient set. Delay registers are kept as they are.
    ///
    /// The whole set is replaced in one assignment; `&mut self` guarantees no
    /// `process` call can observe a partially written set.
    #[inline]
    pub fn set_coefficients(&mut self, coeffs: Coefficients) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coefficients(&self) -> Coefficients {
        self.coeffs
    }

    /// Enable or bypass the stage. Leaving bypass clears the delay registers.
    #[inline]
    pub fn set_bypassed(&mut self, bypassed: bool) {
        if self.bypassed && !bypassed {
            self.reset();
        }
        self.bypassed = bypassed;
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Explicitly clear filter delay state.
    ///
    /// IMPORTANT:
    /// - This is NOT called by coefficient updates.
    /// - Only stream (re)start and leaving bypass reset the registers.
    #[inline]
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    #[inline]
    pub fn state(&self) -> (f32, f32) {
        (self.z1, self.z2)
    }
}
