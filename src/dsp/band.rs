//! Shelf and peak bands.
//!
//! A band is one biquad whose shape is fixed at construction. Only frequency,
//! gain, Q and bypass change at runtime.

use super::biquad::Biquad;
use super::coefficients::{Coefficients, FilterKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandShape {
    LowShelf,
    HighShelf,
    Peak,
}

impl BandShape {
    pub fn kind(self) -> FilterKind {
        match self {
            BandShape::LowShelf => FilterKind::LowShelf,
            BandShape::HighShelf => FilterKind::HighShelf,
            BandShape::Peak => FilterKind::Peak,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BandFilter {
    shape: BandShape,
    stage: Biquad,
}

impl BandFilter {
    pub fn new(shape: BandShape) -> Self {
        Self {
            shape,
            stage: Biquad::new(),
        }
    }

    #[inline]
    pub fn shape(&self) -> BandShape {
        self.shape
    }

    pub fn design(&self, sample_rate: f32, freq: f32, q: f32, gain_db: f32) -> Coefficients {
        Coefficients::compute(self.shape.kind(), sample_rate, freq, q, gain_db)
    }

    #[inline]
    pub fn set_coefficients(&mut self, coeffs: Coefficients) {
        self.stage.set_coefficients(coeffs);
    }

    #[inline]
    pub fn coefficients(&self) -> Coefficients {
        self.stage.coefficients()
    }

    #[inline]
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.stage.set_bypassed(bypassed);
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.stage.is_bypassed()
    }

    #[inline]
    pub fn process_block(&mut self, samples: &mut [f32]) {
        self.stage.process_block(samples);
    }

    pub fn reset(&mut self) {
        self.stage.reset();
    }

    #[inline]
    pub fn stage(&self) -> &Biquad {
        &self.stage
    }

    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        if self.is_bypassed() {
            1.0
        } else {
            self.coefficients().magnitude_at(freq, sample_rate)
        }
    }
}
