//! Mono Chain: the fixed seven-unit filter path for one channel.
//!
//! Order never changes at runtime:
//! low-cut → low-shelf → low-mid → mid → high-mid → high-shelf → high-cut.
//! Only coefficients and bypass flags move.

use super::band::{BandFilter, BandShape};
use super::coefficients::{gain_to_db, FilterKind};
use super::cut_filter::CutFilter;

/// Identifies one processing unit of a chain, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    LowCut,
    LowShelf,
    LowMid,
    Mid,
    HighMid,
    HighShelf,
    HighCut,
}

impl StageId {
    pub const ALL: [StageId; 7] = [
        StageId::LowCut,
        StageId::LowShelf,
        StageId::LowMid,
        StageId::Mid,
        StageId::HighMid,
        StageId::HighShelf,
        StageId::HighCut,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn bit(self) -> u8 {
        1 << self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            StageId::LowCut => "low-cut",
            StageId::LowShelf => "low-shelf",
            StageId::LowMid => "low-mid",
            StageId::Mid => "mid",
            StageId::HighMid => "high-mid",
            StageId::HighShelf => "high-shelf",
            StageId::HighCut => "high-cut",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutSlot {
    LowCut,
    HighCut,
}

impl CutSlot {
    pub const ALL: [CutSlot; 2] = [CutSlot::LowCut, CutSlot::HighCut];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> FilterKind {
        match self {
            CutSlot::LowCut => FilterKind::HighPass,
            CutSlot::HighCut => FilterKind::LowPass,
        }
    }

    pub fn stage(self) -> StageId {
        match self {
            CutSlot::LowCut => StageId::LowCut,
            CutSlot::HighCut => StageId::HighCut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandSlot {
    LowShelf,
    LowMid,
    Mid,
    HighMid,
    HighShelf,
}

impl BandSlot {
    pub const ALL: [BandSlot; 5] = [
        BandSlot::LowShelf,
        BandSlot::LowMid,
        BandSlot::Mid,
        BandSlot::HighMid,
        BandSlot::HighShelf,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn shape(self) -> BandShape {
        match self {
            BandSlot::LowShelf => BandShape::LowShelf,
            BandSlot::HighShelf => BandShape::HighShelf,
            BandSlot::LowMid | BandSlot::Mid | BandSlot::HighMid => BandShape::Peak,
        }
    }

    pub fn stage(self) -> StageId {
        match self {
            BandSlot::LowShelf => StageId::LowShelf,
            BandSlot::LowMid => StageId::LowMid,
            BandSlot::Mid => StageId::Mid,
            BandSlot::HighMid => StageId::HighMid,
            BandSlot::HighShelf => StageId::HighShelf,
        }
    }
}

/// Channel processor containing the full EQ path for one audio channel
#[derive(Debug, Clone)]
pub struct MonoChain {
    low_cut: CutFilter,
    bands: [BandFilter; 5],
    high_cut: CutFilter,
}

impl Default for MonoChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoChain {
    pub fn new() -> Self {
        Self {
            low_cut: CutFilter::new(CutSlot::LowCut.kind()),
            bands: BandSlot::ALL.map(|slot| BandFilter::new(slot.shape())),
            high_cut: CutFilter::new(CutSlot::HighCut.kind()),
        }
    }

    pub fn cut(&self, slot: CutSlot) -> &CutFilter {
        match slot {
            CutSlot::LowCut => &self.low_cut,
            CutSlot::HighCut => &self.high_cut,
        }
    }

    pub fn cut_mut(&mut self, slot: CutSlot) -> &mut CutFilter {
        match slot {
            CutSlot::LowCut => &mut self.low_cut,
            CutSlot::HighCut => &mut self.high_cut,
        }
    }

    #[inline]
    pub fn band(&self, slot: BandSlot) -> &BandFilter {
        &self.bands[slot.index()]
    }

    #[inline]
    pub fn band_mut(&mut self, slot: BandSlot) -> &mut BandFilter {
        &mut self.bands[slot.index()]
    }

    /// Run every unit over `samples`, one whole unit at a time, in chain order.
    pub fn process_block(&mut self, samples: &mut [f32]) {
        self.low_cut.process_block(samples);
        for band in &mut self.bands {
            band.process_block(samples);
        }
        self.high_cut.process_block(samples);
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        for band in &mut self.bands {
            band.reset();
        }
        self.high_cut.reset();
    }

    /// Whether a unit currently filters audio.
    pub fn is_active(&self, stage: StageId) -> bool {
        match stage {
            StageId::LowCut => !self.low_cut.is_bypassed(),
            StageId::HighCut => !self.high_cut.is_bypassed(),
            StageId::LowShelf => !self.band(BandSlot::LowShelf).is_bypassed(),
            StageId::LowMid => !self.band(BandSlot::LowMid).is_bypassed(),
            StageId::Mid => !self.band(BandSlot::Mid).is_bypassed(),
            StageId::HighMid => !self.band(BandSlot::HighMid).is_bypassed(),
            StageId::HighShelf => !self.band(BandSlot::HighShelf).is_bypassed(),
        }
    }

    /// Analytic magnitude of the whole chain at `freq`, in dB.
    pub fn magnitude_db_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let mut mag = self.low_cut.magnitude_at(freq, sample_rate);
        for band in &self.bands {
            mag *= band.magnitude_at(freq, sample_rate);
        }
        mag *= self.high_cut.magnitude_at(freq, sample_rate);
        gain_to_db(mag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bypass_all(chain: &mut MonoChain) {
        for slot in CutSlot::ALL {
            chain.cut_mut(slot).set_bypassed(true);
        }
        for slot in BandSlot::ALL {
            chain.band_mut(slot).set_bypassed(true);
        }
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let order: Vec<&str> = StageId::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            order,
            ["low-cut", "low-shelf", "low-mid", "mid", "high-mid", "high-shelf", "high-cut"]
        );
        for (i, s) in StageId::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn test_slots_map_to_shapes() {
        let chain = MonoChain::new();
        assert_eq!(chain.band(BandSlot::LowShelf).shape(), BandShape::LowShelf);
        assert_eq!(chain.band(BandSlot::Mid).shape(), BandShape::Peak);
        assert_eq!(chain.band(BandSlot::HighShelf).shape(), BandShape::HighShelf);
        assert_eq!(chain.cut(CutSlot::LowCut).kind(), FilterKind::HighPass);
        assert_eq!(chain.cut(CutSlot::HighCut).kind(), FilterKind::LowPass);
    }

    #[test]
    fn test_fully_bypassed_chain_is_transparent() {
        let mut chain = MonoChain::new();
        bypass_all(&mut chain);
        for stage in StageId::ALL {
            assert!(!chain.is_active(stage));
        }
        let mut block: Vec<f32> = (0..300).map(|i| (i as f32 * 0.05).sin()).collect();
        let expected = block.clone();
        chain.process_block(&mut block);
        assert_eq!(block, expected);
        assert!(chain.magnitude_db_at(1_000.0, 48_000.0).abs() < 1e-4);
    }

    #[test]
    fn test_response_combines_active_units() {
        let sr = 48_000.0;
        let mut chain = MonoChain::new();
        bypass_all(&mut chain);
        let mid = chain.band_mut(BandSlot::Mid);
        mid.set_coefficients(mid.design(sr, 1_000.0, 1.0, 6.0));
        mid.set_bypassed(false);
        let high_mid = chain.band_mut(BandSlot::HighMid);
        high_mid.set_coefficients(high_mid.design(sr, 1_000.0, 1.0, -2.0));
        high_mid.set_bypassed(false);

        assert!((chain.magnitude_db_at(1_000.0, sr) - 4.0).abs() < 0.01);
    }
}
