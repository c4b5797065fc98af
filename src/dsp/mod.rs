pub mod analysis;
pub mod band;
pub mod biquad;
pub mod chain;
pub mod coefficients;
pub mod cut_filter;

pub use band::{BandFilter, BandShape};
pub use biquad::Biquad;
pub use chain::{BandSlot, CutSlot, MonoChain, StageId};
pub use coefficients::{db_to_gain, Coefficients, FilterKind};
pub use cut_filter::{CutFilter, MAX_CUT_STAGES};
