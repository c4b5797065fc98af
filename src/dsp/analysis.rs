//! Measured frequency response of a chain.
//!
//! Drives a copy of the chain with a unit impulse and takes the FFT of the
//! response. Used offline to cross-check the analytic curve; never called
//! from the audio thread.

use rustfft::{num_complex::Complex, FftPlanner};

use super::chain::MonoChain;
use super::coefficients::gain_to_db;

/// Frequency of the FFT bin closest to `freq`.
pub fn bin_frequency(freq: f32, sample_rate: f32, fft_len: usize) -> f32 {
    let bin = nearest_bin(freq, sample_rate, fft_len);
    bin as f32 * sample_rate / fft_len as f32
}

fn nearest_bin(freq: f32, sample_rate: f32, fft_len: usize) -> usize {
    let bin = (freq * fft_len as f32 / sample_rate).round() as usize;
    bin.min(fft_len / 2)
}

/// Impulse response of `chain` (from cleared state), `len` samples long.
pub fn impulse_response(chain: &MonoChain, len: usize) -> Vec<f32> {
    let mut probe = chain.clone();
    probe.reset();
    let mut ir = vec![0.0f32; len];
    if let Some(first) = ir.first_mut() {
        *first = 1.0;
    }
    probe.process_block(&mut ir);
    ir
}

/// Magnitude in dB at each requested frequency, read from the nearest bin of
/// a `fft_len`-point FFT of the impulse response.
pub fn measured_response_db(
    chain: &MonoChain,
    sample_rate: f32,
    freqs: &[f32],
    fft_len: usize,
) -> Vec<f32> {
    let ir = impulse_response(chain, fft_len);
    let mut spectrum: Vec<Complex<f32>> = ir.iter().map(|&x| Complex::new(x, 0.0)).collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_len);
    fft.process(&mut spectrum);

    freqs
        .iter()
        .map(|&f| gain_to_db(spectrum[nearest_bin(f, sample_rate, fft_len)].norm()))
        .collect()
}
