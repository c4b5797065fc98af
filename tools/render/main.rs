//! Offline render: run a WAV file through the equalizer.
//!
//! usage: eq_render <input.wav> <output.wav> [settings.json] [id=value ...]

use anyhow::{Context, Result};
use eqpt::dsp::analysis::measured_response_db;
use eqpt::engine::EqEngine;
use eqpt::settings::{EqSettings, ParamId};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::PathBuf;

const BLOCK_FRAMES: usize = 512;
const RESPONSE_FFT_LEN: usize = 16_384;
const REFERENCE_FREQS: [f32; 8] = [
    30.0, 100.0, 250.0, 1_000.0, 2_500.0, 4_000.0, 10_000.0, 16_000.0,
];

fn parse_override(arg: &str) -> Result<(ParamId, f32)> {
    let (id, value) = arg
        .split_once('=')
        .with_context(|| format!("expected id=value, got '{arg}'"))?;
    let id = ParamId::from_id(id.trim())
        .with_context(|| format!("unknown parameter id '{}'", id.trim()))?;
    let value = match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" => 1.0,
        "false" | "off" => 0.0,
        v => v
            .parse::<f32>()
            .with_context(|| format!("invalid value '{v}' for '{}'", id.id()))?,
    };
    Ok((id, value))
}

fn read_frames(path: &PathBuf) -> Result<(WavSpec, Vec<Vec<f32>>)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open input WAV '{}'", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        anyhow::bail!("input WAV has no channels");
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("failed to decode float samples")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                anyhow::bail!("unsupported bit depth {}", spec.bits_per_sample);
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .context("failed to decode integer samples")?
        }
    };

    let mut planar = vec![Vec::with_capacity(interleaved.len() / channels); channels];
    for frame in interleaved.chunks(channels) {
        for (ch, &s) in frame.iter().enumerate() {
            planar[ch].push(s);
        }
    }
    Ok((spec, planar))
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let usage = "usage: eq_render <input.wav> <output.wav> [settings.json] [id=value ...]";
    let input = args.next().map(PathBuf::from).context(usage)?;
    let output = args.next().map(PathBuf::from).context(usage)?;

    let mut settings = EqSettings::default();
    for arg in args {
        if arg.contains('=') {
            let (id, value) = parse_override(&arg)?;
            settings.set_plain(id, value);
        } else {
            let bytes = std::fs::read(&arg)
                .with_context(|| format!("failed to read settings '{arg}'"))?;
            settings
                .restore(&bytes)
                .with_context(|| format!("failed to load settings '{arg}'"))?;
        }
    }

    let (spec, mut planar) = read_frames(&input)?;
    let channels = planar.len();
    let frames = planar.first().map_or(0, Vec::len);
    let sample_rate = spec.sample_rate as f32;

    let mut engine = EqEngine::new();
    engine.prepare(sample_rate, BLOCK_FRAMES);
    // Apply settings before the first block so the response below is valid
    // even for an empty file.
    engine.process(&settings, &mut [], 0);

    let mut start = 0;
    while start < frames {
        let end = (start + BLOCK_FRAMES).min(frames);
        let mut block: Vec<&mut [f32]> = planar.iter_mut().map(|ch| &mut ch[start..end]).collect();
        engine.process(&settings, &mut block, channels);
        start = end;
    }

    let out_spec = WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&output, out_spec)
        .with_context(|| format!("failed to create output WAV '{}'", output.display()))?;
    for i in 0..frames {
        for ch in &planar {
            writer.write_sample(ch[i])?;
        }
    }
    writer.finalize().context("failed to finalize output WAV")?;

    let chain = engine.chain(0);
    let measured = measured_response_db(chain, sample_rate, &REFERENCE_FREQS, RESPONSE_FFT_LEN);
    println!(
        "Rendered '{}' -> '{}' ({} frames, {} channel(s), {} Hz)",
        input.display(),
        output.display(),
        frames,
        channels,
        spec.sample_rate
    );
    println!("  {:>9}  {:>10}  {:>10}", "freq", "analytic", "measured");
    for (&f, m) in REFERENCE_FREQS.iter().zip(measured) {
        if f >= sample_rate * 0.5 {
            continue;
        }
        println!(
            "  {:>6.0} Hz  {:>7.2} dB  {:>7.2} dB",
            f,
            chain.magnitude_db_at(f, sample_rate),
            m
        );
    }
    Ok(())
}
