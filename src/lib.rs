pub mod debug;
pub mod dsp;
pub mod engine;
pub mod params;
pub mod scheduler;
pub mod settings;
pub mod state;

use crate::debug::{event_channel, EventDrain, EventLog, SchedulerEvent, EVENT_LOG_CAP};
use crate::engine::{EqEngine, MAX_CHANNELS};
use crate::params::EqParams;
use nih_plug::prelude::*;
use std::sync::Arc;

/// Work handed to the background thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqTask {
    DrainEvents,
}

// -----------------------------------------------------------------------------
// PLUGIN STRUCT
// -----------------------------------------------------------------------------
struct EqPlugin {
    params: Arc<EqParams>,
    engine: EqEngine,
    input_channels: usize,

    // Scheduler events (audio thread -> background task)
    event_log: EventLog,
    event_drain: Arc<EventDrain>,
    block_index: u64,
}

impl Default for EqPlugin {
    fn default() -> Self {
        let (event_log, event_drain) = event_channel(EVENT_LOG_CAP);
        Self {
            params: Arc::new(EqParams::default()),
            engine: EqEngine::new(),
            input_channels: MAX_CHANNELS,
            event_log,
            event_drain: Arc::new(event_drain),
            block_index: 0,
        }
    }
}

impl Plugin for EqPlugin {
    const NAME: &'static str = "EQPT";
    const VENDOR: &'static str = "eqpt";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = EqTask;

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.input_channels = audio_io_layout
                .main_input_channels
                .map(|c| c.get() as usize)
                .unwrap_or(0);
            self.engine.prepare(
                buffer_config.sample_rate,
                buffer_config.max_buffer_size as usize,
            );
            self.block_index = 0;
            log::info!(
                "EQ prepared: {} Hz, max block {}, {} input channel(s)",
                buffer_config.sample_rate,
                buffer_config.max_buffer_size,
                self.input_channels
            );
            true
        }))
        .unwrap_or(false)
    }

    fn task_executor(&mut self) -> TaskExecutor<Self> {
        let drain = self.event_drain.clone();
        Box::new(move |task| match task {
            EqTask::DrainEvents => {
                drain.drain_to_log();
            }
        })
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let report =
                self.engine
                    .process(self.params.as_ref(), buffer.as_slice(), self.input_channels);

            if cfg!(feature = "debug") && !report.is_empty() {
                let event = SchedulerEvent {
                    block: self.block_index,
                    report,
                };
                if self.event_log.push(event) {
                    context.execute_background(EqTask::DrainEvents);
                }
            }
            self.block_index = self.block_index.wrapping_add(1);
        }))
        .unwrap_or(());
        ProcessStatus::Normal
    }

    fn reset(&mut self) {
        self.engine.reset();
    }
}

impl ClapPlugin for EqPlugin {
    const CLAP_ID: &'static str = "com.eqpt.parametric-eq";
    const CLAP_DESCRIPTION: Option<&'static str> = Some("Seven-stage parametric equalizer");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Equalizer,
        ClapFeature::Stereo,
        ClapFeature::Mono,
    ];
}

impl Vst3Plugin for EqPlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"EqptParametricEq";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Eq];
}

nih_export_clap!(EqPlugin);
nih_export_vst3!(EqPlugin);
