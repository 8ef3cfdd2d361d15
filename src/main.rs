// Beatkeeper CLI - play through the output device, render to WAV, list devices

use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use beatkeeper::audio::device::AudioDeviceManager;
use beatkeeper::audio::export::{AudioExporter, ExportSettings};
use beatkeeper::sequencer::SlotOutcome;
use beatkeeper::{
    AccentPattern, BeatParams, Metronome, MetronomeConfig, SoundBank, SoundProfile, StopPolicy,
    Tempo, TimeSignature, load_sound,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

// How long `play` waits for custom sounds to decode before starting anyway
const CUSTOM_SOUND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Look-ahead metronome", long_about = None)]
struct Cli {
    /// RON config file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Click through the output device until Enter is pressed
    Play {
        #[command(flatten)]
        beat: BeatArgs,

        /// Stop by itself after this many seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// play-out or silence
        #[arg(long)]
        stop_policy: Option<StopPolicy>,
    },
    /// Render a metronome run to a 16-bit WAV file
    Render {
        output: PathBuf,

        #[command(flatten)]
        beat: BeatArgs,

        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,

        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,

        #[arg(long, default_value_t = 2)]
        channels: u16,
    },
    /// List output devices
    Devices,
}

#[derive(Args, Debug)]
struct BeatArgs {
    /// Beats per minute (1-240)
    #[arg(short, long)]
    tempo: Option<u32>,

    /// Time signature such as 3/4 or 6/8; the numerator sets the accent
    #[arg(short, long, conflicts_with_all = ["beats", "no_accent"])]
    signature: Option<TimeSignature>,

    /// Accent every N beats
    #[arg(short, long, conflicts_with = "no_accent")]
    beats: Option<u32>,

    /// Never accent
    #[arg(long)]
    no_accent: bool,

    /// digital, wood, metallic or custom
    #[arg(short, long)]
    profile: Option<SoundProfile>,

    /// Audio file used for accented beats (selects the custom profile)
    #[arg(long)]
    accent_sound: Option<PathBuf>,

    /// Audio file used for regular beats (selects the custom profile)
    #[arg(long)]
    beat_sound: Option<PathBuf>,
}

impl BeatArgs {
    fn to_params(&self, config: &MetronomeConfig) -> Result<BeatParams, Box<dyn Error>> {
        let mut params = config.defaults.to_params();

        if let Some(bpm) = self.tempo {
            params.tempo = Tempo::new(bpm)?;
        }
        if let Some(signature) = self.signature {
            params.accents = signature.accent_pattern();
        } else if let Some(beats) = self.beats {
            params.accents = AccentPattern::from_beats_per_measure(beats);
        } else if self.no_accent {
            params.accents = AccentPattern::Disabled;
        }

        params.profile = match self.profile {
            Some(profile) => profile,
            None if self.has_custom_sounds() => SoundProfile::Custom,
            None => params.profile,
        };
        Ok(params)
    }

    fn has_custom_sounds(&self) -> bool {
        self.accent_sound.is_some() || self.beat_sound.is_some()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => MetronomeConfig::load(path)?,
        None => MetronomeConfig::load_or_default()?,
    };

    match cli.command {
        Commands::Play {
            beat,
            duration,
            stop_policy,
        } => run_play(&config, &beat, duration, stop_policy),
        Commands::Render {
            output,
            beat,
            seconds,
            sample_rate,
            channels,
        } => run_render(&config, &beat, output, seconds, sample_rate, channels),
        Commands::Devices => run_devices(),
    }
}

fn run_play(
    config: &MetronomeConfig,
    beat: &BeatArgs,
    duration: Option<f64>,
    stop_policy: Option<StopPolicy>,
) -> Result<(), Box<dyn Error>> {
    let mut metronome = Metronome::with_default_output(config);
    if let Some(policy) = stop_policy {
        metronome.set_stop_policy(policy);
    }

    if beat.has_custom_sounds() {
        let accent = read_optional(beat.accent_sound.as_deref())?;
        let regular = read_optional(beat.beat_sound.as_deref())?;
        let task = metronome.set_custom_sounds(accent, regular);
        match task.wait_timeout(CUSTOM_SOUND_TIMEOUT) {
            Some(outcome) => {
                report_slot("accent", outcome.accent);
                report_slot("beat", outcome.regular);
            }
            None => warn!("Custom sounds still decoding, starting with the fallback click"),
        }
    }

    let params = beat.to_params(config)?;
    let indicator = BeatIndicator::new(params.accents);
    println!("{} / {} / {} sound", params.tempo, params.accents, params.profile);
    metronome.set_params(params.with_callback(move |index| indicator.show(index)));

    metronome.start()?;

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().read_line(&mut line);
            let _ = tx.send(());
        })?;

    match play_duration(duration) {
        Some(limit) => {
            println!("Playing for {:.1}s (Enter stops early)", limit.as_secs_f64());
            let _ = rx.recv_timeout(limit);
        }
        None => {
            println!("Press Enter to stop");
            let _ = rx.recv();
        }
    }

    metronome.stop();
    println!();
    Ok(())
}

fn run_render(
    config: &MetronomeConfig,
    beat: &BeatArgs,
    output: PathBuf,
    seconds: f64,
    sample_rate: u32,
    channels: u16,
) -> Result<(), Box<dyn Error>> {
    let params = beat.to_params(config)?;

    let mut sounds = SoundBank::new(&config.sounds);
    if beat.has_custom_sounds() {
        let accent = beat.accent_sound.as_deref().map(load_sound).transpose()?;
        let regular = beat.beat_sound.as_deref().map(load_sound).transpose()?;
        sounds.set_custom_sounds(accent, regular);
    }

    let exporter = AudioExporter::new(ExportSettings {
        output_path: output,
        sample_rate,
        channels,
        volume: config.output.volume,
        scheduler: config.scheduler,
    });

    let report = exporter.export(
        &params,
        &sounds,
        seconds,
        Some(Box::new(|progress| {
            print!("\rRendering... {:3.0}%", progress * 100.0);
            let _ = io::stdout().flush();
        })),
    )?;

    println!(
        "\nWrote {} beats ({} frames) to {}",
        report.beats,
        report.frames,
        report.path.display()
    );
    Ok(())
}

fn run_devices() -> Result<(), Box<dyn Error>> {
    let devices = AudioDeviceManager::new().list_output_devices()?;
    if devices.is_empty() {
        println!("No output devices found");
        return Ok(());
    }

    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}

/// Positive, representable durations only; anything else waits for Enter
fn play_duration(seconds: Option<f64>) -> Option<Duration> {
    seconds
        .filter(|&s| s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

fn read_optional(path: Option<&Path>) -> Result<Option<Vec<u8>>, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(Some(bytes))
}

fn report_slot(slot: &str, outcome: SlotOutcome) {
    match outcome {
        SlotOutcome::Loaded => info!("Custom {} sound loaded", slot),
        SlotOutcome::Cleared => {}
        SlotOutcome::Failed => warn!("Custom {} sound could not be decoded, using the digital click", slot),
    }
}

/// Textual beat indicator: one cell per beat of the measure, the current one lit
struct BeatIndicator {
    accents: AccentPattern,
}

impl BeatIndicator {
    fn new(accents: AccentPattern) -> Self {
        Self { accents }
    }

    fn show(&self, beat: u64) {
        let line = match self.accents.beats_per_measure() {
            Some(per_measure) if per_measure <= 16 => {
                let position = beat % per_measure as u64;
                (0..per_measure as u64)
                    .map(|cell| match (cell == position, cell == 0) {
                        (true, true) => "X",
                        (true, false) => "x",
                        (false, _) => ".",
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            _ => format!("beat {}", beat + 1),
        };

        print!("\r{:<40}", line);
        let _ = io::stdout().flush();
    }
}
