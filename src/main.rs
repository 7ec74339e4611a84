//! Talkbox - real-time LPC vocoder
//!
//! Entry point for the offline renderer and the live host.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use talkbox::audio::wav::{self, RenderJob};
use talkbox::{AppConfig, TalkBoxParams};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Talkbox - imposes a voice's spectral envelope onto a synth carrier
#[derive(Parser)]
#[command(name = "talkbox")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vocode a modulator WAV with a carrier WAV into a stereo float WAV
    Render {
        /// Modulator (voice) WAV, first channel is used
        #[arg(short, long, default_value = "mod.wav")]
        modulator: PathBuf,

        /// Carrier (synth) WAV, first channel is used
        #[arg(short = 'C', long, default_value = "car.wav")]
        carrier: PathBuf,

        /// Output WAV (32-bit float, stereo)
        #[arg(short, long, default_value = "out.wav")]
        output: PathBuf,

        /// Frames per engine call
        #[arg(short, long, default_value_t = talkbox::DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// List available audio devices
    #[cfg(feature = "live")]
    List,

    /// Run the talkbox on an audio device (input 1 = voice, input 2 = synth)
    #[cfg(feature = "live")]
    Live {
        /// Device name (default: config file, then system default)
        #[arg(short, long)]
        device: Option<String>,

        /// Sample rate in Hz
        #[arg(short = 'r', long)]
        sample_rate: Option<u32>,

        /// Frames per engine call
        #[arg(short, long)]
        block_size: Option<usize>,

        #[command(flatten)]
        params: ParamArgs,

        /// Write the effective settings back to the config file
        #[arg(long)]
        save_config: bool,
    },
}

/// Parameter overrides; unset values come from the config file
#[derive(Args, Clone, Copy)]
struct ParamArgs {
    /// Vocoded level (0.0 - 1.0)
    #[arg(long)]
    wet: Option<f32>,

    /// Dry voice level (0.0 - 1.0)
    #[arg(long)]
    dry: Option<f32>,

    /// LPC resolution (0.0 - 1.0)
    #[arg(long)]
    quality: Option<f32>,
}

impl ParamArgs {
    fn apply(self, mut params: TalkBoxParams) -> TalkBoxParams {
        if let Some(wet) = self.wet {
            params.wet = wet;
        }
        if let Some(dry) = self.dry {
            params.dry = dry;
        }
        if let Some(quality) = self.quality {
            params.quality = quality;
        }
        params
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("talkbox=info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Talkbox v{} (built {})", talkbox::VERSION, talkbox::BUILD_DATE);
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);

    match cli.command {
        Commands::Render {
            modulator,
            carrier,
            output,
            block_size,
            params,
        } => {
            // The offline renderer defaults to the full effect unless the
            // user passes a config file explicitly
            let base = if cli.config.is_some() {
                AppConfig::load(&config_path).params
            } else {
                TalkBoxParams::full_wet()
            };
            render(RenderJob {
                modulator,
                carrier,
                output,
                block_size,
                params: params.apply(base),
            })
        }
        #[cfg(feature = "live")]
        Commands::List => live::list_devices(),
        #[cfg(feature = "live")]
        Commands::Live {
            device,
            sample_rate,
            block_size,
            params,
            save_config,
        } => {
            let mut config = AppConfig::load(&config_path);
            if device.is_some() {
                config.device = device;
            }
            if let Some(rate) = sample_rate {
                config.sample_rate = rate;
            }
            if let Some(size) = block_size {
                config.block_size = size;
            }
            config.params = params.apply(config.params);
            let config = config.sanitized();

            if save_config {
                config.save(&config_path)?;
            }
            live::run(&config)
        }
    }
}

fn render(job: RenderJob) -> Result<()> {
    info!(
        modulator = %job.modulator.display(),
        carrier = %job.carrier.display(),
        wet = job.params.wet,
        dry = job.params.dry,
        quality = job.params.quality,
        "Rendering"
    );

    let report = wav::render_files(&job).context("Render failed")?;

    println!(
        "Wrote {} ({} frames @ {} Hz, block {})",
        job.output.display(),
        report.frames,
        report.sample_rate,
        report.block_size
    );
    println!(
        "  peak {:.4}  rms {:.4}  dominant {:.1} Hz",
        report.summary.peak, report.summary.rms, report.summary.dominant_hz
    );
    if report.summary.is_silent() {
        println!("  (output is silent)");
    }
    Ok(())
}

#[cfg(feature = "live")]
mod live {
    use anyhow::Result;
    use std::io::BufRead;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;
    use talkbox::audio::engine::AudioEngine;
    use talkbox::{AppConfig, TalkBoxParams};
    use tracing::{error, info, warn};

    pub fn list_devices() -> Result<()> {
        println!("Scanning for audio devices...");
        println!();

        match AudioEngine::list_devices() {
            Ok(devices) => {
                if devices.is_empty() {
                    println!("No audio devices found.");
                } else {
                    println!("Found {} device(s):", devices.len());
                    println!();
                    for (i, device) in devices.iter().enumerate() {
                        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
                        println!("  {}. {}{}", i + 1, device.name, default_marker);
                        println!(
                            "     Channels: {} in, {} out",
                            device.input_channels, device.output_channels
                        );
                        if !device.sample_rates.is_empty() {
                            println!("     Sample rates: {:?}", device.sample_rates);
                        }
                        println!();
                    }
                }
            }
            Err(e) => {
                error!("Failed to list devices: {}", e);
                println!("Error: {}", e);
            }
        }

        Ok(())
    }

    /// Parse `wet 0.7`, `dry 0.2` or `quality 0.5` into updated params
    fn parse_command(line: &str, current: TalkBoxParams) -> Option<TalkBoxParams> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        let value: f32 = parts.next()?.parse().ok()?;
        let mut params = current;
        match name {
            "wet" => params.wet = value,
            "dry" => params.dry = value,
            "quality" | "q" => params.quality = value,
            _ => return None,
        }
        Some(params)
    }

    pub fn run(config: &AppConfig) -> Result<()> {
        let mut engine = AudioEngine::new();
        engine.set_sample_rate(config.sample_rate);
        engine.set_block_size(config.block_size);
        engine.set_params(config.params);
        engine.open(config.device.as_deref())?;
        engine.start()?;

        println!(
            "Talkbox running on {} @ {} Hz, block {}",
            engine.device_name().unwrap_or("unknown"),
            engine.sample_rate(),
            engine.block_size()
        );
        println!("Type `wet 0.8`, `dry 0.1` or `quality 0.5` to adjust. Ctrl+C to stop.");
        println!();

        // Set up Ctrl+C handler
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .ok();

        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut iteration = 0u32;
        while running.load(Ordering::SeqCst) {
            while let Ok(line) = rx.try_recv() {
                match parse_command(&line, engine.params()) {
                    Some(params) => {
                        engine.set_params(params);
                        info!(
                            wet = params.wet,
                            dry = params.dry,
                            quality = params.quality,
                            "Parameters updated"
                        );
                    }
                    None => warn!("Unrecognised command: {}", line.trim()),
                }
            }

            iteration += 1;
            if iteration % 50 == 0 {
                let (input, output) = engine.frame_counts();
                info!(
                    "Audio I/O: {} frames in, {} frames out, {} underruns",
                    input,
                    output,
                    engine.underruns()
                );
            }

            std::thread::sleep(Duration::from_millis(100));
        }

        println!();
        println!("Stopping...");
        engine.stop()?;
        println!("Done.");

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_command() {
            let base = TalkBoxParams::default();
            assert_eq!(parse_command("wet 0.8", base).map(|p| p.wet), Some(0.8));
            assert_eq!(parse_command("q 0.25", base).map(|p| p.quality), Some(0.25));
            assert!(parse_command("pan 0.5", base).is_none());
            assert!(parse_command("dry", base).is_none());
        }
    }
}
