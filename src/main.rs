//! Plctester - codec round-trip harness
//!
//! Encodes a deterministic test tone, drops every N-th frame, decodes through
//! the codec's concealment path and writes the result to a WAV file.

use anyhow::{Context, Result};
use plctester::codec::g711::G711Variant;
use plctester::{Codec, G711Codec, HarnessConfig, RoundTripDriver, RunReport};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Command line problems that stop the run before it starts
#[derive(Error, Debug)]
enum ArgError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("Invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },

    #[error("Unknown argument: {0}")]
    Unknown(String),
}

/// What the command line asked for
enum Command {
    Run(Box<Options>),
    Help,
    Version,
}

#[derive(Default)]
struct Options {
    config_path: Option<PathBuf>,
    sample_rate: Option<u32>,
    frame_duration_us: Option<u32>,
    channels: Option<u16>,
    drop_interval: Option<u32>,
    duration: Option<u32>,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    save_config: Option<PathBuf>,
    variant: G711Variant,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plctester=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Command::Version) => {
            println!("plctester {} ({})", plctester::VERSION, plctester::BUILD_DATE);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(2);
        }
    };

    println!("╔════════════════════════════════════════════════════════════╗");
    println!(
        "║         Plctester v{} - codec PLC round-trip test         ║",
        plctester::VERSION
    );
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let config = build_config(&options)?;
    if let Some(path) = &options.save_config {
        config
            .save(path)
            .with_context(|| format!("Failed to save config to {}", path.display()))?;
    }

    let report = run(config, options.variant)?;
    print_summary(&report);

    if let Some(path) = &report.output_path {
        verify_output(path, &report)?;
    }

    if let Some(path) = &options.report {
        report
            .save_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Run report written");
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<Command, ArgError> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let arg = arg.as_str();
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| ArgError::MissingValue(flag.to_string()))
        };

        match arg {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-v" => return Ok(Command::Version),
            "--config" => options.config_path = Some(PathBuf::from(value(arg)?)),
            "--sample-rate" | "-r" => options.sample_rate = Some(parse_number(arg, &value(arg)?)?),
            "--frame-duration" | "-f" => {
                options.frame_duration_us = Some(parse_number(arg, &value(arg)?)?)
            }
            "--channels" | "-c" => options.channels = Some(parse_number(arg, &value(arg)?)?),
            "--drop-interval" | "-n" => {
                options.drop_interval = Some(parse_number(arg, &value(arg)?)?)
            }
            "--duration" | "-d" => options.duration = Some(parse_number(arg, &value(arg)?)?),
            "--output" | "-o" => options.output = Some(PathBuf::from(value(arg)?)),
            "--report" => options.report = Some(PathBuf::from(value(arg)?)),
            "--save-config" => options.save_config = Some(PathBuf::from(value(arg)?)),
            "--codec" => {
                let raw = value(arg)?;
                options.variant = raw.parse().map_err(|_| ArgError::InvalidValue {
                    flag: arg.to_string(),
                    value: raw,
                })?;
            }
            other => return Err(ArgError::Unknown(other.to_string())),
        }
    }

    Ok(Command::Run(Box::new(options)))
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T, ArgError> {
    raw.parse().map_err(|_| ArgError::InvalidValue {
        flag: flag.to_string(),
        value: raw.to_string(),
    })
}

fn build_config(options: &Options) -> Result<HarnessConfig> {
    let mut config = match &options.config_path {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(rate) = options.sample_rate {
        config.sample_rate_hz = rate;
    }
    if let Some(us) = options.frame_duration_us {
        config.frame_duration_us = us;
    }
    if let Some(channels) = options.channels {
        config.channel_count = channels;
    }
    if let Some(interval) = options.drop_interval {
        config.drop_interval = interval;
    }
    if let Some(secs) = options.duration {
        config.audio_duration_seconds = secs;
    }
    if let Some(path) = &options.output {
        config.output_path = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run(config: HarnessConfig, variant: G711Variant) -> Result<RunReport> {
    let codec = G711Codec::new(variant);
    println!(
        "Encoding and decoding {} seconds of audio with {} ({} Hz, {} us frames, drop every {})...",
        config.audio_duration_seconds,
        codec.name(),
        config.sample_rate_hz,
        config.frame_duration_us,
        config.drop_interval,
    );

    let mut driver = RoundTripDriver::new(codec, config)?;
    driver.run().context("Round trip aborted")
}

fn print_summary(report: &RunReport) {
    println!();
    println!("Summary:");
    println!("────────────────────────────────────────");
    println!(
        "  Frame layout:    {} samples / {} octets",
        report.samples_per_frame, report.octets_per_frame
    );
    println!("  Frames encoded:  {}", report.frames_encoded);
    println!(
        "  Frames lost:     {} ({:.1}%)",
        report.frames_lost(),
        report.loss_ratio() * 100.0
    );
    println!(
        "  Samples written: {} ({:.2} s)",
        report.total_samples,
        report.audio_seconds()
    );
    if let Some(path) = &report.output_path {
        println!("  Output:          {}", path.display());
    }
    println!("  Elapsed:         {} ms", report.elapsed_ms());
}

/// Read the output back and check the finalized header against the run
fn verify_output(path: &std::path::Path, report: &RunReport) -> Result<()> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to read back {}", path.display()))?;

    let declared = u64::from(reader.duration());
    if declared != report.total_samples {
        anyhow::bail!(
            "Header declares {} samples but {} were written",
            declared,
            report.total_samples
        );
    }
    info!(declared, "Output header verified");
    Ok(())
}

fn print_help() {
    println!("Usage: plctester [OPTIONS]");
    println!();
    println!("Options:");
    println!("      --config FILE           Load settings from a JSON config file");
    println!("  -r, --sample-rate HZ        Sample rate (default: 48000)");
    println!("  -f, --frame-duration US     Frame duration in microseconds (default: 10000)");
    println!("  -c, --channels N            Channel count (default: 1)");
    println!("  -n, --drop-interval N       Drop every N-th frame, 0 disables (default: 20)");
    println!("  -d, --duration SECS         Seconds of audio to generate (default: 10)");
    println!("  -o, --output FILE           Output WAV file (default: plc_test.wav)");
    println!("      --codec mulaw|alaw      G.711 companding law (default: mulaw)");
    println!("      --report FILE           Write a JSON run report");
    println!("      --save-config FILE      Save the effective settings as JSON");
    println!("  -v, --version               Show version");
    println!("  -h, --help                  Show this help");
    println!();
    println!("Examples:");
    println!("  plctester -r 8000 -f 20000 -n 0 -d 1");
    println!("  plctester --config plc.json --report report.json");
}
