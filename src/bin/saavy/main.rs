//! saavy - offline transport for the scheduling core
//!
//! Plays a short demo score through two polyphonic synths against the
//! in-process audio engine, advancing the clock in fixed blocks the way an
//! audio callback would, then reports what was scheduled.
//!
//! Run with: cargo run -- --bpm 120 --seconds 8

mod app;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use saavy_sound::EngineConfig;

use app::Session;

#[derive(Parser)]
#[command(name = "saavy")]
#[command(about = "Play a demo score against the in-process audio engine", long_about = None)]
struct Cli {
    /// Tempo in beats per minute
    #[arg(short, long, default_value = "110")]
    bpm: f64,

    /// How long to run, in audio-clock seconds
    #[arg(short, long, default_value = "8.0")]
    seconds: f64,

    /// Voices per synth
    #[arg(short, long, default_value = "4")]
    voices: usize,

    /// Frames per rendered block
    #[arg(long, default_value = "256")]
    block: usize,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: f32,

    /// Loop the score instead of stopping after the last part
    #[arg(short, long)]
    looping: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = EngineConfig {
        sample_rate: cli.sample_rate,
        default_bpm: cli.bpm,
        default_voices: cli.voices,
        ..EngineConfig::default()
    };

    let mut session = Session::new(config, cli.looping).wrap_err("failed to build session")?;
    let report = session
        .run(cli.seconds, cli.block)
        .wrap_err("transport failed")?;

    println!("=== Saavy ===");
    println!("BPM: {}", cli.bpm);
    println!("Block: {} frames @ {} Hz", cli.block, cli.sample_rate);
    println!();
    println!("  Ran for:        {:.3} s", report.seconds);
    println!("  Notes played:   {}", report.notes);
    println!("  Steps:          {}", report.steps);
    println!("  Evictions:      {}", report.evictions);
    println!("  Peak voices:    {}", report.peak_voices);
    println!("  Failed notes:   {}", report.failed);
    match report.ended_at {
        Some(t) => println!("  Score ended at: {t:.3} s"),
        None => println!("  Score still playing"),
    }

    session.dispose();
    Ok(())
}
