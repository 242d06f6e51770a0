//! `deltawav`: turn a captured audio-delta SSE stream into a WAV file.

mod settings;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use deltawav_core::{PipelineOutcome, Session, SseEventReader};
use tracing::info;

use crate::settings::{default_settings_path, load_settings};

const USAGE: &str = "Usage: deltawav [--input <capture.sse>] --output <file.wav> \
[--lenient] [--settings <settings.json>]

Reads a text/event-stream capture (stdin when --input is omitted), joins every
audio-delta fragment up to the terminal event, and writes a mono 16-bit WAV.";

#[derive(Debug, PartialEq)]
struct Args {
    input: Option<PathBuf>,
    output: PathBuf,
    lenient: bool,
    settings: Option<PathBuf>,
}

/// Parse command-line arguments. `Ok(None)` means help was requested.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Args>> {
    let mut input = None;
    let mut output = None;
    let mut lenient = false;
    let mut settings = None;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--input" | "-i" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --input");
                };
                input = Some(PathBuf::from(v));
            }
            "--output" | "-o" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --output");
                };
                output = Some(PathBuf::from(v));
            }
            "--settings" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --settings");
                };
                settings = Some(PathBuf::from(v));
            }
            "--lenient" => lenient = true,
            "--help" | "-h" => return Ok(None),
            other => bail!("unknown argument: {other}"),
        }
    }

    let Some(output) = output else {
        bail!("--output is required\n\n{USAGE}");
    };
    Ok(Some(Args {
        input,
        output,
        lenient,
        settings,
    }))
}

fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("deltawav=info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("deltawav failed: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    if args.lenient {
        settings.decode_policy = "lenient".into();
    }
    info!(
        settings_path = ?settings_path,
        decode_policy = %settings.decode_policy,
        audio_delta_event = %settings.audio_delta_event,
        terminal_event = %settings.terminal_event,
        "settings loaded"
    );

    let session = Session::new(settings.pipeline_config());
    let terminal = session.config().assembler.terminal_event.clone();

    let outcome = match &args.input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let mut source = SseEventReader::new(BufReader::new(file)).with_terminal_name(terminal);
            session.run_to_path(&mut source, &args.output)
        }
        None => {
            let mut source =
                SseEventReader::new(BufReader::new(io::stdin())).with_terminal_name(terminal);
            session.run_to_path(&mut source, &args.output)
        }
    }
    .with_context(|| format!("producing {}", args.output.display()))?;

    eprintln!("{}", summary(&args.output, &outcome));
    Ok(())
}

fn summary(output: &std::path::Path, outcome: &PipelineOutcome) -> String {
    let mut line = format!(
        "wrote {} ({} bytes, {:.2}s)",
        output.display(),
        outcome.pcm_bytes,
        outcome.duration_secs
    );
    if !outcome.report.is_lossless() {
        line.push_str(&format!(
            "; skipped {} malformed fragment(s) at events {:?}",
            outcome.report.skipped_events.len(),
            outcome.report.skipped_events
        ));
    }
    line
}
