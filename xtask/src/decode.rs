//! xtask decode: run the AC'97 decoder over a raw logic capture.
//!
//! The capture is the sigrok "binary" input layout with unit size 1: one
//! byte per sample, bit n holding probe n. Probes are bound to lines with
//! `--out/--in/--clk/--sync/--reset`; defaults follow probe order 0..3.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ac97::{
    Ac97Decoder, Annotation, AnnotationRow, ChannelMap, DecodeSummary, DecoderConfig,
    LogicCapture, Metadata, PartialFramePolicy, Signal,
};
use anyhow::{Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Capture file (one byte per sample)
    pub file: PathBuf,
    /// Probe carrying SDATA_OUT
    #[arg(long = "out", default_value_t = 0)]
    pub data_out: u8,
    /// Probe carrying SDATA_IN
    #[arg(long = "in", default_value_t = 1)]
    pub data_in: u8,
    /// Probe carrying BIT_CLK
    #[arg(long, default_value_t = 2)]
    pub clk: u8,
    /// Probe carrying SYNC
    #[arg(long, default_value_t = 3)]
    pub sync: u8,
    /// Probe carrying RESET# (optional, not decoded)
    #[arg(long)]
    pub reset: Option<u8>,
    /// Capture sample rate in Hz; adds timestamps to text output
    #[arg(long)]
    pub samplerate: Option<u64>,
    /// Print one JSON object per annotation instead of text
    #[arg(long)]
    pub json: bool,
    /// Report frames cut short by an early SYNC or end of capture
    #[arg(long)]
    pub warn_partial: bool,
    /// Omit per-bit annotations
    #[arg(long)]
    pub no_bits: bool,
}

impl DecodeArgs {
    pub fn channel_map(&self) -> ChannelMap {
        ChannelMap::unassigned()
            .with(Signal::DataOut, Some(self.data_out))
            .with(Signal::DataIn, Some(self.data_in))
            .with(Signal::BitClk, Some(self.clk))
            .with(Signal::Sync, Some(self.sync))
            .with(Signal::Reset, self.reset)
    }

    pub fn config(&self) -> DecoderConfig {
        DecoderConfig {
            partial_frame: if self.warn_partial {
                PartialFramePolicy::Warn
            } else {
                PartialFramePolicy::Drop
            },
        }
    }
}

/// Entry point called from main.rs
pub fn run(args: &DecodeArgs) -> Result<()> {
    let samples = read_capture(&args.file)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = decode_into(args, &samples, &mut out)?;
    out.flush().context("Failed to flush output")?;
    drop(out);

    if !args.json {
        print_summary(&summary);
    }
    Ok(())
}

fn read_capture(path: &Path) -> Result<Vec<u8>> {
    let samples =
        std::fs::read(path).with_context(|| format!("Failed to read capture {}", path.display()))?;
    if samples.is_empty() {
        anyhow::bail!("Capture {} is empty", path.display());
    }
    tracing::info!(path = %path.display(), samples = samples.len(), "capture loaded");
    Ok(samples)
}

/// Decode `samples` and write annotations to `out`.
pub(crate) fn decode_into<W: Write>(args: &DecodeArgs, samples: &[u8], out: &mut W) -> Result<DecodeSummary> {
    let channels = args
        .channel_map()
        .resolve()
        .map_err(|e| anyhow::anyhow!("Invalid probe assignment: {e}"))?;
    let mut sampler = LogicCapture::new(samples, channels);

    let mut decoder = Ac97Decoder::new(args.config());
    if let Some(rate) = args.samplerate {
        decoder.metadata(Metadata::SampleRate(rate));
    }

    let mut failure: Option<std::io::Error> = None;
    let mut sink = |ann: Annotation| {
        if failure.is_some() || (args.no_bits && is_bit_row(&ann)) {
            return;
        }
        let written = if args.json {
            serde_json::to_string(&ann)
                .map_err(std::io::Error::from)
                .and_then(|line| writeln!(out, "{line}"))
        } else {
            writeln!(out, "{}", format_text(&ann, display_rate(args)))
        };
        if let Err(e) = written {
            failure = Some(e);
        }
    };
    let summary = decoder
        .decode(&mut sampler, &mut sink)
        .map_err(|e| anyhow::anyhow!("Decoder refused to run: {e}"))?;

    if let Some(e) = failure {
        return Err(e).context("Failed to write annotations");
    }
    if args.json {
        writeln!(out, "{}", serde_json::json!({ "summary": summary })).context("Failed to write summary")?;
    }
    Ok(summary)
}

fn display_rate(args: &DecodeArgs) -> Option<u64> {
    args.samplerate.filter(|r| *r > 0)
}

fn is_bit_row(ann: &Annotation) -> bool {
    matches!(ann.class.row(), AnnotationRow::BitsOut | AnnotationRow::BitsIn)
}

fn format_text(ann: &Annotation, samplerate: Option<u64>) -> String {
    let position = match samplerate {
        #[allow(clippy::cast_precision_loss)] // display only
        Some(rate) => format!("{:>12.3}us", ann.start as f64 * 1e6 / rate as f64),
        None => format!("{:>10}-{:<10}", ann.start, ann.end),
    };
    format!("{position} {:<18} {}", ann.class.id(), paint(ann))
}

fn paint(ann: &Annotation) -> ColoredString {
    let text = ann.primary();
    match ann.class.row() {
        AnnotationRow::Errors => text.red().bold(),
        AnnotationRow::Warnings => text.yellow(),
        AnnotationRow::SlotsOut | AnnotationRow::SlotsIn => text.cyan(),
        AnnotationRow::BitsOut | AnnotationRow::BitsIn => text.dimmed(),
        AnnotationRow::RawOut | AnnotationRow::RawIn => text.normal(),
    }
}

fn print_summary(summary: &DecodeSummary) {
    eprintln!();
    eprintln!(
        "{}",
        format!(
            "✓ {} cycles, {} frames ({} complete, {} partial), {} slots",
            summary.cycles,
            summary.frames,
            summary.complete_frames,
            summary.partial_frames,
            summary.slots
        )
        .green()
    );
    if summary.reserved_violations > 0 {
        eprintln!(
            "{}",
            format!("⚠ {} reserved-bit violations", summary.reserved_violations).yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: DecodeArgs,
    }

    fn parse(argv: &[&str]) -> DecodeArgs {
        Harness::parse_from(std::iter::once("decode").chain(argv.iter().copied())).args
    }

    #[test]
    fn default_probes_match_channel_map_default() {
        let args = parse(&["capture.bin"]);
        assert_eq!(args.channel_map(), ChannelMap::default());
        assert_eq!(args.config().partial_frame, PartialFramePolicy::Drop);
    }

    #[test]
    fn probe_flags_rebind_lines() {
        let args = parse(&["capture.bin", "--clk", "7", "--sync", "6", "--reset", "5", "--warn-partial"]);
        let map = args.channel_map();
        assert_eq!(map.probe(Signal::BitClk), Some(7));
        assert_eq!(map.probe(Signal::Reset), Some(5));
        assert_eq!(args.config().partial_frame, PartialFramePolicy::Warn);
    }

    #[test]
    fn duplicate_probes_are_rejected() {
        let args = parse(&["capture.bin", "--sync", "2"]);
        let err = decode_into(&args, &[0, 4], &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("Invalid probe assignment"));
    }

    #[test]
    fn json_output_ends_with_summary() {
        let args = parse(&["capture.bin", "--json"]);
        let samples = crate::synth::capture(1, 2);
        let mut out = Vec::new();
        let summary = decode_into(&args, &samples, &mut out).unwrap();
        assert_eq!(summary.complete_frames, 1);
        let text = String::from_utf8(out).unwrap();
        let last = text.lines().last().unwrap();
        let value: serde_json::Value = serde_json::from_str(last).unwrap();
        assert_eq!(value["summary"]["frames"], 1);
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert!(first["texts"].is_array());
    }

    #[test]
    fn no_bits_hides_bit_rows() {
        let args = parse(&["capture.bin", "--no-bits"]);
        let samples = crate::synth::capture(1, 0);
        let mut out = Vec::new();
        decode_into(&args, &samples, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("bits-out"));
        assert!(text.contains("slot-out-tag"));
    }
}
