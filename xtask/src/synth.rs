//! xtask synth: write a synthetic AC-link capture.
//!
//! Every frame carries PCM left/right on slots 3 and 4 and a register read
//! on slot 1. The codec answers each read in the following frame with a
//! status address and data on SDATA_IN. The result decodes cleanly with
//! `cargo run -p xtask -- decode` using the default probe order.

use std::path::Path;

use ac97::consts::SLOT_COUNT;
use ac97::testing::Waveform;
use ac97::ChannelMap;
use anyhow::{Context, Result};
use colored::Colorize;

/// Entry point called from main.rs
pub fn run(output: &Path, frames: usize, lead: usize) -> Result<()> {
    let bytes = capture(frames, lead);
    std::fs::write(output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{}",
        format!("✓ Wrote {} frames ({} samples) to {}", frames, bytes.len(), output.display()).green()
    );
    Ok(())
}

/// Tag with READY set and `valid` (slot 1 = MSB) as the VALID field.
fn tag(valid: u32) -> u32 {
    0x8000 | ((valid & 0xFFF) << 3)
}

fn register(frame: usize) -> u32 {
    // AC'97 registers are word aligned: 0x00..0x7E.
    ((frame * 2) & 0x7E) as u32
}

/// Packed capture with the default probe order.
pub(crate) fn capture(frames: usize, lead: usize) -> Vec<u8> {
    let mut wave = Waveform::new();
    wave.idle(lead);
    for n in 0..frames {
        let mut output = [0u32; SLOT_COUNT];
        let mut input = [0u32; SLOT_COUNT];

        // Read command on slot 1, PCM on slots 3 and 4.
        output[0] = tag(0b1011_0000_0000);
        output[1] = (1 << 19) | (register(n) << 12);
        let sample = ((n * 0x0800) & 0xFFFFF) as u32;
        output[3] = sample;
        output[4] = 0xFFFFF - sample;

        // Status for the previous frame's read.
        if n > 0 {
            input[0] = tag(0b1100_0000_0000);
            input[1] = register(n - 1) << 12;
            input[2] = (0x1000 | register(n - 1)) << 4;
        } else {
            input[0] = tag(0);
        }
        wave.frame(&output, &input);
    }
    let channels = ChannelMap::default().resolve().expect("default probe map is valid");
    wave.pack(&channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac97::testing::RecordingSink;
    use ac97::{Ac97Decoder, AnnotationClass, DataLine, LogicCapture, SlotIndex};

    #[test]
    fn synthetic_capture_decodes_cleanly() {
        let bytes = capture(4, 3);
        let channels = ChannelMap::default().resolve().unwrap();
        let mut sink = RecordingSink::new();
        let summary = Ac97Decoder::default()
            .decode(&mut LogicCapture::new(&bytes, channels), &mut sink)
            .unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.complete_frames, 4);
        assert_eq!(summary.reserved_violations, 0);

        let status = AnnotationClass::SlotField(DataLine::Input, SlotIndex::DATA);
        assert_eq!(sink.texts(status), ["DATA: 1000", "RSV: 0", "DATA: 1002", "RSV: 0", "DATA: 1004", "RSV: 0"]);
    }

    #[test]
    fn run_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.bin");
        run(&path, 2, 0).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, capture(2, 0));
    }
}
