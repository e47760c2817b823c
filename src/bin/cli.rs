//! waveroll CLI — MIDI inspection and WAV export.
//!
//! Usage:
//!   wr-cli song.mid bank.sf2
//!   wr-cli song.mid bank.sf2 --wav output.wav [--rate 48000]

use std::{env, fs};

use wr_master::{buffer_to_wav, Controller, Diagnostic, RenderConfig};

fn main() {
    let args: Vec<String> = env::args().collect();
    let (Some(midi_path), Some(font_path)) = (args.get(1), args.get(2)) else {
        eprintln!("Usage: wr-cli <file.mid> <font.sf2> [--wav output.wav] [--rate <hz>]");
        std::process::exit(1);
    };

    let wav_path = args
        .iter()
        .position(|a| a == "--wav")
        .and_then(|i| args.get(i + 1))
        .cloned();
    let sample_rate = args
        .iter()
        .position(|a| a == "--rate")
        .and_then(|i| args.get(i + 1))
        .map(|raw| {
            raw.parse::<u32>().unwrap_or_else(|_| {
                eprintln!("Invalid sample rate: {}", raw);
                std::process::exit(1);
            })
        })
        .unwrap_or(44_100);

    let midi_data = read_file(midi_path);
    let font_data = read_file(font_path);

    let mut ctrl = Controller::new();
    ctrl.load_midi(&midi_data).unwrap_or_else(|e| {
        eprintln!("Failed to parse MIDI: {}", e);
        std::process::exit(1);
    });
    ctrl.load_soundfont(&font_data).unwrap_or_else(|e| {
        eprintln!("Failed to parse soundfont: {}", e);
        std::process::exit(1);
    });

    let score = ctrl.score().expect("score was just loaded");
    println!("Score:    {}", score.name);
    println!("Division: {} ticks/quarter", score.ticks_per_quarter);
    println!("Tempi:    {}", score.tempo.changes().len());
    println!("Duration: {:.2} s", score.duration_seconds());
    for track in &score.tracks {
        println!(
            "  [{:2}] ch {:2} {:4} notes  {}",
            track.id,
            track.channel,
            track.notes.len(),
            track.name
        );
    }

    let bank = ctrl.patch_bank().expect("bank was just loaded");
    println!();
    println!("Bank:     {}", bank.name);
    println!("Patches:  {}", bank.patch_count());
    println!("Samples:  {}", bank.sample_count());

    if let Some(path) = wav_path {
        render_to_wav(&mut ctrl, &path, sample_rate);
    }

    report_diagnostics(ctrl.diagnostics());
}

fn read_file(path: &str) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path, e);
        std::process::exit(1);
    })
}

fn render_to_wav(ctrl: &mut Controller, path: &str, sample_rate: u32) {
    println!();
    println!("Rendering to {} at {} Hz...", path, sample_rate);
    let config = RenderConfig {
        sample_rate,
        ..RenderConfig::default()
    };

    let buffer = ctrl.render(&config).unwrap_or_else(|e| {
        eprintln!("Render failed: {}", e);
        std::process::exit(1);
    });
    println!(
        "Rendered {:.2} s, peak amplitude {:.3}",
        buffer.duration_seconds(),
        buffer.peak()
    );

    let wav = buffer_to_wav(&buffer);

    fs::write(path, &wav).unwrap_or_else(|e| {
        eprintln!("Failed to write {}: {}", path, e);
        std::process::exit(1);
    });
    println!("Done.");
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let steals = diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::VoiceStolen { .. }))
        .count();
    println!();
    println!("{} warning(s), {} voice steal(s):", diagnostics.len(), steals);
    for diagnostic in diagnostics {
        println!("  {}", diagnostic);
    }
}
