//! Cross-cutting decoder behavior: byte-offset reporting and the
//! MidiSource seam, exercised through the public API only.

use wr_formats::{load_sf2, load_smf, FormatError, MidiSource, RetriggerPolicy, SmfParser};

/// Header-only SMF with one empty track chunk.
fn empty_smf() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(b"MThd");
    out.extend(&6u32.to_be_bytes());
    out.extend(&0u16.to_be_bytes());
    out.extend(&1u16.to_be_bytes());
    out.extend(&480u16.to_be_bytes());
    let track = [0x00, 0xFF, 0x2F, 0x00];
    out.extend(b"MTrk");
    out.extend(&(track.len() as u32).to_be_bytes());
    out.extend(&track);
    out
}

#[test]
fn every_error_reports_a_byte_offset_inside_the_input() {
    let good = empty_smf();
    // Truncate at every length and make sure failures stay in bounds.
    for cut in 0..good.len() {
        match load_smf(&good[..cut]) {
            Ok(_) => {}
            Err(err) => assert!(
                err.offset() <= good.len(),
                "offset {} out of range for cut {}",
                err.offset(),
                cut
            ),
        }
    }
}

#[test]
fn empty_inputs_fail_cleanly() {
    assert!(matches!(
        load_smf(&[]),
        Err(FormatError::UnexpectedEof { offset: 0 })
    ));
    assert!(matches!(
        load_sf2(&[]),
        Err(FormatError::UnexpectedEof { .. })
    ));
}

#[test]
fn garbage_is_rejected_at_the_header() {
    let junk = vec![0xABu8; 256];
    assert!(matches!(
        load_smf(&junk),
        Err(FormatError::InvalidHeader { offset: 0 })
    ));
    assert!(matches!(
        load_sf2(&junk),
        Err(FormatError::InvalidHeader { offset: 0 })
    ));
}

#[test]
fn errors_display_their_offset() {
    let err = load_smf(&[]).unwrap_err();
    assert!(err.to_string().contains("byte 0"));
}

#[test]
fn parser_works_through_the_midi_source_trait() {
    let parsers: [Box<dyn MidiSource>; 2] = [
        Box::new(SmfParser::new()),
        Box::new(SmfParser::with_retrigger(RetriggerPolicy::KeepOldest)),
    ];
    for parser in &parsers {
        let score = parser.parse(&empty_smf()).unwrap();
        assert_eq!(score.ticks_per_quarter, 480);
        assert!(score.is_empty());
    }
}
