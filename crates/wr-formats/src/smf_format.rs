//! Standard MIDI file (SMF) parser.
//!
//! Decodes format 0/1/2 files into the Score IR: matched note events
//! with tick and second timestamps, program changes with bank-select
//! state, and a merged tempo map.

use std::collections::BTreeMap;

use wr_ir::{NoteEvent, ProgramChange, Score, Track};

use crate::{FormatError, MidiSource};

const HEADER_MAGIC: &[u8; 4] = b"MThd";
const TRACK_MAGIC: &[u8; 4] = b"MTrk";

const META_TRACK_NAME: u8 = 0x03;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;

const CC_BANK_SELECT_MSB: u8 = 0x00;
const CC_BANK_SELECT_LSB: u8 = 0x20;

/// How a second note-on for an already-sounding (channel, key) pair is
/// treated. Raw MIDI leaves this ambiguous; both conventions exist in
/// real corpora.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetriggerPolicy {
    /// Force-close the prior occurrence at the retrigger tick, so one
    /// channel never holds overlapping notes of the same key.
    #[default]
    CutPrevious,
    /// Keep the prior occurrence sounding; note-offs close the most
    /// recently opened occurrence first.
    KeepOldest,
}

/// SMF decoder with a configurable note-matching policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct SmfParser {
    /// Policy for overlapping same-key note-ons
    pub retrigger: RetriggerPolicy,
}

impl SmfParser {
    /// Decoder with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder with an explicit retrigger policy.
    pub fn with_retrigger(retrigger: RetriggerPolicy) -> Self {
        Self { retrigger }
    }
}

impl MidiSource for SmfParser {
    fn parse(&self, data: &[u8]) -> Result<Score, FormatError> {
        parse_smf(data, self.retrigger)
    }
}

/// Parse an SMF byte stream with the default retrigger policy.
pub fn load_smf(data: &[u8]) -> Result<Score, FormatError> {
    parse_smf(data, RetriggerPolicy::default())
}

// ---------------------------------------------------------------------------
// SmfReader — big-endian cursor over a byte slice
// ---------------------------------------------------------------------------

struct SmfReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> SmfReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    /// Cursor over a sub-slice; reported offsets stay file-absolute.
    fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// File-absolute offset of the next byte.
    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn eof(&self) -> FormatError {
        FormatError::UnexpectedEof {
            offset: self.base + self.data.len(),
        }
    }

    fn read_u8(&mut self) -> Result<u8, FormatError> {
        if self.pos >= self.data.len() {
            return Err(self.eof());
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn peek_u8(&self) -> Result<u8, FormatError> {
        if self.pos >= self.data.len() {
            return Err(self.eof());
        }
        Ok(self.data[self.pos])
    }

    fn read_u16_be(&mut self) -> Result<u16, FormatError> {
        if self.pos + 2 > self.data.len() {
            return Err(self.eof());
        }
        let v = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    fn read_u32_be(&mut self) -> Result<u32, FormatError> {
        if self.pos + 4 > self.data.len() {
            return Err(self.eof());
        }
        let v = u32::from_be_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]);
        self.pos += 4;
        Ok(v)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        if self.pos + n > self.data.len() {
            return Err(self.eof());
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), FormatError> {
        if self.pos + n > self.data.len() {
            return Err(self.eof());
        }
        self.pos += n;
        Ok(())
    }

    /// Read a variable-length quantity (up to four bytes).
    fn read_vlq(&mut self) -> Result<u32, FormatError> {
        let mut value: u32 = 0;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FormatError::BadValue {
            offset: self.offset(),
        })
    }

    /// Read one data byte; values past 0x7F are malformed.
    fn read_data_byte(&mut self) -> Result<u8, FormatError> {
        let offset = self.offset();
        let v = self.read_u8()?;
        if v > 0x7F {
            return Err(FormatError::BadValue { offset });
        }
        Ok(v)
    }
}

// ---------------------------------------------------------------------------
// Track chunk parsing
// ---------------------------------------------------------------------------

/// A matched note before track assignment.
#[derive(Clone, Copy)]
struct RawNote {
    channel: u8,
    key: u8,
    velocity: u8,
    start_tick: u64,
    end_tick: u64,
}

/// Everything one MTrk chunk contributes.
#[derive(Default)]
struct ChunkEvents {
    name: Option<String>,
    notes: Vec<RawNote>,
    program_changes: Vec<(u8, ProgramChange)>,
    tempo_changes: Vec<(u64, u32)>,
}

/// One open note-on waiting for its note-off.
#[derive(Clone, Copy)]
struct PendingNote {
    start_tick: u64,
    velocity: u8,
}

fn parse_track_chunk(
    reader: &mut SmfReader<'_>,
    policy: RetriggerPolicy,
) -> Result<ChunkEvents, FormatError> {
    let mut events = ChunkEvents::default();
    // One pending stack per (channel, key).
    let mut pending: Vec<Vec<PendingNote>> = vec![Vec::new(); 16 * 128];
    let mut bank_msb = [0u8; 16];
    let mut tick: u64 = 0;
    let mut running_status: Option<u8> = None;

    while !reader.at_end() {
        tick += u64::from(reader.read_vlq()?);

        let status = if reader.peek_u8()? & 0x80 == 0 {
            // Data byte first: channel message under running status.
            running_status.ok_or(FormatError::BadValue {
                offset: reader.offset(),
            })?
        } else {
            let status = reader.read_u8()?;
            if status < 0xF0 {
                running_status = Some(status);
            } else {
                // System and meta events cancel running status.
                running_status = None;
            }
            status
        };

        let channel = (status & 0x0F) as usize;
        match status & 0xF0 {
            0x80 => {
                let key = reader.read_data_byte()?;
                let _velocity = reader.read_data_byte()?;
                close_note(&mut pending, &mut events.notes, channel, key, tick);
            }
            0x90 => {
                let key = reader.read_data_byte()?;
                let velocity = reader.read_data_byte()?;
                if velocity == 0 {
                    close_note(&mut pending, &mut events.notes, channel, key, tick);
                } else {
                    open_note(&mut pending, &mut events.notes, policy, channel, key, velocity, tick);
                }
            }
            0xA0 => {
                reader.skip(2)?;
            }
            0xB0 => {
                let controller = reader.read_data_byte()?;
                let value = reader.read_data_byte()?;
                match controller {
                    CC_BANK_SELECT_MSB => bank_msb[channel] = value,
                    CC_BANK_SELECT_LSB => {}
                    _ => {}
                }
            }
            0xC0 => {
                let program = reader.read_data_byte()?;
                events.program_changes.push((
                    channel as u8,
                    ProgramChange {
                        tick,
                        bank: u16::from(bank_msb[channel]),
                        program,
                    },
                ));
            }
            0xD0 => {
                reader.skip(1)?;
            }
            0xE0 => {
                reader.skip(2)?;
            }
            0xF0 => match status {
                0xFF => {
                    let meta_type = reader.read_u8()?;
                    let len = reader.read_vlq()? as usize;
                    let body = reader.read_bytes(len)?;
                    match meta_type {
                        META_TEMPO if len == 3 => {
                            let micros = u32::from(body[0]) << 16
                                | u32::from(body[1]) << 8
                                | u32::from(body[2]);
                            events.tempo_changes.push((tick, micros));
                        }
                        META_TRACK_NAME if events.name.is_none() => {
                            let text = String::from_utf8_lossy(body);
                            let trimmed = text.trim_end_matches('\0').trim();
                            if !trimmed.is_empty() {
                                events.name = Some(trimmed.to_string());
                            }
                        }
                        META_END_OF_TRACK => break,
                        _ => {}
                    }
                }
                0xF0 | 0xF7 => {
                    let len = reader.read_vlq()? as usize;
                    reader.skip(len)?;
                }
                _ => {
                    return Err(FormatError::BadValue {
                        offset: reader.offset().saturating_sub(1),
                    })
                }
            },
            _ => unreachable!("status byte has high bit set"),
        }
    }

    // Spec requires an end-of-track meta, but unterminated chunks in the
    // wild still get their open notes closed at the final tick.
    for slot in 0..pending.len() {
        while let Some(open) = pending[slot].pop() {
            events.notes.push(RawNote {
                channel: (slot / 128) as u8,
                key: (slot % 128) as u8,
                velocity: open.velocity,
                start_tick: open.start_tick,
                end_tick: tick,
            });
        }
    }

    Ok(events)
}

fn open_note(
    pending: &mut [Vec<PendingNote>],
    notes: &mut Vec<RawNote>,
    policy: RetriggerPolicy,
    channel: usize,
    key: u8,
    velocity: u8,
    tick: u64,
) {
    let slot = channel * 128 + key as usize;
    if policy == RetriggerPolicy::CutPrevious {
        if let Some(open) = pending[slot].pop() {
            notes.push(RawNote {
                channel: channel as u8,
                key,
                velocity: open.velocity,
                start_tick: open.start_tick,
                end_tick: tick,
            });
        }
    }
    pending[slot].push(PendingNote {
        start_tick: tick,
        velocity,
    });
}

fn close_note(
    pending: &mut [Vec<PendingNote>],
    notes: &mut Vec<RawNote>,
    channel: usize,
    key: u8,
    tick: u64,
) {
    let slot = channel * 128 + key as usize;
    // A stray note-off with nothing open is skipped.
    if let Some(open) = pending[slot].pop() {
        notes.push(RawNote {
            channel: channel as u8,
            key,
            velocity: open.velocity,
            start_tick: open.start_tick,
            end_tick: tick,
        });
    }
}

// ---------------------------------------------------------------------------
// File assembly
// ---------------------------------------------------------------------------

fn parse_smf(data: &[u8], policy: RetriggerPolicy) -> Result<Score, FormatError> {
    let mut reader = SmfReader::new(data);

    let magic = reader.read_bytes(4)?;
    if magic != HEADER_MAGIC {
        return Err(FormatError::InvalidHeader { offset: 0 });
    }
    let length_offset = reader.offset();
    let header_len = reader.read_u32_be()? as usize;
    if header_len < 6 {
        return Err(FormatError::LengthMismatch {
            offset: length_offset,
            declared: header_len,
        });
    }
    let format_offset = reader.offset();
    let format = reader.read_u16_be()?;
    if format > 2 {
        return Err(FormatError::UnsupportedVersion {
            offset: format_offset,
        });
    }
    let _declared_tracks = reader.read_u16_be()?;
    let division_offset = reader.offset();
    let division = reader.read_u16_be()?;
    if division & 0x8000 != 0 {
        // SMPTE time division is a different clock model entirely.
        return Err(FormatError::UnsupportedVersion {
            offset: division_offset,
        });
    }
    if division == 0 {
        return Err(FormatError::BadValue {
            offset: division_offset,
        });
    }
    // Tolerate headers longer than the six known bytes.
    reader.skip(header_len - 6)?;

    let mut chunks: Vec<ChunkEvents> = Vec::new();
    while !reader.at_end() {
        let magic = reader.read_bytes(4)?;
        let length_offset = reader.offset();
        let chunk_len = reader.read_u32_be()? as usize;
        let body_start = reader.offset();
        if body_start + chunk_len > data.len() {
            return Err(FormatError::LengthMismatch {
                offset: length_offset,
                declared: chunk_len,
            });
        }
        if magic == TRACK_MAGIC {
            let body = &data[body_start..body_start + chunk_len];
            let mut chunk_reader = SmfReader::with_base(body, body_start);
            chunks.push(parse_track_chunk(&mut chunk_reader, policy)?);
        }
        // Unknown chunk types are skipped whole.
        reader.skip(chunk_len)?;
    }

    Ok(assemble_score(division, chunks))
}

fn assemble_score(division: u16, chunks: Vec<ChunkEvents>) -> Score {
    let mut score = Score::new(division);

    // Tempo changes merge across chunks before any seconds are computed.
    for chunk in &chunks {
        for &(tick, micros) in &chunk.tempo_changes {
            score.tempo.set(tick, micros);
        }
    }

    let mut next_id: u16 = 0;
    for chunk in chunks {
        if score.name.is_empty() {
            if let Some(name) = &chunk.name {
                let mut chars = name.chars();
                while let Some(ch) = chars.next() {
                    if score.name.try_push(ch).is_err() {
                        break;
                    }
                }
            }
        }

        // Split one chunk into per-channel tracks.
        let mut by_channel: BTreeMap<u8, Track> = BTreeMap::new();
        for note in chunk.notes {
            let track = by_channel
                .entry(note.channel)
                .or_insert_with(|| Track::new(0, note.channel));
            track.notes.push(NoteEvent {
                track: 0,
                channel: note.channel,
                key: note.key,
                velocity: note.velocity,
                start_tick: note.start_tick,
                end_tick: note.end_tick,
                start_seconds: 0.0,
                end_seconds: 0.0,
            });
        }
        for (channel, change) in chunk.program_changes {
            if let Some(track) = by_channel.get_mut(&channel) {
                track.program_changes.push(change);
            }
        }

        for (_, mut track) in by_channel {
            track.id = next_id;
            match &chunk.name {
                Some(name) => track.set_name(name),
                None => track.set_name(&format!("Track {next_id}")),
            }
            track.notes.sort_by_key(|n| (n.start_tick, n.key));
            for note in &mut track.notes {
                note.track = next_id;
                note.start_seconds = score.tempo.seconds_at(note.start_tick, division);
                note.end_seconds = score.tempo.seconds_at(note.end_tick, division);
            }
            score.tracks.push(track);
            next_id += 1;
        }
    }

    score
}
