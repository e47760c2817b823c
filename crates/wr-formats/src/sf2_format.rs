//! SoundFont 2 (SF2) patch bank loader.
//!
//! Walks the RIFF `sfbk` form, pulls 16-bit PCM out of the sdta list,
//! and flattens the pdta preset/instrument/zone hierarchy into the flat
//! Zone records the synthesis engine consumes. Generator values keep
//! their SF2 units until realization: timecents become seconds, pan
//! per-mille becomes a -1..1 position, centibel attenuation becomes a
//! linear gain.

use wr_ir::{Adsr, Diagnostic, Patch, PatchBank, Sample, SampleKey, Zone};

use crate::FormatError;

// Generator opcodes, numbered as the file stores them.
const GEN_PAN: u16 = 17;
const GEN_ATTACK_VOL_ENV: u16 = 34;
const GEN_DECAY_VOL_ENV: u16 = 36;
const GEN_SUSTAIN_VOL_ENV: u16 = 37;
const GEN_RELEASE_VOL_ENV: u16 = 38;
const GEN_INSTRUMENT: u16 = 41;
const GEN_KEY_RANGE: u16 = 43;
const GEN_VEL_RANGE: u16 = 44;
const GEN_INITIAL_ATTENUATION: u16 = 48;
const GEN_COARSE_TUNE: u16 = 51;
const GEN_FINE_TUNE: u16 = 52;
const GEN_SAMPLE_ID: u16 = 53;
const GEN_SAMPLE_MODES: u16 = 54;
const GEN_ROOT_KEY: u16 = 58;

const PHDR_RECORD: usize = 38;
const BAG_RECORD: usize = 4;
const MOD_RECORD: usize = 10;
const GEN_RECORD: usize = 4;
const INST_RECORD: usize = 22;
const SHDR_RECORD: usize = 46;

/// Load a SoundFont into a patch bank.
///
/// Structural damage is fatal; survivable oddities (ROM samples, 24-bit
/// extension data) come back as diagnostics next to a bank that still
/// plays everything it can.
pub fn load_sf2(data: &[u8]) -> Result<(PatchBank, Vec<Diagnostic>), FormatError> {
    let mut reader = Sf2Reader::new(data);

    if reader.read_bytes(4)? != b"RIFF" {
        return Err(FormatError::InvalidHeader { offset: 0 });
    }
    let size_offset = reader.offset();
    let riff_len = reader.read_u32_le()? as usize;
    let form_offset = reader.offset();
    if reader.read_bytes(4)? != b"sfbk" {
        return Err(FormatError::InvalidHeader {
            offset: form_offset,
        });
    }
    if 8 + riff_len > data.len() {
        return Err(FormatError::LengthMismatch {
            offset: size_offset,
            declared: riff_len,
        });
    }

    let mut diagnostics = Vec::new();
    let mut bank_name: Option<String> = None;
    let mut has_info = false;
    let mut wave: Vec<i16> = Vec::new();
    let mut pdta: Option<Pdta> = None;

    while !reader.at_end() {
        let fourcc = reader.read_bytes(4)?;
        let size_offset = reader.offset();
        let size = reader.read_u32_le()? as usize;
        let body_start = reader.offset();
        if body_start + size > data.len() {
            return Err(FormatError::LengthMismatch {
                offset: size_offset,
                declared: size,
            });
        }
        if fourcc == b"LIST" && size >= 4 {
            let list_type = &data[body_start..body_start + 4];
            let body = &data[body_start + 4..body_start + size];
            let mut sub = Sf2Reader::with_base(body, body_start + 4);
            match list_type {
                b"INFO" => {
                    bank_name = parse_info(&mut sub)?;
                    has_info = true;
                }
                b"sdta" => wave = parse_sdta(&mut sub, &mut diagnostics)?,
                b"pdta" => pdta = Some(parse_pdta(&mut sub)?),
                _ => {}
            }
        }
        reader.skip(size)?;
        // RIFF pads odd-sized chunks to word boundaries.
        if size % 2 != 0 && !reader.at_end() {
            reader.skip(1)?;
        }
    }

    if !has_info {
        return Err(FormatError::UnexpectedEof { offset: data.len() });
    }
    let pdta = pdta.ok_or(FormatError::UnexpectedEof { offset: data.len() })?;

    let mut bank = PatchBank::new();
    if let Some(name) = &bank_name {
        bank.set_name(name);
    }
    let wave_len = wave.len();
    bank.set_wave(wave);

    let sample_keys = build_samples(&pdta.sample_headers, wave_len, &mut bank, &mut diagnostics)?;
    build_patches(&pdta, &sample_keys, &mut bank)?;

    Ok((bank, diagnostics))
}

// ---------------------------------------------------------------------------
// Sf2Reader — little-endian cursor over a byte slice
// ---------------------------------------------------------------------------

struct Sf2Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Sf2Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    /// Cursor over a sub-slice; reported offsets stay file-absolute.
    fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

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

    fn read_u16_le(&mut self) -> Result<u16, FormatError> {
        if self.pos + 2 > self.data.len() {
            return Err(self.eof());
        }
        let v = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    fn read_u32_le(&mut self) -> Result<u32, FormatError> {
        if self.pos + 4 > self.data.len() {
            return Err(self.eof());
        }
        let v = u32::from_le_bytes([
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

    /// Fixed-width NUL-padded name field.
    fn read_fixed_name(&mut self, width: usize) -> Result<String, FormatError> {
        let raw = self.read_bytes(width)?;
        Ok(trim_name(raw))
    }
}

fn trim_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// List parsing
// ---------------------------------------------------------------------------

/// INFO list: validates the format version, captures the bank name.
fn parse_info(reader: &mut Sf2Reader<'_>) -> Result<Option<String>, FormatError> {
    let mut name = None;
    let mut has_version = false;
    while !reader.at_end() {
        let id = reader.read_bytes(4)?;
        let size_offset = reader.offset();
        let size = reader.read_u32_le()? as usize;
        let value_offset = reader.offset();
        let body = reader.read_bytes(size)?;
        match id {
            b"ifil" => {
                if size < 4 {
                    return Err(FormatError::LengthMismatch {
                        offset: size_offset,
                        declared: size,
                    });
                }
                let major = u16::from_le_bytes([body[0], body[1]]);
                if major != 2 {
                    return Err(FormatError::UnsupportedVersion {
                        offset: value_offset,
                    });
                }
                has_version = true;
            }
            b"INAM" => name = Some(trim_name(body)),
            _ => {}
        }
        if size % 2 != 0 && !reader.at_end() {
            reader.skip(1)?;
        }
    }
    if !has_version {
        return Err(FormatError::InvalidHeader {
            offset: reader.base,
        });
    }
    Ok(name)
}

/// sdta list: 16-bit PCM from smpl; the sm24 extension is not decoded.
fn parse_sdta(
    reader: &mut Sf2Reader<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<i16>, FormatError> {
    let mut wave = Vec::new();
    while !reader.at_end() {
        let id = reader.read_bytes(4)?;
        let size = reader.read_u32_le()? as usize;
        let body = reader.read_bytes(size)?;
        match id {
            b"smpl" => {
                wave = body
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
            }
            b"sm24" => diagnostics.push(Diagnostic::UnsupportedFeature {
                subject: "24-bit sample data (sm24 chunk)".into(),
            }),
            _ => {}
        }
        if size % 2 != 0 && !reader.at_end() {
            reader.skip(1)?;
        }
    }
    Ok(wave)
}

struct RawPreset {
    name: String,
    program: u16,
    bank: u16,
    bag_index: u16,
    offset: usize,
}

struct RawInstrument {
    bag_index: u16,
}

struct RawBag {
    gen_index: u16,
}

struct RawGen {
    oper: u16,
    amount: u16,
}

struct RawSampleHeader {
    name: String,
    start: u32,
    end: u32,
    loop_start: u32,
    loop_end: u32,
    sample_rate: u32,
    original_key: u8,
    correction: i8,
    sample_type: u16,
    offset: usize,
}

#[derive(Default)]
struct Pdta {
    presets: Vec<RawPreset>,
    pbags: Vec<RawBag>,
    pgens: Vec<RawGen>,
    instruments: Vec<RawInstrument>,
    ibags: Vec<RawBag>,
    igens: Vec<RawGen>,
    sample_headers: Vec<RawSampleHeader>,
    offset: usize,
}

/// pdta list: the nine hydra sub-chunks, each an array of fixed-size
/// records ending in a terminal record.
fn parse_pdta(reader: &mut Sf2Reader<'_>) -> Result<Pdta, FormatError> {
    let mut pdta = Pdta {
        offset: reader.base,
        ..Pdta::default()
    };
    while !reader.at_end() {
        let id: [u8; 4] = reader.read_bytes(4)?.try_into().unwrap_or([0; 4]);
        let size_offset = reader.offset();
        let size = reader.read_u32_le()? as usize;
        let body_offset = reader.offset();
        let body = reader.read_bytes(size)?;
        let record_size = match &id {
            b"phdr" => PHDR_RECORD,
            b"pbag" | b"ibag" => BAG_RECORD,
            b"pmod" | b"imod" => MOD_RECORD,
            b"pgen" | b"igen" => GEN_RECORD,
            b"inst" => INST_RECORD,
            b"shdr" => SHDR_RECORD,
            _ => {
                if size % 2 != 0 && !reader.at_end() {
                    reader.skip(1)?;
                }
                continue;
            }
        };
        if size % record_size != 0 {
            return Err(FormatError::LengthMismatch {
                offset: size_offset,
                declared: size,
            });
        }
        let mut sub = Sf2Reader::with_base(body, body_offset);
        match &id {
            b"phdr" => {
                while !sub.at_end() {
                    let offset = sub.offset();
                    let name = sub.read_fixed_name(20)?;
                    let program = sub.read_u16_le()?;
                    let bank = sub.read_u16_le()?;
                    let bag_index = sub.read_u16_le()?;
                    sub.skip(12)?; // library, genre, morphology
                    pdta.presets.push(RawPreset {
                        name,
                        program,
                        bank,
                        bag_index,
                        offset,
                    });
                }
            }
            b"pbag" | b"ibag" => {
                let out = if id == *b"pbag" {
                    &mut pdta.pbags
                } else {
                    &mut pdta.ibags
                };
                while !sub.at_end() {
                    let gen_index = sub.read_u16_le()?;
                    sub.skip(2)?; // modulator index
                    out.push(RawBag { gen_index });
                }
            }
            b"pgen" | b"igen" => {
                let out = if id == *b"pgen" {
                    &mut pdta.pgens
                } else {
                    &mut pdta.igens
                };
                while !sub.at_end() {
                    let oper = sub.read_u16_le()?;
                    let amount = sub.read_u16_le()?;
                    out.push(RawGen { oper, amount });
                }
            }
            b"inst" => {
                while !sub.at_end() {
                    let _name = sub.read_fixed_name(20)?;
                    let bag_index = sub.read_u16_le()?;
                    pdta.instruments.push(RawInstrument { bag_index });
                }
            }
            b"shdr" => {
                while !sub.at_end() {
                    let offset = sub.offset();
                    let name = sub.read_fixed_name(20)?;
                    let start = sub.read_u32_le()?;
                    let end = sub.read_u32_le()?;
                    let loop_start = sub.read_u32_le()?;
                    let loop_end = sub.read_u32_le()?;
                    let sample_rate = sub.read_u32_le()?;
                    let original_key = sub.read_u8()?;
                    let correction = sub.read_u8()? as i8;
                    sub.skip(2)?; // sample link
                    let sample_type = sub.read_u16_le()?;
                    pdta.sample_headers.push(RawSampleHeader {
                        name,
                        start,
                        end,
                        loop_start,
                        loop_end,
                        sample_rate,
                        original_key,
                        correction,
                        sample_type,
                        offset,
                    });
                }
            }
            _ => {} // pmod/imod records carry modulators, which are not used
        }
        if size % 2 != 0 && !reader.at_end() {
            reader.skip(1)?;
        }
    }
    Ok(pdta)
}

// ---------------------------------------------------------------------------
// Sample realization
// ---------------------------------------------------------------------------

fn build_samples(
    headers: &[RawSampleHeader],
    wave_len: usize,
    bank: &mut PatchBank,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<SampleKey>, FormatError> {
    // The final record is the EOS terminal.
    let count = headers.len().saturating_sub(1);
    let mut keys = Vec::with_capacity(count);
    for header in &headers[..count] {
        if header.end < header.start || header.end as usize > wave_len {
            return Err(FormatError::BadValue {
                offset: header.offset,
            });
        }
        if header.sample_rate == 0 {
            return Err(FormatError::BadValue {
                offset: header.offset,
            });
        }
        let mut sample = Sample::new(&header.name);
        sample.start = header.start;
        sample.end = header.end;
        // Loop points go relative to the sample start; a loop that falls
        // outside the sample is dropped rather than rejected.
        let loop_ok = header.loop_start >= header.start
            && header.loop_end <= header.end
            && header.loop_start < header.loop_end;
        if loop_ok {
            sample.loop_start = header.loop_start - header.start;
            sample.loop_end = header.loop_end - header.start;
        } else {
            sample.loop_start = 0;
            sample.loop_end = 0;
        }
        sample.sample_rate = header.sample_rate;
        sample.root_key = if header.original_key <= 127 {
            header.original_key
        } else {
            60
        };
        sample.fine_tune_cents = header.correction;
        // Mono and either half of a stereo pair render directly; ROM and
        // linked samples have no usable data here.
        sample.playable = matches!(header.sample_type, 1 | 2 | 4);
        if !sample.playable {
            diagnostics.push(Diagnostic::UnsupportedFeature {
                subject: format!(
                    "sample type {:#06x} for '{}'",
                    header.sample_type, header.name
                ),
            });
        }
        keys.push(bank.add_sample(sample));
    }
    Ok(keys)
}

// ---------------------------------------------------------------------------
// Zone flattening
// ---------------------------------------------------------------------------

/// Accumulated generator state for one zone, still in SF2 units.
#[derive(Clone, Copy)]
struct ZoneGens {
    key_lo: u8,
    key_hi: u8,
    vel_lo: u8,
    vel_hi: u8,
    attack_tc: i32,
    decay_tc: i32,
    sustain_cb: i32,
    release_tc: i32,
    attenuation_cb: i32,
    pan_permille: i32,
    coarse_semitones: i32,
    fine_cents: i32,
    sample_modes: u16,
    root_override: i32,
    sample_id: i32,
    instrument: i32,
}

impl ZoneGens {
    /// Instrument-level defaults: shortest envelope stages, full ranges.
    fn instrument_defaults() -> Self {
        Self {
            key_lo: 0,
            key_hi: 127,
            vel_lo: 0,
            vel_hi: 127,
            attack_tc: -12000,
            decay_tc: -12000,
            sustain_cb: 0,
            release_tc: -12000,
            attenuation_cb: 0,
            pan_permille: 0,
            coarse_semitones: 0,
            fine_cents: 0,
            sample_modes: 0,
            root_override: -1,
            sample_id: -1,
            instrument: -1,
        }
    }

    /// Preset-level values are offsets added onto the instrument's, so
    /// every additive field starts at zero.
    fn preset_defaults() -> Self {
        Self {
            attack_tc: 0,
            decay_tc: 0,
            release_tc: 0,
            ..Self::instrument_defaults()
        }
    }

    fn apply(&mut self, oper: u16, amount: u16) {
        let value = i32::from(amount as i16);
        match oper {
            GEN_KEY_RANGE => {
                self.key_lo = (amount & 0xFF) as u8;
                self.key_hi = (amount >> 8) as u8;
            }
            GEN_VEL_RANGE => {
                self.vel_lo = (amount & 0xFF) as u8;
                self.vel_hi = (amount >> 8) as u8;
            }
            GEN_ATTACK_VOL_ENV => self.attack_tc = value,
            GEN_DECAY_VOL_ENV => self.decay_tc = value,
            GEN_SUSTAIN_VOL_ENV => self.sustain_cb = value,
            GEN_RELEASE_VOL_ENV => self.release_tc = value,
            GEN_INITIAL_ATTENUATION => self.attenuation_cb = value,
            GEN_PAN => self.pan_permille = value,
            GEN_COARSE_TUNE => self.coarse_semitones = value,
            GEN_FINE_TUNE => self.fine_cents = value,
            GEN_SAMPLE_MODES => self.sample_modes = amount,
            GEN_ROOT_KEY => self.root_override = value,
            GEN_SAMPLE_ID => self.sample_id = i32::from(amount),
            GEN_INSTRUMENT => self.instrument = i32::from(amount),
            _ => {}
        }
    }

    fn has_terminal(&self, for_instrument: bool) -> bool {
        if for_instrument {
            self.sample_id >= 0
        } else {
            self.instrument >= 0
        }
    }
}

/// Expand one preset or instrument into its zone list. A leading zone
/// without a terminal generator is the global zone; it seeds every zone
/// after it instead of standing alone.
fn zone_list(
    bags: &[RawBag],
    gens: &[RawGen],
    bag_lo: usize,
    bag_hi: usize,
    defaults: ZoneGens,
    for_instrument: bool,
    err_offset: usize,
) -> Result<Vec<ZoneGens>, FormatError> {
    if bag_lo > bag_hi || bag_hi + 1 > bags.len() {
        return Err(FormatError::BadValue { offset: err_offset });
    }
    let mut zones = Vec::new();
    let mut base = defaults;
    for (index, b) in (bag_lo..bag_hi).enumerate() {
        let gen_lo = bags[b].gen_index as usize;
        let gen_hi = bags[b + 1].gen_index as usize;
        if gen_lo > gen_hi || gen_hi > gens.len() {
            return Err(FormatError::BadValue { offset: err_offset });
        }
        let mut zone = base;
        for gen in &gens[gen_lo..gen_hi] {
            zone.apply(gen.oper, gen.amount);
        }
        if zone.has_terminal(for_instrument) {
            zones.push(zone);
        } else if index == 0 {
            base = zone;
        }
        // A terminal-less zone anywhere else is dead weight and dropped.
    }
    Ok(zones)
}

/// Merge a preset zone with an instrument zone: ranges intersect (an
/// empty intersection kills the pair), value generators add.
fn combine(preset: &ZoneGens, inst: &ZoneGens) -> Option<ZoneGens> {
    let key_lo = preset.key_lo.max(inst.key_lo);
    let key_hi = preset.key_hi.min(inst.key_hi);
    if key_lo > key_hi {
        return None;
    }
    let vel_lo = preset.vel_lo.max(inst.vel_lo);
    let vel_hi = preset.vel_hi.min(inst.vel_hi);
    if vel_lo > vel_hi {
        return None;
    }
    Some(ZoneGens {
        key_lo,
        key_hi,
        vel_lo,
        vel_hi,
        attack_tc: inst.attack_tc + preset.attack_tc,
        decay_tc: inst.decay_tc + preset.decay_tc,
        sustain_cb: inst.sustain_cb + preset.sustain_cb,
        release_tc: inst.release_tc + preset.release_tc,
        attenuation_cb: inst.attenuation_cb + preset.attenuation_cb,
        pan_permille: inst.pan_permille + preset.pan_permille,
        coarse_semitones: inst.coarse_semitones + preset.coarse_semitones,
        fine_cents: inst.fine_cents + preset.fine_cents,
        sample_modes: inst.sample_modes,
        root_override: inst.root_override,
        sample_id: inst.sample_id,
        instrument: -1,
    })
}

fn timecents_to_seconds(tc: i32) -> f32 {
    (tc as f32 / 1200.0).exp2().clamp(0.001, 100.0)
}

fn centibels_to_linear(cb: i32) -> f32 {
    let cb = cb.clamp(0, 1440) as f32;
    10f32.powf(-cb / 200.0)
}

fn realize_zone(
    gens: &ZoneGens,
    keys: &[SampleKey],
    bank: &PatchBank,
    err_offset: usize,
) -> Result<Option<Zone>, FormatError> {
    if gens.sample_id < 0 {
        return Ok(None);
    }
    let Some(&key) = keys.get(gens.sample_id as usize) else {
        return Err(FormatError::BadValue { offset: err_offset });
    };
    let Some(sample) = bank.sample(key) else {
        return Ok(None);
    };
    // An overriding root key folds into the tuning offset so playback
    // math only ever sees the sample's own root.
    let root_adjust = if (0..=127).contains(&gens.root_override) {
        (i32::from(sample.root_key) - gens.root_override) * 100
    } else {
        0
    };
    Ok(Some(Zone {
        key_lo: gens.key_lo,
        key_hi: gens.key_hi,
        vel_lo: gens.vel_lo,
        vel_hi: gens.vel_hi,
        sample: key,
        envelope: Adsr {
            attack_s: timecents_to_seconds(gens.attack_tc),
            decay_s: timecents_to_seconds(gens.decay_tc),
            sustain_level: centibels_to_linear(gens.sustain_cb),
            release_s: timecents_to_seconds(gens.release_tc),
        },
        pan: gens.pan_permille.clamp(-500, 500) as f32 / 500.0,
        gain: centibels_to_linear(gens.attenuation_cb),
        tune_cents: gens.coarse_semitones * 100 + gens.fine_cents + root_adjust,
        looped: gens.sample_modes & 1 == 1 && sample.has_loop(),
    }))
}

fn build_patches(
    pdta: &Pdta,
    sample_keys: &[SampleKey],
    bank: &mut PatchBank,
) -> Result<(), FormatError> {
    let inst_count = pdta.instruments.len().saturating_sub(1);
    let mut inst_zones: Vec<Vec<ZoneGens>> = Vec::with_capacity(inst_count);
    for i in 0..inst_count {
        inst_zones.push(zone_list(
            &pdta.ibags,
            &pdta.igens,
            pdta.instruments[i].bag_index as usize,
            pdta.instruments[i + 1].bag_index as usize,
            ZoneGens::instrument_defaults(),
            true,
            pdta.offset,
        )?);
    }

    // The final phdr record is the EOP terminal.
    let preset_count = pdta.presets.len().saturating_sub(1);
    for p in 0..preset_count {
        let preset = &pdta.presets[p];
        if preset.program > 127 {
            return Err(FormatError::BadValue {
                offset: preset.offset,
            });
        }
        let mut patch = Patch::new(preset.bank, preset.program as u8, &preset.name);
        let preset_zones = zone_list(
            &pdta.pbags,
            &pdta.pgens,
            preset.bag_index as usize,
            pdta.presets[p + 1].bag_index as usize,
            ZoneGens::preset_defaults(),
            false,
            preset.offset,
        )?;
        for pz in &preset_zones {
            let Some(izones) = inst_zones.get(pz.instrument as usize) else {
                return Err(FormatError::BadValue {
                    offset: preset.offset,
                });
            };
            for iz in izones {
                if let Some(merged) = combine(pz, iz) {
                    if let Some(zone) = realize_zone(&merged, sample_keys, bank, preset.offset)? {
                        patch.zones.push(zone);
                    }
                }
            }
        }
        // Duplicate addresses keep the first occurrence.
        bank.insert_patch(patch);
    }
    Ok(())
}
