//! WAV encoding for rendered PCM audio.

use std::io::Write;

use wr_ir::AudioBuffer;

/// Write a rendered buffer as a 16-bit PCM WAV stream.
pub fn write_wav(w: &mut impl Write, buffer: &AudioBuffer) -> std::io::Result<()> {
    let num_channels = buffer.channels();
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = buffer.frames() as u32 * u32::from(block_align);

    write_riff_header(w, data_size)?;
    write_fmt_chunk(
        w,
        num_channels,
        buffer.sample_rate(),
        block_align,
        bits_per_sample,
    )?;
    write_data_chunk(w, buffer.samples(), data_size)
}

pub fn buffer_to_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let mut buf = Vec::new();
    write_wav(&mut buf, buffer).expect("Vec<u8> write cannot fail");
    buf
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, samples: &[f32], data_size: u32) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        w.write_all(&scaled.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u16_le(data: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([data[offset], data[offset + 1]])
    }

    fn read_u32_le(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])
    }

    #[test]
    fn header_describes_the_buffer() {
        let buffer = AudioBuffer::from_interleaved(44_100, 2, vec![0.0; 8]);
        let wav = buffer_to_wav(&buffer);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(read_u32_le(&wav, 4), 36 + 16);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(read_u16_le(&wav, 20), 1); // PCM
        assert_eq!(read_u16_le(&wav, 22), 2);
        assert_eq!(read_u32_le(&wav, 24), 44_100);
        assert_eq!(read_u32_le(&wav, 28), 44_100 * 4); // byte rate
        assert_eq!(read_u16_le(&wav, 32), 4); // block align
        assert_eq!(read_u16_le(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(read_u32_le(&wav, 40), 16);
        assert_eq!(wav.len(), 44 + 16);
    }

    #[test]
    fn samples_scale_to_16_bit() {
        let buffer = AudioBuffer::from_interleaved(48_000, 1, vec![0.0, 0.5, -0.5, 1.0]);
        let wav = buffer_to_wav(&buffer);
        let pcm: Vec<i16> = wav[44..]
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(pcm, vec![0, 16383, -16383, 32767]);
    }

    #[test]
    fn out_of_range_samples_clip() {
        let buffer = AudioBuffer::from_interleaved(44_100, 1, vec![2.0, -2.0]);
        let wav = buffer_to_wav(&buffer);
        let pcm: Vec<i16> = wav[44..]
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(pcm, vec![32767, -32767]);
    }

    #[test]
    fn mono_buffers_write_one_channel() {
        let buffer = AudioBuffer::from_interleaved(22_050, 1, vec![0.0; 5]);
        let wav = buffer_to_wav(&buffer);
        assert_eq!(read_u16_le(&wav, 22), 1);
        assert_eq!(read_u16_le(&wav, 32), 2); // block align
        assert_eq!(read_u32_le(&wav, 40), 10);
    }
}
