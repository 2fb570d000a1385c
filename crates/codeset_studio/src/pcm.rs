//! 16-bit PCM conversion and base64 framing for live audio.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::error::{StudioError, StudioResult};

/// Sample rate of captured microphone audio sent upstream.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of audio returned by the live and narration endpoints.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Samples per captured frame.
pub const CAPTURE_FRAME_SIZE: usize = 4096;

/// MIME type attached to every outbound audio chunk.
pub fn input_mime_type() -> String {
    format!("audio/pcm;rate={}", INPUT_SAMPLE_RATE)
}

/// Convert one float sample in [-1, 1] to signed 16-bit, clamping out-of-range input.
pub fn f32_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Convert one signed 16-bit sample to float.
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Encode float samples as little-endian 16-bit PCM.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| f32_to_i16(*s).to_le_bytes())
        .collect()
}

/// Decode little-endian 16-bit PCM into float samples.
pub fn decode_pcm16(bytes: &[u8]) -> StudioResult<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(StudioError::malformed(format!(
            "PCM payload has odd length {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect())
}

/// Encode a captured frame for the wire.
pub fn encode_base64_pcm16(samples: &[f32]) -> String {
    BASE64_STANDARD.encode(encode_pcm16(samples))
}

/// Decode a base64 audio payload into float samples.
pub fn decode_base64_pcm16(data: &str) -> StudioResult<Vec<f32>> {
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .map_err(|e| StudioError::malformed(format!("audio payload is not base64: {}", e)))?;
    decode_pcm16(&bytes)
}

/// Playback duration of `sample_count` mono samples, in seconds.
pub fn duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}

/// Sample rate declared in a `audio/pcm;rate=N` MIME type.
pub fn rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse().ok())
}

/// Wrap mono 16-bit PCM in a RIFF/WAVE container.
pub fn wav_bytes(pcm_data: &[u8], sample_rate: u32) -> Vec<u8> {
    let block_align = 2u16;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = pcm_data.len() as u32;
    let mut out = Vec::with_capacity(44 + pcm_data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm_data);
    out
}
