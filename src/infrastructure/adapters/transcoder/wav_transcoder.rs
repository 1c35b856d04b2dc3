//! WAV Transcoder - PCM 封装与 WAV 解析
//!
//! 支持：
//! - 原始 16 位小端单声道 PCM → 标准 44 字节头 WAV
//! - WAV 头解析和信息提取（时长、采样率等）

use crate::application::ports::{AudioInfo, AudioTranscoderPort, TranscodeError};
use crate::domain::voice::SampleRate;

/// 标准 WAV 头长度
pub const WAV_HEADER_LEN: usize = 44;

const PCM_CHANNELS: u16 = 1;
const PCM_BITS_PER_SAMPLE: u16 = 16;

/// fmt chunk
#[derive(Debug, Clone, Copy)]
struct FmtChunk {
    audio_format: u16,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// 解析后的 WAV 头
#[derive(Debug, Clone, Copy)]
struct WavHeader {
    fmt: FmtChunk,
    data_size: usize,
}

/// WAV 转码器
#[derive(Debug, Clone, Copy, Default)]
pub struct WavTranscoder;

impl WavTranscoder {
    pub fn new() -> Self {
        Self
    }

    /// 解析 WAV 文件头
    fn parse_wav_header(&self, data: &[u8]) -> Result<WavHeader, TranscodeError> {
        if data.len() < WAV_HEADER_LEN {
            return Err(TranscodeError::InvalidInput(
                "WAV data too short".to_string(),
            ));
        }

        // 验证 RIFF 头
        if &data[0..4] != b"RIFF" {
            return Err(TranscodeError::InvalidInput(
                "Invalid WAV: missing RIFF header".to_string(),
            ));
        }

        // 验证 WAVE 标识
        if &data[8..12] != b"WAVE" {
            return Err(TranscodeError::InvalidInput(
                "Invalid WAV: missing WAVE identifier".to_string(),
            ));
        }

        let mut pos = 12;
        let mut fmt_chunk: Option<FmtChunk> = None;
        let mut data_size: Option<usize> = None;

        while pos + 8 <= data.len() {
            let chunk_id = &data[pos..pos + 4];
            let chunk_size =
                u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                    as usize;
            let body_start = pos + 8;

            match chunk_id {
                b"fmt " => {
                    if chunk_size < 16 || body_start + 16 > data.len() {
                        return Err(TranscodeError::InvalidInput(
                            "Invalid fmt chunk size".to_string(),
                        ));
                    }
                    let fmt = &data[body_start..body_start + 16];
                    fmt_chunk = Some(FmtChunk {
                        audio_format: u16::from_le_bytes([fmt[0], fmt[1]]),
                        num_channels: u16::from_le_bytes([fmt[2], fmt[3]]),
                        sample_rate: u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]),
                        bits_per_sample: u16::from_le_bytes([fmt[14], fmt[15]]),
                    });
                }
                b"data" => {
                    // 流式响应可能把长度写成占位值，按实际剩余字节截断
                    data_size = Some(chunk_size.min(data.len() - body_start));
                    break;
                }
                _ => {}
            }

            pos = body_start.saturating_add(chunk_size);
            // 对齐到偶数字节
            if chunk_size % 2 != 0 {
                pos = pos.saturating_add(1);
            }
        }

        let fmt = fmt_chunk.ok_or_else(|| {
            TranscodeError::InvalidInput("Invalid WAV: missing fmt chunk".to_string())
        })?;
        let data_size = data_size.ok_or_else(|| {
            TranscodeError::InvalidInput("Invalid WAV: missing data chunk".to_string())
        })?;

        if fmt.audio_format != 1 {
            return Err(TranscodeError::UnsupportedFormat(format!(
                "WAV audio format {} (only PCM is supported)",
                fmt.audio_format
            )));
        }

        Ok(WavHeader { fmt, data_size })
    }
}

impl AudioTranscoderPort for WavTranscoder {
    fn wrap_pcm(&self, pcm: &[u8], sample_rate: SampleRate) -> Vec<u8> {
        let sample_rate = sample_rate.hz();
        let block_align = PCM_CHANNELS * (PCM_BITS_PER_SAMPLE / 8);
        let byte_rate = sample_rate * block_align as u32;
        let data_size = pcm.len() as u32;
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&file_size.to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&PCM_CHANNELS.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&PCM_BITS_PER_SAMPLE.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_size.to_le_bytes());
        wav.extend_from_slice(pcm);

        tracing::debug!(
            sample_rate,
            data_size,
            "Wrapped PCM in WAV container"
        );
        wav
    }

    fn get_audio_info(&self, wav_data: &[u8]) -> Result<AudioInfo, TranscodeError> {
        let header = self.parse_wav_header(wav_data)?;

        // 计算时长
        let bytes_per_sample = header.fmt.bits_per_sample as usize / 8;
        let samples_per_channel = if bytes_per_sample > 0 && header.fmt.num_channels > 0 {
            header.data_size / bytes_per_sample / header.fmt.num_channels as usize
        } else {
            0
        };

        let duration_ms = if header.fmt.sample_rate > 0 {
            (samples_per_channel as u64 * 1000) / header.fmt.sample_rate as u64
        } else {
            0
        };

        Ok(AudioInfo {
            duration_ms,
            sample_rate: header.fmt.sample_rate,
            channels: header.fmt.num_channels,
            bits_per_sample: header.fmt.bits_per_sample,
            data_size: header.data_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    /// 1 秒 16kHz 正弦波 PCM
    fn sine_pcm(sample_rate: u32) -> Vec<u8> {
        (0..sample_rate)
            .flat_map(|i| {
                let t = i as f32 / sample_rate as f32;
                let sample = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16;
                sample.to_le_bytes()
            })
            .collect()
    }

    #[test]
    fn test_wrap_pcm_header_layout() {
        let pcm = sine_pcm(16000);
        let wav = WavTranscoder::new().wrap_pcm(&pcm, SampleRate::new(16000));

        assert_eq!(wav.len(), WAV_HEADER_LEN + pcm.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        let u32_at = |i: usize| u32::from_le_bytes([wav[i], wav[i + 1], wav[i + 2], wav[i + 3]]);
        assert_eq!(u32_at(4) as usize, 36 + pcm.len());
        assert_eq!(u32_at(24), 16000);
        assert_eq!(u32_at(28), 32000);
        assert_eq!(u16::from_le_bytes([wav[32], wav[33]]), 2);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
        assert_eq!(u32_at(40) as usize, pcm.len());
    }

    #[test]
    fn test_audio_info() {
        let transcoder = WavTranscoder::new();
        let wav = transcoder.wrap_pcm(&sine_pcm(16000), SampleRate::new(16000));

        let info = transcoder.get_audio_info(&wav).unwrap();
        assert_eq!(info.duration_ms, 1000);
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.data_size, 32000);
    }

    #[test]
    fn test_empty_pcm_still_has_header() {
        let transcoder = WavTranscoder::new();
        let wav = transcoder.wrap_pcm(&[], SampleRate::new(8000));
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(transcoder.get_audio_info(&wav).unwrap().duration_ms, 0);
    }

    #[test]
    fn test_rejects_non_wav() {
        let transcoder = WavTranscoder::new();
        assert!(transcoder.get_audio_info(b"ID3").is_err());
        let mut bogus = vec![0u8; 64];
        bogus[0..4].copy_from_slice(b"OggS");
        assert!(matches!(
            transcoder.get_audio_info(&bogus),
            Err(TranscodeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_wrapped_pcm_is_decodable() {
        let wav = WavTranscoder::new().wrap_pcm(&sine_pcm(16000), SampleRate::new(16000));

        let mss = MediaSourceStream::new(Box::new(Cursor::new(wav)), Default::default());
        let mut hint = Hint::new();
        hint.with_extension("wav");
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .unwrap();

        let track = probed.format.default_track().unwrap();
        assert_eq!(track.codec_params.sample_rate, Some(16000));
        assert_eq!(track.codec_params.channels.map(|c| c.count()), Some(1));
        assert_eq!(track.codec_params.n_frames, Some(16000));
    }
}
