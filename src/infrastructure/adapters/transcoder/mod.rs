//! Transcoder Adapter - WAV 封装与解析

mod wav_transcoder;

pub use wav_transcoder::{WavTranscoder, WAV_HEADER_LEN};
