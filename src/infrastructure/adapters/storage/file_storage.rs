//! File Storage - 文件系统音频存储实现
//!
//! 实现 AudioStoragePort trait
//!
//! 文件名: `<prefix>_<voice>_<YYYYmmdd_HHMMSS>.<ext>`，同名时追加 `_1`、`_2` ...

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;

use crate::application::ports::{AudioStorageError, AudioStoragePort};
use crate::domain::voice::OutputFormat;
use crate::domain::ProviderKind;

/// 同一秒内最多尝试的后缀数
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// 用户默认下载目录，找不到时退回 ~/Downloads，再退回当前目录
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 文件名中的音色部分：`-` 以及其他非字母数字字符替换为 `_`
fn sanitize_voice(voice_id: &str) -> String {
    voice_id
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// 不含冲突后缀的文件名主干
pub fn file_stem(provider: ProviderKind, voice_id: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}",
        provider.file_prefix(),
        sanitize_voice(voice_id),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// 文件系统音频存储
pub struct AudioFileStore {
    /// 输出目录
    output_dir: PathBuf,
}

impl AudioFileStore {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// 使用默认下载目录
    pub fn with_default_dir() -> Self {
        Self::new(default_output_dir())
    }

    /// 在目录中找一个未被占用的路径
    async fn unique_path(&self, stem: &str, extension: &str) -> PathBuf {
        let candidate = self.output_dir.join(format!("{}.{}", stem, extension));
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        for n in 1..=MAX_COLLISION_SUFFIX {
            let candidate = self.output_dir.join(format!("{}_{}.{}", stem, n, extension));
            if !fs::try_exists(&candidate).await.unwrap_or(false) {
                return candidate;
            }
        }
        self.output_dir
            .join(format!("{}_{}.{}", stem, MAX_COLLISION_SUFFIX + 1, extension))
    }
}

#[async_trait]
impl AudioStoragePort for AudioFileStore {
    fn output_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    async fn save_audio(
        &self,
        provider: ProviderKind,
        voice_id: &str,
        format: OutputFormat,
        data: &[u8],
    ) -> Result<PathBuf, AudioStorageError> {
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(AudioStorageError::InvalidDirectory(
                self.output_dir.display().to_string(),
            ));
        }

        // 确保输出目录存在
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AudioStorageError::IoError(e.to_string()))?;

        let stem = file_stem(provider, voice_id, Local::now().naive_local());
        let path = self.unique_path(&stem, format.extension()).await;

        fs::write(&path, data)
            .await
            .map_err(|e| AudioStorageError::IoError(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            size = data.len(),
            "Saved audio"
        );

        Ok(path)
    }

    async fn write_temp(
        &self,
        format: OutputFormat,
        data: &[u8],
    ) -> Result<TempPath, AudioStorageError> {
        let suffix = format!(".{}", format.extension());
        let data = data.to_vec();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut file = tempfile::Builder::new()
                .prefix("voxdesk_")
                .suffix(&suffix)
                .tempfile()?;
            file.write_all(&data)?;
            file.flush()?;
            Ok::<TempPath, std::io::Error>(file.into_temp_path())
        })
        .await;

        match outcome {
            Ok(Ok(path)) => {
                tracing::debug!(path = %path.display(), "Wrote temp audio");
                Ok(path)
            }
            Ok(Err(e)) => Err(AudioStorageError::IoError(e.to_string())),
            Err(e) => Err(AudioStorageError::IoError(format!(
                "Temp file task failed: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_file_stem() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        assert_eq!(
            file_stem(ProviderKind::Azure, "en-US-JennyNeural", ts),
            "azure_tts_en_US_JennyNeural_20240309_070501"
        );
        assert_eq!(
            file_stem(ProviderKind::Polly, "Joanna", ts),
            "polly_tts_Joanna_20240309_070501"
        );
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let out = temp_dir.path().join("nested").join("out");
        let storage = AudioFileStore::new(&out);

        let path = storage
            .save_audio(ProviderKind::Polly, "Joanna", OutputFormat::Mp3, b"ID3")
            .await
            .unwrap();

        assert!(out.is_dir());
        assert_eq!(path.extension().unwrap(), "mp3");
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3");
    }

    #[tokio::test]
    async fn test_same_second_does_not_overwrite() {
        let temp_dir = tempdir().unwrap();
        let storage = AudioFileStore::new(temp_dir.path());

        let mut paths = Vec::new();
        for i in 0..3u8 {
            paths.push(
                storage
                    .save_audio(ProviderKind::Azure, "en-US-GuyNeural", OutputFormat::Wav, &[i])
                    .await
                    .unwrap(),
            );
        }

        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.exists());
        }
    }

    #[tokio::test]
    async fn test_pcm_saved_as_wav() {
        let temp_dir = tempdir().unwrap();
        let storage = AudioFileStore::new(temp_dir.path());

        let path = storage
            .save_audio(ProviderKind::Polly, "Ivy", OutputFormat::Pcm, b"RIFF")
            .await
            .unwrap();
        assert_eq!(path.extension().unwrap(), "wav");
    }

    #[tokio::test]
    async fn test_file_as_output_dir_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();

        let err = AudioFileStore::new(&file)
            .save_audio(ProviderKind::Polly, "Ivy", OutputFormat::Mp3, b"ID3")
            .await
            .unwrap_err();
        assert!(matches!(err, AudioStorageError::InvalidDirectory(_)));
    }

    #[tokio::test]
    async fn test_temp_file_removed_on_drop() {
        let storage = AudioFileStore::new(".");
        let temp = storage.write_temp(OutputFormat::OggVorbis, b"OggS").await.unwrap();
        let path = temp.to_path_buf();

        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".ogg"));
        drop(temp);
        assert!(!path.exists());
    }
}
