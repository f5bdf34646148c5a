//! Model weight download and caching.
//!
//! Handles automatic downloading of Whisper GGML weights on first run.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::SpeechModel;

const WHISPER_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Metadata for a downloadable model.
struct ModelInfo {
    /// Filename to save as.
    filename: &'static str,
    /// Download URL.
    url: String,
    /// Expected file size for validation.
    size_bytes: u64,
}

impl SpeechModel {
    /// Get download metadata for this model.
    fn info(self) -> ModelInfo {
        let (filename, size_bytes) = match self {
            SpeechModel::Tiny => ("ggml-tiny.bin", 77_691_713),
            SpeechModel::TinyEn => ("ggml-tiny.en.bin", 77_704_715),
            SpeechModel::Base => ("ggml-base.bin", 147_951_465),
            SpeechModel::BaseEn => ("ggml-base.en.bin", 147_964_211),
            SpeechModel::Small => ("ggml-small.bin", 487_601_967),
            SpeechModel::SmallEn => ("ggml-small.en.bin", 487_614_201),
            SpeechModel::Medium => ("ggml-medium.bin", 1_533_774_781),
            SpeechModel::MediumEn => ("ggml-medium.en.bin", 1_533_774_781),
            SpeechModel::LargeV3 => ("ggml-large-v3.bin", 3_094_623_691),
            SpeechModel::LargeV3Turbo => ("ggml-large-v3-turbo.bin", 1_624_592_891),
        };
        ModelInfo {
            filename,
            url: format!("{WHISPER_BASE_URL}/{filename}"),
            size_bytes,
        }
    }
}

/// Manages model downloads and storage.
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a ModelManager storing weights under the given directory.
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Get the models directory path.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Ensure a model is available, downloading if necessary.
    ///
    /// Returns the path to the model file.
    pub async fn ensure_model(&self, model: SpeechModel) -> Result<PathBuf> {
        let info = model.info();
        let model_path = self.models_dir.join(info.filename);

        if model_path.exists() {
            let metadata = tokio::fs::metadata(&model_path)
                .await
                .context("Failed to read model metadata")?;
            let actual_size = metadata.len();

            if actual_size != info.size_bytes {
                warn!(
                    model = ?model,
                    expected = info.size_bytes,
                    actual = actual_size,
                    "Model size mismatch, re-downloading"
                );
                tokio::fs::remove_file(&model_path)
                    .await
                    .context("Failed to remove corrupted model")?;
            } else {
                debug!(path = %model_path.display(), "Model already exists");
                return Ok(model_path);
            }
        }

        self.download_model(&info, &model_path).await?;
        Ok(model_path)
    }

    /// Download a model from its URL.
    async fn download_model(&self, info: &ModelInfo, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create models directory")?;
        }

        info!(
            url = %info.url,
            dest = %dest.display(),
            "Downloading model"
        );

        let response = reqwest::get(&info.url)
            .await
            .with_context(|| format!("Failed to download model from {}", info.url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download model: HTTP {}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        if bytes.len() as u64 != info.size_bytes {
            anyhow::bail!(
                "Downloaded model size mismatch: expected {}, got {}",
                info.size_bytes,
                bytes.len()
            );
        }

        // Write to temporary file first, then rename (atomic)
        let temp_path = dest.with_extension("tmp");
        tokio::fs::write(&temp_path, &bytes)
            .await
            .context("Failed to write model file")?;
        tokio::fs::rename(&temp_path, dest)
            .await
            .context("Failed to finalize model file")?;

        info!(
            path = %dest.display(),
            size = bytes.len(),
            "Model downloaded successfully"
        );

        Ok(())
    }
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
