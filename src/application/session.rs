//! Provider Session - 单个服务商标签页的完整流程
//!
//! 加载凭据 → (认证表单) → 验证并保存 → 发现目录 → 级联选择 → 合成 → 保存/播放
//!
//! 会话独占自己的 Selection 与 Voice Catalog，不与其他会话共享

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::catalog::CatalogResolver;
use crate::application::credentials::{CredentialManager, SaveOutcome};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioStoragePort, AudioTranscoderPort, SecretStorePort, ShellActionPort, SpeechProviderPort,
};
use crate::application::selection::{SelectionDiff, SelectionMachine, SelectionOptions};
use crate::application::synthesis::{CharCount, SynthesisOrchestrator, SynthesisResult};
use crate::domain::voice::{OutputFormat, Region};
use crate::domain::{Credentials, Field, ProviderCapabilities, Selection};

/// 打开会话后应显示的界面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Auth,
    Main,
}

/// 提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// 状态栏提示；blocking 为 true 时需要弹窗
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
    pub blocking: bool,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
            blocking: false,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
            blocking: false,
        }
    }
}

impl From<&ApplicationError> for Notice {
    fn from(err: &ApplicationError) -> Self {
        Self {
            message: err.to_string(),
            severity: Severity::Error,
            blocking: err.is_blocking(),
        }
    }
}

/// 会话依赖的端口
#[derive(Clone)]
pub struct SessionPorts {
    pub provider: Arc<dyn SpeechProviderPort>,
    pub secrets: Arc<dyn SecretStorePort>,
    pub storage: Arc<dyn AudioStoragePort>,
    pub transcoder: Arc<dyn AudioTranscoderPort>,
    pub shell: Arc<dyn ShellActionPort>,
}

/// 保存到输出目录的结果
#[derive(Debug, Clone)]
pub struct SavedAudio {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub duration_ms: Option<u64>,
    /// 非致命问题，例如无法在文件管理器中显示
    pub warnings: Vec<Notice>,
}

/// 单个服务商会话
pub struct ProviderSession {
    credentials: CredentialManager,
    resolver: CatalogResolver,
    machine: SelectionMachine,
    orchestrator: SynthesisOrchestrator,
    storage: Arc<dyn AudioStoragePort>,
    shell: Arc<dyn ShellActionPort>,
    preferred_region: Option<Region>,
}

impl ProviderSession {
    pub fn new(ports: SessionPorts) -> Self {
        let caps = ports.provider.capabilities().clone();
        Self {
            credentials: CredentialManager::new(caps.kind, ports.secrets),
            resolver: CatalogResolver::new(ports.provider),
            machine: SelectionMachine::new(caps),
            orchestrator: SynthesisOrchestrator::new(ports.transcoder),
            storage: ports.storage,
            shell: ports.shell,
            preferred_region: None,
        }
    }

    /// 初始化时优先选择的区域
    pub fn with_preferred_region(mut self, region: Option<Region>) -> Self {
        self.preferred_region = region;
        self
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.resolver.capabilities()
    }

    pub fn selection(&self) -> &Selection {
        self.machine.selection()
    }

    pub fn options(&self) -> &SelectionOptions {
        self.machine.options()
    }

    pub fn resolver(&self) -> &CatalogResolver {
        &self.resolver
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.current().is_some()
    }

    pub fn char_count(&self) -> CharCount {
        SynthesisOrchestrator::char_count(self.capabilities(), &self.selection().text)
    }

    /// 加载已保存的凭据，决定初始界面
    pub async fn open(&mut self) -> Route {
        if self.credentials.load().await {
            Route::Main
        } else {
            Route::Auth
        }
    }

    /// 验证凭据；成功后按需保存
    ///
    /// 保存失败只返回警告，已验证的会话保持有效
    pub async fn verify_and_continue(
        &mut self,
        credentials: Credentials,
        remember: bool,
    ) -> Result<Option<Notice>, ApplicationError> {
        let kind = self.capabilities().kind;
        if !credentials.is_complete() {
            let [primary, secondary] = kind.credential_labels();
            return Err(ApplicationError::CredentialMissing(format!(
                "Please enter both {} and {}.",
                primary, secondary
            )));
        }

        self.resolver
            .provider()
            .verify_credentials(&credentials)
            .await
            .map_err(|e| {
                tracing::warn!(provider = %kind, error = %e, "Credential verification failed");
                ApplicationError::from(e).blocking()
            })?;

        tracing::info!(provider = %kind, remember, "Credentials verified");
        self.credentials.set(credentials);

        let notice = match self.credentials.save(remember).await {
            SaveOutcome::Saved | SaveOutcome::NotRequested => None,
            SaveOutcome::Failed(reason) => Some(Notice::warning(format!(
                "Credentials verified but could not be remembered: {}",
                reason
            ))),
        };
        Ok(notice)
    }

    /// 进入主界面：列出区域并完成首次发现
    pub async fn initialize(&mut self) -> Result<SelectionDiff, ApplicationError> {
        let credentials = self.require_credentials()?.clone();
        let regions = self.resolver.list_regions(&credentials).await?;
        if regions.is_empty() {
            return Err(ApplicationError::catalog_empty("No regions available"));
        }

        let mut diff =
            self.machine
                .set_regions(regions, self.preferred_region.as_ref(), &self.resolver);
        if diff.discovery_required {
            diff.merge(self.refresh_catalog().await?);
        }
        Ok(diff)
    }

    /// 修改字段；区域或引擎变化时重新发现
    pub async fn change(
        &mut self,
        field: Field,
        value: &str,
    ) -> Result<SelectionDiff, ApplicationError> {
        let mut diff = self.machine.on_field_changed(field, value, &self.resolver)?;
        if diff.discovery_required {
            diff.merge(self.refresh_catalog().await?);
        }
        Ok(diff)
    }

    /// 按当前 (region, engine) 重新发现音色
    pub async fn refresh_catalog(&mut self) -> Result<SelectionDiff, ApplicationError> {
        let credentials = self.require_credentials()?.clone();
        let selection = self.machine.selection();
        let Some(region) = selection.region.clone() else {
            return Err(ApplicationError::catalog_empty("No region selected"));
        };
        let engine = selection.engine;

        match self
            .resolver
            .discover_voices(&credentials, &region, engine)
            .await
        {
            Ok(_) => Ok(self.machine.catalog_refreshed(&self.resolver)),
            Err(err) => {
                self.machine.catalog_failed();
                Err(match err {
                    ApplicationError::Provider(message) => ApplicationError::catalog_empty(
                        format!(
                            "Failed to load languages, please select a different region ({})",
                            message
                        ),
                    ),
                    other => other,
                })
            }
        }
    }

    /// 合成但不落盘
    pub async fn synthesize(&self) -> SynthesisResult {
        self.orchestrator
            .synthesize(
                &self.resolver,
                self.credentials.current(),
                self.machine.selection(),
            )
            .await
    }

    /// 合成并保存到输出目录，然后在文件管理器中显示
    pub async fn generate_and_save(&self) -> Result<SavedAudio, ApplicationError> {
        let audio = self.synthesize().await?;
        let path = self
            .storage
            .save_audio(
                self.capabilities().kind,
                &audio.voice_id,
                audio.format,
                &audio.data,
            )
            .await?;

        let mut warnings = Vec::new();
        if let Err(e) = self.shell.reveal(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to reveal saved file");
            warnings.push(Notice::warning(format!(
                "Saved to {} but could not open the folder: {}",
                path.display(),
                e
            )));
        }

        Ok(SavedAudio {
            path,
            format: audio.format,
            duration_ms: audio.duration_ms,
            warnings,
        })
    }

    /// 合成后直接播放；临时文件在任何路径上都会被删除
    pub async fn play_directly(&self) -> Result<(), ApplicationError> {
        let audio = self.synthesize().await?;
        let temp = self.storage.write_temp(audio.format, &audio.data).await?;

        let result = self.shell.play(&temp).await;

        let path = temp.to_path_buf();
        if let Err(e) = temp.close() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp audio file");
        }

        result.map_err(|e| {
            tracing::error!(error = %e, "Playback failed");
            ApplicationError::from(e)
        })
    }

    /// 删除已保存的凭据，回到认证界面
    pub async fn clear_saved_credentials(&mut self) -> Notice {
        let cleared = self.credentials.clear().await;
        self.machine = SelectionMachine::new(self.capabilities().clone());
        self.resolver.reset();
        if cleared {
            Notice::info("Saved credentials cleared")
        } else {
            Notice {
                message: "Could not remove saved credentials from the secret store".to_string(),
                severity: Severity::Error,
                blocking: true,
            }
        }
    }

    fn require_credentials(&self) -> Result<&Credentials, ApplicationError> {
        self.credentials.current().ok_or_else(|| {
            ApplicationError::CredentialMissing(format!(
                "Please enter your {} credentials.",
                self.capabilities().kind.display_name()
            ))
        })
    }
}
