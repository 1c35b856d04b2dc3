//! Voxdesk - 多服务商 TTS 命令行
//!
//! 只负责路由：加载凭据 → 驱动 ProviderSession → 打印提示

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use voxdesk::application::ports::SpeechProviderPort;
use voxdesk::application::{Notice, ProviderSession, Route, SelectionDiff, SessionPorts, Severity};
use voxdesk::config::{load_config_from_path, print_config, AppConfig};
use voxdesk::domain::voice::Region;
use voxdesk::domain::{Credentials, Field, ProviderKind};
use voxdesk::infrastructure::adapters::{
    AudioFileStore, AwsPollyClient, AwsPollyClientConfig, AzureSpeechClient,
    AzureSpeechClientConfig, KeyringSecretStore, SystemShell, WavTranscoder,
};

#[derive(Parser, Debug)]
#[command(name = "voxdesk", version, about = "Text to speech with Amazon Polly and Azure Speech")]
struct Cli {
    /// 配置文件路径（默认搜索 voxdesk.toml）
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 以 JSON 输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 验证并保存凭据
    Login {
        provider: ProviderArg,
        /// Access Key / Subscription Key
        #[arg(long)]
        key: Option<String>,
        /// Secret Key / Endpoint
        #[arg(long)]
        secret: Option<String>,
        /// 只验证，不写入系统密钥链
        #[arg(long)]
        no_remember: bool,
    },
    /// 删除已保存的凭据
    Logout { provider: ProviderArg },
    /// 列出当前选择下的语言与音色
    Voices {
        provider: ProviderArg,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// 合成文本并保存或播放
    Speak {
        provider: ProviderArg,
        /// 要合成的文本
        #[arg(long)]
        text: String,
        #[command(flatten)]
        selection: SelectionArgs,
        /// 音色 ID 或显示字符串
        #[arg(long)]
        voice: Option<String>,
        /// 输出格式 (mp3, ogg_vorbis, pcm, wav, ogg_opus)
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        sample_rate: Option<String>,
        /// 直接播放，不保存
        #[arg(long)]
        play: bool,
    },
}

#[derive(Args, Debug, Default)]
struct SelectionArgs {
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    engine: Option<String>,
    /// 语言代码，例如 en-US
    #[arg(long)]
    language: Option<String>,
    /// All / Female / Male / Neutral
    #[arg(long)]
    gender: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ProviderArg {
    Polly,
    Azure,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Polly => ProviderKind::Polly,
            ProviderArg::Azure => ProviderKind::Azure,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config, cli.log_json);
    print_config(&config);

    match cli.command {
        Command::Login {
            provider,
            key,
            secret,
            no_remember,
        } => login(&config, provider.into(), key, secret, !no_remember).await,
        Command::Logout { provider } => {
            let mut session = build_session(&config, provider.into())?;
            let notice = session.clear_saved_credentials().await;
            if notice.blocking {
                bail!("{}", notice.message);
            }
            report(&notice);
            Ok(())
        }
        Command::Voices {
            provider,
            selection,
        } => voices(&config, provider.into(), &selection).await,
        Command::Speak {
            provider,
            text,
            selection,
            voice,
            format,
            sample_rate,
            play,
        } => {
            let mut session = open_session(&config, provider.into()).await?;
            apply_selection(&mut session, &selection).await?;
            if let Some(format) = format {
                report_diff(&session.change(Field::OutputFormat, &format).await?);
            }
            if let Some(rate) = sample_rate {
                report_diff(&session.change(Field::SampleRate, &rate).await?);
            }
            if let Some(voice) = voice {
                let display = find_voice_option(&session, &voice)?;
                session.change(Field::Voice, &display).await?;
            }
            session.change(Field::Text, &text).await?;

            let count = session.char_count();
            tracing::info!(chars = %count, "Text ready");

            if play {
                session.play_directly().await?;
                report(&Notice::info("Playback finished"));
            } else {
                let saved = session.generate_and_save().await?;
                for warning in &saved.warnings {
                    report(warning);
                }
                println!("{}", saved.path.display());
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &AppConfig, force_json: bool) {
    let log_filter = format!("{},voxdesk={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json || force_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_session(config: &AppConfig, kind: ProviderKind) -> Result<ProviderSession> {
    let max_text_chars = Some(config.text.max_chars);
    let provider: Arc<dyn SpeechProviderPort> = match kind {
        ProviderKind::Polly => Arc::new(AwsPollyClient::new(AwsPollyClientConfig {
            verify_region: config.polly.verify_region.clone(),
            timeout_secs: config.polly.timeout_secs,
            max_text_chars,
        })),
        ProviderKind::Azure => Arc::new(AzureSpeechClient::new(AzureSpeechClientConfig {
            timeout_secs: config.azure.timeout_secs,
            max_text_chars,
        })?),
    };

    let preferred_region = match kind {
        ProviderKind::Polly => Some(
            Region::new(config.polly.default_region.as_str())
                .context("Invalid polly.default_region")?,
        ),
        ProviderKind::Azure => None,
    };

    let ports = SessionPorts {
        provider,
        secrets: Arc::new(KeyringSecretStore::new()),
        storage: Arc::new(AudioFileStore::new(config.output.resolved_dir())),
        transcoder: Arc::new(WavTranscoder::new()),
        shell: Arc::new(SystemShell::new()),
    };
    Ok(ProviderSession::new(ports).with_preferred_region(preferred_region))
}

/// 加载已保存凭据并完成首次发现；没有凭据时提示先登录
async fn open_session(config: &AppConfig, kind: ProviderKind) -> Result<ProviderSession> {
    let mut session = build_session(config, kind)?;
    if session.open().await == Route::Auth {
        bail!(
            "Login required: run `voxdesk login {}` first",
            kind.as_str()
        );
    }
    report_diff(&session.initialize().await?);
    Ok(session)
}

async fn login(
    config: &AppConfig,
    kind: ProviderKind,
    key: Option<String>,
    secret: Option<String>,
    remember: bool,
) -> Result<()> {
    let [primary_label, secondary_label] = kind.credential_labels();
    let primary = match key {
        Some(value) => value,
        None => prompt(primary_label)?,
    };
    let secondary = match secret {
        Some(value) => value,
        None => prompt(secondary_label)?,
    };

    let mut session = build_session(config, kind)?;
    let notice = session
        .verify_and_continue(Credentials::new(primary, secondary), remember)
        .await?;
    match notice {
        Some(notice) => report(&notice),
        None => report(&Notice::info(format!(
            "{} credentials verified",
            kind.display_name()
        ))),
    }
    Ok(())
}

async fn voices(config: &AppConfig, kind: ProviderKind, args: &SelectionArgs) -> Result<()> {
    let mut session = open_session(config, kind).await?;
    apply_selection(&mut session, args).await?;

    let selection = session.selection();
    let options = session.options();
    if let Some(region) = &selection.region {
        println!("Region: {}", region);
    }
    if let Some(engine) = selection.engine {
        println!("Engine: {}", engine);
    }
    println!("Languages:");
    for language in &options.languages {
        let marker = if selection.language.as_ref() == Some(&language.code) {
            "*"
        } else {
            " "
        };
        println!(" {} {}", marker, language.display());
    }
    println!("Voices ({}):", selection.gender);
    for voice in &options.voices {
        println!("   {}", voice);
    }
    Ok(())
}

/// 按级联顺序应用命令行中的选择
async fn apply_selection(session: &mut ProviderSession, args: &SelectionArgs) -> Result<()> {
    let steps = [
        (Field::Region, &args.region),
        (Field::Engine, &args.engine),
        (Field::Language, &args.language),
        (Field::Gender, &args.gender),
    ];
    for (field, value) in steps {
        if let Some(value) = value {
            report_diff(&session.change(field, value).await?);
        }
    }
    Ok(())
}

/// 接受音色 ID 或完整显示字符串
fn find_voice_option(session: &ProviderSession, wanted: &str) -> Result<String> {
    session
        .options()
        .voices
        .iter()
        .find(|display| {
            display.as_str() == wanted
                || session.resolver().resolve_voice_id(display).as_deref() == Some(wanted)
        })
        .cloned()
        .ok_or_else(|| anyhow!("Voice '{}' is not available for the current selection", wanted))
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn report(notice: &Notice) {
    match notice.severity {
        Severity::Info => eprintln!("{}", notice.message),
        Severity::Warning => eprintln!("warning: {}", notice.message),
        Severity::Error => eprintln!("error: {}", notice.message),
    }
}

fn report_diff(diff: &SelectionDiff) {
    for warning in &diff.warnings {
        report(&Notice::warning(warning.clone()));
    }
}
