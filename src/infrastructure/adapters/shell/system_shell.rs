//! System Shell - 调用操作系统的文件管理器与播放器
//!
//! | OS      | reveal                    | play                               |
//! |---------|---------------------------|------------------------------------|
//! | macOS   | `open -R <file>`          | `afplay <file>`                    |
//! | Windows | `explorer /select,<file>` | `cmd /C start "" /wait <file>`     |
//! | Linux   | `xdg-open <dir>`          | `aplay <wav>` / `ffplay <其他格式>` |

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::application::ports::{ShellActionPort, ShellError};

/// 一次外部命令调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<OsString>,
    /// explorer 即使成功也返回非零，不检查退出码
    pub check_status: bool,
}

impl ShellCommand {
    fn new(program: &str, args: Vec<OsString>) -> Self {
        Self {
            program: program.to_string(),
            args,
            check_status: true,
        }
    }

    fn unchecked(mut self) -> Self {
        self.check_status = false;
        self
    }
}

/// 在文件管理器中显示文件
pub fn reveal_command(os: &str, path: &Path) -> Result<ShellCommand, ShellError> {
    match os {
        "macos" => Ok(ShellCommand::new(
            "open",
            vec!["-R".into(), path.as_os_str().to_owned()],
        )),
        "windows" => {
            let mut select = OsString::from("/select,");
            select.push(path.as_os_str());
            Ok(ShellCommand::new("explorer", vec![select]).unchecked())
        }
        "linux" | "freebsd" | "openbsd" | "netbsd" => {
            let dir = path.parent().unwrap_or(path);
            Ok(ShellCommand::new(
                "xdg-open",
                vec![dir.as_os_str().to_owned()],
            ))
        }
        other => Err(ShellError::UnsupportedPlatform(other.to_string())),
    }
}

/// 播放音频文件，命令在播放结束后返回
pub fn play_command(os: &str, path: &Path) -> Result<ShellCommand, ShellError> {
    let file = path.as_os_str().to_owned();
    match os {
        "macos" => Ok(ShellCommand::new("afplay", vec![file])),
        "windows" => Ok(ShellCommand::new(
            "cmd",
            vec!["/C".into(), "start".into(), "".into(), "/wait".into(), file],
        )),
        "linux" | "freebsd" | "openbsd" | "netbsd" => {
            let is_wav = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
            if is_wav {
                Ok(ShellCommand::new("aplay", vec!["-q".into(), file]))
            } else {
                Ok(ShellCommand::new(
                    "ffplay",
                    vec![
                        "-nodisp".into(),
                        "-autoexit".into(),
                        "-loglevel".into(),
                        "quiet".into(),
                        file,
                    ],
                ))
            }
        }
        other => Err(ShellError::UnsupportedPlatform(other.to_string())),
    }
}

/// 当前平台的 Shell 实现
#[derive(Debug, Clone)]
pub struct SystemShell {
    os: String,
}

impl SystemShell {
    pub fn new() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
        }
    }

    async fn run(&self, command: ShellCommand) -> Result<(), ShellError> {
        tracing::debug!(
            program = %command.program,
            args = ?command.args,
            "Running shell command"
        );

        let status = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| ShellError::Launch {
                program: command.program.clone(),
                reason: e.to_string(),
            })?;

        if command.check_status && !status.success() {
            return Err(ShellError::ExitStatus {
                program: command.program,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShellActionPort for SystemShell {
    async fn reveal(&self, path: &Path) -> Result<(), ShellError> {
        self.run(reveal_command(&self.os, path)?).await
    }

    async fn play(&self, path: &Path) -> Result<(), ShellError> {
        self.run(play_command(&self.os, path)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_commands() {
        let path = Path::new("/tmp/out/polly_tts_Joanna.mp3");

        let mac = reveal_command("macos", path).unwrap();
        assert_eq!(mac.program, "open");
        assert_eq!(mac.args[0], "-R");

        let linux = reveal_command("linux", path).unwrap();
        assert_eq!(linux.program, "xdg-open");
        assert_eq!(linux.args, vec![OsString::from("/tmp/out")]);

        let windows = reveal_command("windows", path).unwrap();
        assert_eq!(windows.program, "explorer");
        assert!(!windows.check_status);
        assert!(windows.args[0].to_string_lossy().starts_with("/select,"));
    }

    #[test]
    fn test_play_commands() {
        let wav = Path::new("/tmp/a.wav");
        let mp3 = Path::new("/tmp/a.mp3");

        assert_eq!(play_command("macos", mp3).unwrap().program, "afplay");
        assert_eq!(play_command("linux", wav).unwrap().program, "aplay");
        assert_eq!(play_command("linux", mp3).unwrap().program, "ffplay");
        assert_eq!(play_command("windows", wav).unwrap().program, "cmd");
    }

    #[test]
    fn test_unsupported_platform() {
        let err = play_command("plan9", Path::new("/tmp/a.wav")).unwrap_err();
        assert!(matches!(err, ShellError::UnsupportedPlatform(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let shell = SystemShell::new();
        let err = shell
            .run(ShellCommand::new("voxdesk-no-such-program", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Launch { .. }));
    }
}
