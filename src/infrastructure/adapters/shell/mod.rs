//! Shell Adapter - 操作系统动作

mod system_shell;

pub use system_shell::{play_command, reveal_command, ShellCommand, SystemShell};
