//! 命令行
//!
//! - `relay`（默认）：连接浏览器，接收推送并自动提交
//! - `serve`：运行操作端桥接服务
//! - `submit`：把源文件推送给桥接服务

pub mod submit;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use submit::{run_submit, SubmitArgs, SubmitError};

#[derive(Parser, Debug)]
#[command(name = "qoj-submit-relay")]
#[command(about = "把推送的代码自动提交到 QOJ，并回报提交记录和评测结果")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// TOML 配置文件路径（不存在时只用环境变量和默认值）
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 运行中继（默认）
    Relay,
    /// 运行桥接服务
    Serve {
        /// 监听地址，覆盖配置中的 bridge_bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// 推送源文件
    Submit(SubmitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_relay() {
        let cli = Cli::parse_from(["qoj-submit-relay"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn test_parse_submit() {
        let cli = Cli::parse_from([
            "qoj-submit-relay",
            "submit",
            "C.cpp",
            "--lang",
            "C++17",
            "-y",
        ]);
        match cli.command {
            Some(Command::Submit(args)) => {
                assert_eq!(args.file, PathBuf::from("C.cpp"));
                assert_eq!(args.lang.as_deref(), Some("C++17"));
                assert!(args.yes);
                assert!(args.problem.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_bind() {
        let cli = Cli::parse_from(["qoj-submit-relay", "-v", "serve", "--bind", "127.0.0.1:9000"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Some(Command::Serve { bind: Some(ref b) }) if b == "127.0.0.1:9000"
        ));
    }
}
