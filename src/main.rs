use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use qoj_submit_relay::cli::{run_submit, Cli, Command};
use qoj_submit_relay::{bridge, utils, App, Config};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // `submit` 只需要输出结果，不加载配置也不初始化日志
    if let Some(Command::Submit(args)) = &cli.command {
        return Ok(match run_submit(args).await {
            Ok(response) => {
                println!("{}", response);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::from(e.exit_code() as u8)
            }
        });
    }

    let config = Config::load(&cli.config)
        .with_context(|| format!("加载配置 {} 失败", cli.config.display()))?;
    utils::logging::init(cli.verbose || config.verbose_logging);

    match cli.command {
        Some(Command::Serve { bind }) => {
            let bind = bind.unwrap_or_else(|| config.bridge_bind.clone());
            bridge::serve(&bind, &config.default_language)
                .await
                .context("桥接服务异常退出")?;
        }
        _ => {
            App::initialize(config)
                .await
                .context("初始化中继失败")?
                .run()
                .await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
