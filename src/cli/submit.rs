//! `submit` 子命令：把源文件推送给桥接服务

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use reqwest::multipart;
use serde_json::Value;
use thiserror::Error;

/// `submit` 参数
#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// 源文件路径
    pub file: PathBuf,

    /// 题号（如 A）；省略时取单字母文件名
    #[arg(short, long)]
    pub problem: Option<String>,

    /// 评测站点的语言选项；省略时使用桥接服务的默认语言
    #[arg(long)]
    pub lang: Option<String>,

    /// 桥接服务地址
    #[arg(long, env = "SUBMIT_SERVER", default_value = "http://127.0.0.1:8000")]
    pub server: String,

    /// 跳过确认直接提交
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// `submit` 失败原因，各自对应进程退出码
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("problem code not provided and could not infer a single-letter code from filename")]
    ProblemUnknown,
    #[error("aborted by user")]
    Aborted,
    #[error("server error: {status} {body}")]
    Server { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubmitError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SubmitError::Aborted => 3,
            SubmitError::Server { .. } => 2,
            _ => 1,
        }
    }
}

/// 决定题号：显式指定优先，其次是单个字母的文件名
pub fn resolve_problem(explicit: Option<&str>, path: &Path) -> Option<String> {
    if let Some(problem) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return Some(problem.to_string());
    }
    let stem = path.file_stem()?.to_str()?;
    let mut chars = stem.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase().to_string()),
        _ => None,
    }
}

/// 询问是否提交，只有回答 `y` 才继续
pub fn confirm(
    file: &str,
    problem: &str,
    mut input: impl BufRead,
    mut output: impl Write,
) -> std::io::Result<bool> {
    write!(output, "Submit {} to problem {}? [y/N]: ", file, problem)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// 执行 `submit`，成功时返回桥接服务的响应
pub async fn run_submit(args: &SubmitArgs) -> Result<Value, SubmitError> {
    if !args.file.is_file() {
        return Err(SubmitError::FileNotFound(args.file.display().to_string()));
    }
    let payload = tokio::fs::read(&args.file).await?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());

    let problem =
        resolve_problem(args.problem.as_deref(), &args.file).ok_or(SubmitError::ProblemUnknown)?;

    if !args.yes {
        let stdin = std::io::stdin();
        if !confirm(&filename, &problem, stdin.lock(), std::io::stdout())? {
            return Err(SubmitError::Aborted);
        }
    }

    post_submission(&args.server, &problem, args.lang.as_deref(), &filename, payload).await
}

/// `POST {server}/submit`
pub async fn post_submission(
    server: &str,
    problem: &str,
    language: Option<&str>,
    filename: &str,
    payload: Vec<u8>,
) -> Result<Value, SubmitError> {
    let url = format!("{}/submit", server.trim_end_matches('/'));
    let file = multipart::Part::bytes(payload)
        .file_name(filename.to_string())
        .mime_str("text/plain")?;
    let mut form = multipart::Form::new().text("problem_code", problem.to_string());
    if let Some(language) = language {
        form = form.text("language", language.to_string());
    }
    let form = form.part("file", file);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let response = client.post(&url).multipart(form).send().await?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(SubmitError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}
