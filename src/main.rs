//! # 图片转 Roblox 像素数据：命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与结果投递（标准输出或文件）。
//! 转换逻辑全部在 `converter` 模块中，详见 `lib.rs` 架构文档。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use image_to_roblox::converter::{ConvertConfig, FileInput, ImageHandler, ResampleFilter};
use image_to_roblox::error::AppError;

/// `--save` 使用的固定文件名。
const DEFAULT_OUTPUT_FILE: &str = "roblox-image-data.json";

/// 将 PNG/JPEG 图片转换为 Roblox 脚本可读取的 JSON 像素网格（单边不超过 512）。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 本地图片文件（同时给出 --url 时以文件为准）
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// 图片 URL，也接受 data:image/...;base64, 形式
    #[arg(short, long)]
    url: Option<String>,

    /// 输出 JSON 文件；缺省时写到标准输出
    #[arg(short, long, conflicts_with = "save")]
    output: Option<PathBuf>,

    /// 保存为当前目录下的 roblox-image-data.json
    #[arg(long)]
    save: bool,

    /// 缩进输出（仅影响可读性）
    #[arg(long)]
    pretty: bool,

    /// 降采样滤镜：nearest / bilinear / catmull-rom / lanczos3
    #[arg(long)]
    filter: Option<String>,

    /// JSON 配置文件，字段同 ConvertConfig，缺省字段取默认值
    #[arg(long)]
    config: Option<PathBuf>,

    /// 允许下载内网/本机地址的图片
    #[arg(long)]
    allow_private_network: bool,

    /// 整体超时（秒），覆盖下载与解码
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// 失败时以 JSON 输出 {code, stage, message}
    #[arg(long)]
    json_errors: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let json_errors = args.json_errors;

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ 转换失败: {err}");
            if json_errors {
                match serde_json::to_string(&err.report()) {
                    Ok(report) => eprintln!("{report}"),
                    Err(_) => eprintln!("{err}"),
                }
            } else {
                eprintln!("错误：{err}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = build_config(&args)?;
    let handler = ImageHandler::new(config)?;

    let file = args.file.map(FileInput::Path);
    let conversion = tokio::time::timeout(
        Duration::from_secs(args.timeout),
        handler.convert_request(file, args.url.as_deref()),
    )
    .await
    .map_err(|_| AppError::Timeout(args.timeout))??;

    let json = if args.pretty {
        conversion.grid.to_json_pretty()?
    } else {
        conversion.grid.to_json()?
    };

    let target = args
        .output
        .or_else(|| args.save.then(|| PathBuf::from(DEFAULT_OUTPUT_FILE)));

    match target {
        Some(path) => {
            write_atomically(&path, json.as_bytes())?;
            log::info!("💾 已写入 {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
        }
    }

    log::info!(
        "🎉 {} → {}",
        conversion.file_name,
        conversion.grid.summary()
    );

    Ok(())
}

/// 配置文件打底，命令行参数覆盖。
fn build_config(args: &Args) -> Result<ConvertConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_json::from_str::<ConvertConfig>(&content)?
        }
        None => ConvertConfig::default(),
    };

    if let Some(filter) = &args.filter {
        config.resize_filter = ResampleFilter::parse(filter)?;
    }
    if args.allow_private_network {
        config.allow_private_network = true;
    }

    Ok(config)
}

/// 同目录下的临时文件名，带进程号，并发运行互不覆盖。
fn temp_path_for(path: &Path) -> PathBuf {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    PathBuf::from(tmp_name)
}

/// 先写临时文件再重命名，失败时不会留下半截 JSON 或覆盖旧结果。
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let tmp_path = temp_path_for(path);

    fs::write(&tmp_path, bytes)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_accept_file_and_url_together() {
        let args = Args::try_parse_from(["image-to-roblox", "-f", "cat.png", "-u", "https://x/y.png"])
            .expect("args should parse");

        assert_eq!(args.file, Some(PathBuf::from("cat.png")));
        assert_eq!(args.url.as_deref(), Some("https://x/y.png"));
        assert_eq!(args.timeout, 60);
    }

    #[test]
    fn args_reject_output_with_save_and_zero_timeout() {
        assert!(Args::try_parse_from(["image-to-roblox", "-o", "a.json", "--save"]).is_err());
        assert!(Args::try_parse_from(["image-to-roblox", "--timeout", "0"]).is_err());
    }

    #[test]
    fn cli_flags_override_config_defaults() {
        let args = Args::try_parse_from([
            "image-to-roblox",
            "--filter",
            "nearest",
            "--allow-private-network",
        ])
        .expect("args should parse");

        let config = build_config(&args).expect("config should build");

        assert_eq!(config.resize_filter, ResampleFilter::Nearest);
        assert!(config.allow_private_network);
        assert_eq!(config.max_dimension, 512);
    }

    #[test]
    fn unknown_filter_is_a_config_error() {
        let args = Args::try_parse_from(["image-to-roblox", "--filter", "sharp"])
            .expect("args should parse");

        assert!(matches!(build_config(&args), Err(AppError::Convert(_))));
    }

    #[test]
    fn temp_file_name_is_unique_per_process() {
        let tmp = temp_path_for(Path::new("out/roblox-image-data.json"));

        assert_eq!(
            tmp,
            PathBuf::from(format!("out/roblox-image-data.json.{}.tmp", std::process::id()))
        );
    }

    #[test]
    fn write_atomically_replaces_target_without_leftovers() {
        let dir = std::env::temp_dir().join(format!("image-to-roblox-test-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(DEFAULT_OUTPUT_FILE);

        fs::write(&path, b"old").expect("seed file");
        write_atomically(&path, br#"{"Height":1}"#).expect("write should succeed");

        assert_eq!(fs::read(&path).expect("read back"), br#"{"Height":1}"#);
        assert!(!temp_path_for(&path).exists());
        assert_eq!(fs::read_dir(&dir).expect("list temp dir").count(), 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
