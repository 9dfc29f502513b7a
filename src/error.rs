//! 统一错误类型模块
//!
//! # 设计思路
//!
//! `converter` 内部只关心转换本身的错误（`ConvertError`）。
//! 命令行还会遇到读配置、写输出、整体超时等问题，统一收敛到 `AppError`，
//! 入口处只需要一个 `?` 与一处错误打印。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ConvertError` / `io::Error` / `serde_json::Error` 提供 `From` 转换，无需手动 map。
//! - `report()` 输出结构化错误，便于脚本调用方按 `code` 分支处理。

use crate::converter::{ConvertError, ErrorReport};

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片转换流水线错误（输入 / 加载 / 解码 / 提取）
    #[error("{0}")]
    Convert(#[from] ConvertError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化或配置文件解析失败
    #[error("JSON 处理失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 调用方设置的整体超时到期
    #[error("转换超时（{0} 秒）")]
    Timeout(u64),
}

impl AppError {
    /// 结构化错误描述。
    pub fn report(&self) -> ErrorReport {
        match self {
            Self::Convert(inner) => ErrorReport::from(inner),
            Self::Io(_) => ErrorReport {
                code: "io",
                stage: "output",
                message: self.to_string(),
            },
            Self::Json(_) => ErrorReport {
                code: "json",
                stage: "output",
                message: self.to_string(),
            },
            Self::Timeout(_) => ErrorReport {
                code: "timeout",
                stage: "load",
                message: self.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::LoadError;

    #[test]
    fn convert_errors_pass_through_unchanged() {
        let error = AppError::from(ConvertError::from(LoadError::FetchFailed("HTTP 500".into())));

        assert_eq!(error.to_string(), "获取失败：HTTP 500");
        assert_eq!(error.report().code, "fetch_failed");
    }

    #[test]
    fn timeout_report_names_load_stage() {
        let report = AppError::Timeout(60).report();

        assert_eq!(report.code, "timeout");
        assert_eq!(report.stage, "load");
        assert!(report.message.contains("60"));
    }
}
