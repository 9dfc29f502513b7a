//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 分两层：
//! - `LoadError`：加载/解码阶段（取不到、解不开、读不了、超限）
//! - `ConvertError`：整条转换链路，含“无输入”“后端不可用”“输出形状异常”
//!
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//! `code()` / `stage()` 为稳定标识，供命令行的结构化错误输出使用。

use serde::Serialize;

/// 加载与解码阶段错误。
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// URL 无法获取：网络错误、非 2xx、非图片 Content-Type、超时、被安全策略拦截。
    #[error("获取失败：{0}")]
    FetchFailed(String),

    /// 字节不是可识别/可解码的图片。
    #[error("解码失败：{0}")]
    DecodeFailed(String),

    /// 本地文件不存在或不可读。
    #[error("文件错误：{0}")]
    FileSystem(String),

    /// 超出体积、像素或内存上限。
    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FetchFailed(_) => "fetch_failed",
            Self::DecodeFailed(_) => "decode_failed",
            Self::FileSystem(_) => "file_system",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::DecodeFailed(_) => "decode",
            _ => "load",
        }
    }
}

/// 图片转换统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("未提供输入：请选择文件或填写图片 URL")]
    NoInputProvided,

    #[error(transparent)]
    Load(#[from] LoadError),

    /// 解码/降采样后端无法初始化或执行，仅影响本次请求。
    #[error("渲染后端不可用：{0}")]
    CanvasUnavailable(String),

    /// 输出网格形状不满足 `len(Pixels) == Width * Height`。
    #[error("像素网格异常：{0}")]
    InvalidGrid(String),

    #[error("配置无效：{0}")]
    InvalidConfig(String),
}

impl ConvertError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoInputProvided => "no_input",
            Self::Load(inner) => inner.code(),
            Self::CanvasUnavailable(_) => "canvas_unavailable",
            Self::InvalidGrid(_) => "invalid_grid",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::NoInputProvided | Self::InvalidConfig(_) => "input",
            Self::Load(inner) => inner.stage(),
            Self::CanvasUnavailable(_) | Self::InvalidGrid(_) => "extract",
        }
    }
}

/// 面向调用方的结构化错误。
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub stage: &'static str,
    pub message: String,
}

impl From<&ConvertError> for ErrorReport {
    fn from(error: &ConvertError) -> Self {
        Self {
            code: error.code(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_keep_code_and_stage_through_conversion_error() {
        let error = ConvertError::from(LoadError::DecodeFailed("bad header".to_string()));
        let report = ErrorReport::from(&error);

        assert_eq!(report.code, "decode_failed");
        assert_eq!(report.stage, "decode");
        assert!(report.message.contains("bad header"));

        let fetch = ConvertError::from(LoadError::FetchFailed("HTTP 404".to_string()));
        assert_eq!(fetch.code(), "fetch_failed");
        assert_eq!(fetch.stage(), "load");
    }

    #[test]
    fn report_serializes_as_flat_object() {
        let report = ErrorReport::from(&ConvertError::NoInputProvided);
        let json = serde_json::to_value(&report).expect("report should serialize");

        assert_eq!(json["code"], "no_input");
        assert_eq!(json["stage"], "input");
    }
}
