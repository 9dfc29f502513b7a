//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ConvertConfig`，保证运行时行为可观测、可调整、可测试。
//! 转换核心只认 `max_dimension` 与 `resize_filter` 两个输出相关参数，
//! 其余字段都是加载阶段的安全阈值（体积、超时、内网拦截）。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（单边上限 512，双线性滤镜）。
//! - 通过 `serde(default)` 支持从 JSON 文件局部覆盖。
//! - `validate` 统一做范围校验，命令行与配置文件共用。

use serde::{Deserialize, Serialize};

use super::ConvertError;

/// 输出网格单边最大值。
pub const DEFAULT_MAX_DIMENSION: u32 = 512;

/// 图片转换配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// 输出网格宽/高单边最大值，超过时等比缩小。
    pub max_dimension: u32,
    /// 下载/读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 网络下载超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 下载首包超时时间（毫秒）。
    pub stream_first_byte_timeout_ms: u64,
    /// 下载分块读取超时时间（毫秒）。
    pub stream_chunk_timeout_ms: u64,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 是否允许访问内网或本地地址（默认关闭，防 SSRF）。
    pub allow_private_network: bool,
    /// 是否对域名执行 DNS 解析后再做内网 IP 拦截。
    pub resolve_dns_for_url_safety: bool,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 降采样滤镜。
    pub resize_filter: ResampleFilter,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_file_size: 50 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            stream_first_byte_timeout_ms: 10_000,
            stream_chunk_timeout_ms: 15_000,
            max_redirects: 5,
            allow_private_network: false,
            resolve_dns_for_url_safety: true,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resize_filter: ResampleFilter::Bilinear,
        }
    }
}

impl ConvertConfig {
    /// 校验各字段是否落在允许范围内。
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !(1..=4096).contains(&self.max_dimension) {
            return Err(ConvertError::InvalidConfig(
                "max_dimension 必须在 1~4096 之间".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(ConvertError::InvalidConfig("max_file_size 不能为 0".to_string()));
        }
        if self.max_decoded_bytes < 8 * 1024 * 1024 {
            return Err(ConvertError::InvalidConfig(
                "max_decoded_bytes 不能小于 8MB".to_string(),
            ));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_decoded_pixels 不能为 0".to_string(),
            ));
        }
        if !(1..=120).contains(&self.connect_timeout) {
            return Err(ConvertError::InvalidConfig(
                "connect_timeout 必须在 1~120 秒之间".to_string(),
            ));
        }
        if !(1..=600).contains(&self.download_timeout) {
            return Err(ConvertError::InvalidConfig(
                "download_timeout 必须在 1~600 秒之间".to_string(),
            ));
        }
        if !(500..=120_000).contains(&self.stream_first_byte_timeout_ms) {
            return Err(ConvertError::InvalidConfig(
                "stream_first_byte_timeout_ms 必须在 500~120000 毫秒之间".to_string(),
            ));
        }
        if !(500..=120_000).contains(&self.stream_chunk_timeout_ms) {
            return Err(ConvertError::InvalidConfig(
                "stream_chunk_timeout_ms 必须在 500~120000 毫秒之间".to_string(),
            ));
        }

        Ok(())
    }
}

/// 降采样滤镜。
///
/// 不同滤镜只影响像素取值，不影响输出尺寸与顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    /// 从外部字符串解析滤镜。
    ///
    /// # 示例
    /// ```rust
    /// use image_to_roblox::converter::ResampleFilter;
    ///
    /// let f = ResampleFilter::parse("Bilinear")?;
    /// assert_eq!(f.as_str(), "bilinear");
    /// # Ok::<(), image_to_roblox::converter::ConvertError>(())
    /// ```
    pub fn parse(filter: &str) -> Result<Self, ConvertError> {
        match filter.trim().to_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "bilinear" | "triangle" => Ok(Self::Bilinear),
            "catmull-rom" | "catmullrom" => Ok(Self::CatmullRom),
            "lanczos3" | "lanczos" => Ok(Self::Lanczos3),
            other => Err(ConvertError::InvalidConfig(format!(
                "未知滤镜：{}（可选：nearest / bilinear / catmull-rom / lanczos3）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::CatmullRom => "catmull-rom",
            Self::Lanczos3 => "lanczos3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ConvertConfig::default();
        assert_eq!(config.max_dimension, 512);
        assert_eq!(config.resize_filter, ResampleFilter::Bilinear);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = ConvertConfig::default();
        config.max_dimension = 0;
        assert!(matches!(config.validate(), Err(ConvertError::InvalidConfig(_))));

        let mut config = ConvertConfig::default();
        config.connect_timeout = 0;
        assert!(matches!(config.validate(), Err(ConvertError::InvalidConfig(_))));

        let mut config = ConvertConfig::default();
        config.stream_chunk_timeout_ms = 100;
        assert!(matches!(config.validate(), Err(ConvertError::InvalidConfig(_))));

        let mut config = ConvertConfig::default();
        config.max_decoded_bytes = 1024;
        assert!(matches!(config.validate(), Err(ConvertError::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config: ConvertConfig =
            serde_json::from_str(r#"{"allow_private_network": true, "resize_filter": "catmull-rom"}"#)
                .expect("config json should parse");

        assert!(config.allow_private_network);
        assert_eq!(config.resize_filter, ResampleFilter::CatmullRom);
        assert_eq!(config.max_dimension, DEFAULT_MAX_DIMENSION);
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
    }

    #[test]
    fn filter_parser_accepts_aliases() {
        assert_eq!(ResampleFilter::parse(" NEAREST ").ok(), Some(ResampleFilter::Nearest));
        assert_eq!(ResampleFilter::parse("triangle").ok(), Some(ResampleFilter::Bilinear));
        assert_eq!(ResampleFilter::parse("lanczos").ok(), Some(ResampleFilter::Lanczos3));
        assert!(matches!(
            ResampleFilter::parse("bicubic"),
            Err(ConvertError::InvalidConfig(_))
        ));
    }
}
