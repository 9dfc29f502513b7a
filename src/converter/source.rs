//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `InputSource` 表示外部来源语义（文件 / 字节 / URL / Data URL）
//! - `RawImageData` 表示已加载但未解码的字节
//! - `ImageSource` 表示已解码、可按坐标取样的 RGB 图像
//!
//! 取样能力抽象为 `PixelSource`，提取逻辑只依赖该 trait，
//! 测试可直接构造内存中的合成图像，无需真实解码。

use std::path::{Path, PathBuf};

use image::RgbImage;

use super::ConvertError;

/// URL 来源的展示名。
pub const URL_DISPLAY_NAME: &str = "来自 URL 的图片";

/// 用户选择的文件。
pub enum FileInput {
    /// 本地文件路径。
    Path(PathBuf),
    /// 已在内存中的文件内容，`file_name` 仅用于展示。
    Bytes { bytes: Vec<u8>, file_name: String },
}

/// 图片输入来源。
pub enum InputSource {
    /// 本地文件路径来源。
    FilePath(PathBuf),
    /// 内存字节来源。
    Bytes { bytes: Vec<u8>, file_name: String },
    /// 网络地址来源。
    Url(String),
    /// `data:image/...;base64,` 内联来源。
    DataUrl(String),
}

impl InputSource {
    /// 按“文件优先，其次 URL”的规则选择输入。
    ///
    /// URL 会先去除首尾空白，空字符串视为未提供。
    ///
    /// # 示例
    /// ```rust
    /// use image_to_roblox::converter::{ConvertError, InputSource};
    ///
    /// let source = InputSource::select(None, Some("  https://example.com/a.png "))?;
    /// assert!(matches!(source, InputSource::Url(ref u) if u == "https://example.com/a.png"));
    ///
    /// assert!(matches!(InputSource::select(None, Some("   ")), Err(ConvertError::NoInputProvided)));
    /// # Ok::<(), ConvertError>(())
    /// ```
    pub fn select(file: Option<FileInput>, url: Option<&str>) -> Result<Self, ConvertError> {
        if let Some(file) = file {
            return Ok(match file {
                FileInput::Path(path) => Self::FilePath(path),
                FileInput::Bytes { bytes, file_name } => Self::Bytes { bytes, file_name },
            });
        }

        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Ok(Self::from_url(url)),
            None => Err(ConvertError::NoInputProvided),
        }
    }

    /// 将 URL 字符串归类为普通 URL 或 Data URL。
    pub fn from_url(url: &str) -> Self {
        if url.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:")) {
            Self::DataUrl(url.to_string())
        } else {
            Self::Url(url.to_string())
        }
    }

    /// 展示用名称。
    pub fn display_name(&self) -> String {
        match self {
            Self::FilePath(path) => file_name_of(path),
            Self::Bytes { file_name, .. } => file_name.clone(),
            Self::Url(_) | Self::DataUrl(_) => URL_DISPLAY_NAME.to_string(),
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 可按整数坐标取 RGB 的像素来源。
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// 读取 `(x, y)` 处的 RGB。调用方保证 `x < width && y < height`。
    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3];
}

/// 已解码的 8 位 RGB 图像，宽高均大于 0。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    buffer: RgbImage,
}

impl ImageSource {
    /// 包装已有缓冲；宽或高为 0 时返回 `None`。
    pub fn from_buffer(buffer: RgbImage) -> Option<Self> {
        if buffer.width() == 0 || buffer.height() == 0 {
            return None;
        }
        Some(Self { buffer })
    }

    /// 按坐标函数生成合成图像。
    ///
    /// # 示例
    /// ```rust
    /// use image_to_roblox::converter::{ImageSource, PixelSource};
    ///
    /// let src = ImageSource::from_fn(2, 1, |x, _| [x as u8 * 10, 0, 0]).unwrap();
    /// assert_eq!(src.rgb_at(1, 0), [10, 0, 0]);
    /// ```
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Option<Self>
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        Self::from_buffer(RgbImage::from_fn(width, height, |x, y| image::Rgb(f(x, y))))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// 行优先的 RGB 字节（`width * height * 3`）。
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }
}

impl PixelSource for ImageSource {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_takes_precedence_over_url() {
        let source = InputSource::select(
            Some(FileInput::Path(PathBuf::from("/tmp/cat.png"))),
            Some("https://example.com/dog.png"),
        )
        .expect("file input should be selected");

        assert!(matches!(source, InputSource::FilePath(_)));
        assert_eq!(source.display_name(), "cat.png");
    }

    #[test]
    fn missing_inputs_report_no_input() {
        assert!(matches!(
            InputSource::select(None, None),
            Err(ConvertError::NoInputProvided)
        ));
        assert!(matches!(
            InputSource::select(None, Some("\t\n")),
            Err(ConvertError::NoInputProvided)
        ));
    }

    #[test]
    fn data_urls_are_recognized_case_insensitively() {
        assert!(matches!(
            InputSource::from_url("DATA:image/png;base64,AAAA"),
            InputSource::DataUrl(_)
        ));
        assert!(matches!(InputSource::from_url("http://x/a.png"), InputSource::Url(_)));
        assert_eq!(InputSource::from_url("dat").display_name(), URL_DISPLAY_NAME);
    }

    #[test]
    fn zero_sized_buffers_are_rejected() {
        assert!(ImageSource::from_fn(0, 5, |_, _| [0, 0, 0]).is_none());
        assert!(ImageSource::from_fn(5, 0, |_, _| [0, 0, 0]).is_none());
        assert!(ImageSource::from_fn(1, 1, |_, _| [0, 0, 0]).is_some());
    }
}
