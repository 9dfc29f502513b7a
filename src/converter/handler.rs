//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排，不持有任何可变状态。
//! 处理链路固定为：
//! 1. 按来源加载原始字节（异步，可能走网络）
//! 2. 解码为 RGB 图像（阻塞线程池）
//! 3. 按单边上限降采样并展开为像素网格（阻塞线程池）
//!
//! ## 实现思路
//!
//! - 配置在构造时校验，之后只读，单个实例可被多个请求并发复用。
//! - 任一阶段失败都直接返回错误，不产生任何半成品输出。
//! - 记录 `load/decode/extract/total` 阶段耗时，便于性能诊断。

use std::sync::Arc;
use std::time::Instant;

use super::extract::Extractor;
use super::grid::PixelGrid;
use super::pipeline::{DefaultBackend, RasterBackend};
use super::source::{FileInput, ImageSource, InputSource};
use super::{ConvertConfig, ConvertError};

/// 一次成功转换的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// 展示用名称（文件名或 URL 提示）。
    pub file_name: String,
    pub native_width: u32,
    pub native_height: u32,
    pub grid: PixelGrid,
}

/// 图片转换处理器。
pub struct ImageHandler<B = DefaultBackend> {
    pub(super) config: ConvertConfig,
    backend: Arc<B>,
}

impl ImageHandler<DefaultBackend> {
    /// 使用默认后端创建处理器，滤镜取自配置。
    ///
    /// # 示例
    /// ```rust
    /// use image_to_roblox::converter::{ConvertConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ConvertConfig::default())?;
    /// assert_eq!(handler.config().max_dimension, 512);
    /// # Ok::<(), image_to_roblox::converter::ConvertError>(())
    /// ```
    pub fn new(config: ConvertConfig) -> Result<Self, ConvertError> {
        let backend = DefaultBackend::new(config.resize_filter);
        Self::with_backend(config, backend)
    }
}

impl<B> ImageHandler<B> {
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }
}

impl<B: RasterBackend + 'static> ImageHandler<B> {
    /// 使用自定义后端创建处理器。
    pub fn with_backend(config: ConvertConfig, backend: B) -> Result<Self, ConvertError> {
        config.validate()?;
        Ok(Self {
            config,
            backend: Arc::new(backend),
        })
    }

    /// 加载并解码输入，得到可取样的图像。
    pub async fn load(&self, source: InputSource) -> Result<ImageSource, ConvertError> {
        let raw = self.load_raw(source).await?;
        let source_hint = raw.source_hint;

        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let decoded = tokio::task::spawn_blocking(move || backend.decode(&raw.bytes, &config))
            .await
            .map_err(|e| ConvertError::CanvasUnavailable(format!("解码线程异常退出：{}", e)))??;

        let (width, height) = decoded.dimensions();
        log::info!(
            "✅ 图片解码成功 - 来源: {} 原始尺寸: {}x{}",
            source_hint,
            width,
            height
        );

        Ok(decoded)
    }

    /// 从已解码图像提取像素网格。
    pub async fn extract(&self, source: ImageSource) -> Result<PixelGrid, ConvertError> {
        let backend = Arc::clone(&self.backend);
        let max_dim = self.config.max_dimension;

        tokio::task::spawn_blocking(move || Extractor::new(backend, max_dim).extract(&source))
            .await
            .map_err(|e| ConvertError::CanvasUnavailable(format!("提取线程异常退出：{}", e)))?
    }

    /// 处理主入口：按“文件优先，其次 URL”选择输入并完成转换。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use image_to_roblox::converter::{ConvertConfig, ImageHandler};
    ///
    /// # async fn demo() -> Result<(), image_to_roblox::converter::ConvertError> {
    /// let handler = ImageHandler::new(ConvertConfig::default())?;
    /// let conversion = handler
    ///     .convert_request(None, Some("https://example.com/a.png"))
    ///     .await?;
    /// println!("{}", conversion.grid.summary());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn convert_request(
        &self,
        file: Option<FileInput>,
        url: Option<&str>,
    ) -> Result<Conversion, ConvertError> {
        let source = InputSource::select(file, url)?;
        self.convert(source).await
    }

    /// 执行完整链路：加载 → 解码 → 提取。
    pub async fn convert(&self, source: InputSource) -> Result<Conversion, ConvertError> {
        let file_name = source.display_name();
        let total_start = Instant::now();

        let load_start = Instant::now();
        let decoded = self.load(source).await?;
        let load_elapsed = load_start.elapsed();
        let (native_width, native_height) = decoded.dimensions();

        let extract_start = Instant::now();
        let grid = self.extract(decoded).await?;
        let extract_elapsed = extract_start.elapsed();

        log::info!(
            "✅ 图片转换完成 - {} load+decode={}ms extract={}ms total={}ms",
            grid.summary(),
            load_elapsed.as_millis(),
            extract_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(Conversion {
            file_name,
            native_width,
            native_height,
            grid,
        })
    }
}
