//! # 解码与降采样后端
//!
//! ## 设计思路
//!
//! 把“字节 → 图像”和“图像 → 目标尺寸图像”两件事抽象为 `RasterBackend`，
//! 提取逻辑只依赖这个能力接口，测试时可以替换成假的后端。
//!
//! ## 实现思路（`DefaultBackend`）
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素/内存上限快速拒绝
//! 3. 完整解码，按 EXIF 方向摆正
//! 4. 转为 8 位 RGB（丢弃 alpha，高位深量化到 8 位）
//! 5. 降采样交给 `fast_image_resize`，滤镜固定且确定

use fast_image_resize as fr;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use super::extract::ResizeTarget;
use super::source::ImageSource;
use super::{ConvertConfig, ConvertError, LoadError, ResampleFilter};

/// 解码与降采样能力。
///
/// 实现必须是确定的：相同输入得到相同输出。
pub trait RasterBackend: Send + Sync {
    /// 将编码字节解码为 RGB 图像。
    fn decode(&self, bytes: &[u8], config: &ConvertConfig) -> Result<ImageSource, LoadError>;

    /// 将图像重采样到 `target` 尺寸。
    fn resample(
        &self,
        source: &ImageSource,
        target: ResizeTarget,
    ) -> Result<ImageSource, ConvertError>;
}

impl<T: RasterBackend + ?Sized> RasterBackend for Arc<T> {
    fn decode(&self, bytes: &[u8], config: &ConvertConfig) -> Result<ImageSource, LoadError> {
        (**self).decode(bytes, config)
    }

    fn resample(
        &self,
        source: &ImageSource,
        target: ResizeTarget,
    ) -> Result<ImageSource, ConvertError> {
        (**self).resample(source, target)
    }
}

/// 基于 `image` 解码、`fast_image_resize` 降采样的默认后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultBackend {
    filter: ResampleFilter,
}

impl DefaultBackend {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }

    /// 校验像素数量与预计解码内存是否超过配置上限。
    fn validate_decode_limits(
        config: &ConvertConfig,
        width: u32,
        height: u32,
    ) -> Result<(), LoadError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| LoadError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(LoadError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        let estimated = pixels
            .checked_mul(4)
            .ok_or_else(|| LoadError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > config.max_decoded_bytes {
            return Err(LoadError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }

    fn to_resize_alg(filter: ResampleFilter) -> fr::ResizeAlg {
        match filter {
            ResampleFilter::Nearest => fr::ResizeAlg::Nearest,
            ResampleFilter::Bilinear => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
            ResampleFilter::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
            ResampleFilter::Lanczos3 => fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3),
        }
    }
}

impl Default for DefaultBackend {
    fn default() -> Self {
        Self::new(ResampleFilter::Bilinear)
    }
}

impl RasterBackend for DefaultBackend {
    fn decode(&self, bytes: &[u8], config: &ConvertConfig) -> Result<ImageSource, LoadError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| LoadError::DecodeFailed(format!("无法识别图片格式：{}", e)))?;
        if reader.format().is_none() {
            return Err(LoadError::DecodeFailed("不支持的图片格式".to_string()));
        }

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| LoadError::DecodeFailed(format!("无法读取图片头：{}", e)))?;
        let (header_width, header_height) = decoder.dimensions();
        Self::validate_decode_limits(config, header_width, header_height)?;

        // EXIF 方向缺失或损坏时按原样输出。
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

        let mut decoded = DynamicImage::from_decoder(decoder)
            .map_err(|e| LoadError::DecodeFailed(format!("图片解码失败：{}", e)))?;
        decoded.apply_orientation(orientation);

        let (width, height) = decoded.dimensions();
        ImageSource::from_buffer(decoded.to_rgb8())
            .ok_or_else(|| LoadError::DecodeFailed(format!("图片尺寸无效：{}x{}", width, height)))
    }

    fn resample(
        &self,
        source: &ImageSource,
        target: ResizeTarget,
    ) -> Result<ImageSource, ConvertError> {
        let (src_width, src_height) = source.dimensions();

        let src_image =
            fr::images::ImageRef::new(src_width, src_height, source.as_raw(), fr::PixelType::U8x3)
                .map_err(|e| ConvertError::CanvasUnavailable(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target.width, target.height, fr::PixelType::U8x3);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(Self::to_resize_alg(self.filter));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ConvertError::CanvasUnavailable(format!("降采样执行失败：{}", e)))?;

        let rgb = RgbImage::from_raw(target.width, target.height, dst_image.into_vec())
            .ok_or_else(|| ConvertError::CanvasUnavailable("降采样输出缓冲长度异常".to_string()))?;

        ImageSource::from_buffer(rgb)
            .ok_or_else(|| ConvertError::CanvasUnavailable("降采样输出尺寸为 0".to_string()))
    }
}
