//! # 像素提取模块
//!
//! ## 设计思路
//!
//! 提取分三步：按单边上限计算目标尺寸 → 必要时重采样 → 行优先展开为 RGB 三元组。
//! 只有重采样依赖后端，尺寸策略与展开顺序都是纯函数，可脱离真实解码单独测试。
//!
//! ## 尺寸策略
//!
//! `scale = min(1, max_dim / width, max_dim / height)`，目标宽高向下取整且至少为 1。
//! 这里用整数运算求 `floor(n * max_dim / max(width, height))`，
//! 与实数公式等价，避免浮点误差把 512 算成 511。

use super::grid::PixelGrid;
use super::pipeline::{DefaultBackend, RasterBackend};
use super::source::{ImageSource, PixelSource};
use super::{ConvertError, DEFAULT_MAX_DIMENSION};

/// 降采样目标尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

impl ResizeTarget {
    /// 按单边上限计算目标尺寸，保持宽高比，永不放大。
    ///
    /// # 示例
    /// ```rust
    /// use image_to_roblox::converter::ResizeTarget;
    ///
    /// assert_eq!(ResizeTarget::compute(1000, 500, 512), ResizeTarget { width: 512, height: 256 });
    /// assert_eq!(ResizeTarget::compute(300, 200, 512), ResizeTarget { width: 300, height: 200 });
    /// ```
    pub fn compute(native_width: u32, native_height: u32, max_dim: u32) -> Self {
        let max_dim = max_dim.max(1);
        let longest = native_width.max(native_height);

        if longest <= max_dim {
            return Self {
                width: native_width.max(1),
                height: native_height.max(1),
            };
        }

        let scale = |n: u32| ((n as u64 * max_dim as u64) / longest as u64).max(1) as u32;

        Self {
            width: scale(native_width),
            height: scale(native_height),
        }
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

/// 行优先展开：先第 0 行从左到右，再第 1 行……
pub fn flatten_rows<S: PixelSource + ?Sized>(source: &S) -> Vec<[u8; 3]> {
    let (width, height) = (source.width(), source.height());
    let mut pixels = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        for x in 0..width {
            pixels.push(source.rgb_at(x, y));
        }
    }

    pixels
}

/// 像素提取器：尺寸策略 + 重采样后端。
#[derive(Debug, Clone)]
pub struct Extractor<B = DefaultBackend> {
    backend: B,
    max_dim: u32,
}

impl<B: RasterBackend> Extractor<B> {
    pub fn new(backend: B, max_dim: u32) -> Self {
        Self { backend, max_dim }
    }

    /// 从已解码图像提取像素网格。
    ///
    /// 目标尺寸与原图一致时跳过重采样，逐像素原样输出。
    /// 后端无法执行重采样时返回 `CanvasUnavailable`，展开结果形状不符时返回 `InvalidGrid`。
    pub fn extract(&self, source: &ImageSource) -> Result<PixelGrid, ConvertError> {
        let (native_width, native_height) = source.dimensions();
        let target = ResizeTarget::compute(native_width, native_height, self.max_dim);

        let pixels = if target.matches(native_width, native_height) {
            flatten_rows(source)
        } else {
            log::info!(
                "🧩 降采样：{}x{} -> {}x{}",
                native_width,
                native_height,
                target.width,
                target.height
            );

            let resized = self.backend.resample(source, target)?;
            let (width, height) = resized.dimensions();
            if !target.matches(width, height) {
                return Err(ConvertError::CanvasUnavailable(format!(
                    "后端输出尺寸 {}x{} 与目标 {}x{} 不一致",
                    width, height, target.width, target.height
                )));
            }
            flatten_rows(&resized)
        };

        PixelGrid::new(target.width, target.height, pixels)
    }
}

impl Default for Extractor<DefaultBackend> {
    fn default() -> Self {
        Self::new(DefaultBackend::default(), DEFAULT_MAX_DIMENSION)
    }
}

/// 使用默认后端（双线性）提取像素网格。
pub fn extract(source: &ImageSource, max_dim: u32) -> Result<PixelGrid, ConvertError> {
    Extractor::new(DefaultBackend::default(), max_dim).extract(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 四角颜色各不相同的 2x2 合成图。
    struct Corners;

    impl PixelSource for Corners {
        fn width(&self) -> u32 {
            2
        }

        fn height(&self) -> u32 {
            2
        }

        fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
            match (x, y) {
                (0, 0) => [255, 0, 0],
                (1, 0) => [0, 255, 0],
                (0, 1) => [0, 0, 255],
                _ => [255, 255, 255],
            }
        }
    }

    /// 总是失败的后端，用于验证错误传播。
    struct BrokenBackend;

    impl RasterBackend for BrokenBackend {
        fn decode(
            &self,
            _bytes: &[u8],
            _config: &crate::converter::ConvertConfig,
        ) -> Result<ImageSource, crate::converter::LoadError> {
            Err(crate::converter::LoadError::DecodeFailed("broken".to_string()))
        }

        fn resample(&self, _: &ImageSource, _: ResizeTarget) -> Result<ImageSource, ConvertError> {
            Err(ConvertError::CanvasUnavailable("no surface".to_string()))
        }
    }

    #[test]
    fn flatten_is_row_major() {
        assert_eq!(
            flatten_rows(&Corners),
            vec![[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]]
        );
    }

    #[test]
    fn small_images_are_copied_verbatim() {
        let source = ImageSource::from_fn(2, 2, |x, y| Corners.rgb_at(x, y)).expect("synthetic source");

        let grid = extract(&source, 512).expect("extract should succeed");

        assert_eq!((grid.width(), grid.height()), (2, 2));
        assert_eq!(grid.pixels(), flatten_rows(&Corners).as_slice());
    }

    #[test]
    fn resize_target_matches_documented_scenarios() {
        assert_eq!(ResizeTarget::compute(1000, 500, 512), ResizeTarget { width: 512, height: 256 });
        assert_eq!(ResizeTarget::compute(300, 200, 512), ResizeTarget { width: 300, height: 200 });
        assert_eq!(ResizeTarget::compute(512, 512, 512), ResizeTarget { width: 512, height: 512 });
        assert_eq!(ResizeTarget::compute(500, 1000, 512), ResizeTarget { width: 256, height: 512 });
        assert_eq!(ResizeTarget::compute(3000, 2000, 512), ResizeTarget { width: 512, height: 341 });
    }

    #[test]
    fn resize_target_clamps_degenerate_side_to_one() {
        assert_eq!(ResizeTarget::compute(10_000, 3, 512), ResizeTarget { width: 512, height: 1 });
        assert_eq!(ResizeTarget::compute(1, 9_000, 512), ResizeTarget { width: 1, height: 512 });
    }

    #[test]
    fn large_source_is_downscaled_to_target() {
        let source = ImageSource::from_fn(1000, 500, |x, y| [(x % 256) as u8, (y % 256) as u8, 0])
            .expect("synthetic source");

        let grid = extract(&source, 512).expect("extract should succeed");

        assert_eq!(grid.width(), 512);
        assert_eq!(grid.height(), 256);
        assert_eq!(grid.pixels().len(), 131_072);
    }

    #[test]
    fn extraction_is_deterministic() {
        let source = ImageSource::from_fn(700, 300, |x, y| [(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8])
            .expect("synthetic source");
        let extractor = Extractor::<DefaultBackend>::default();

        let first = extractor.extract(&source).expect("first extract");
        let second = extractor.extract(&source).expect("second extract");

        assert_eq!(first, second);
    }

    #[test]
    fn backend_failure_surfaces_as_canvas_unavailable() {
        let source = ImageSource::from_fn(20, 10, |_, _| [1, 2, 3]).expect("synthetic source");
        let extractor = Extractor::new(BrokenBackend, 8);

        assert!(matches!(
            extractor.extract(&source),
            Err(ConvertError::CanvasUnavailable(_))
        ));
    }

    #[test]
    fn broken_backend_is_not_used_when_no_resize_is_needed() {
        let source = ImageSource::from_fn(4, 4, |_, _| [9, 9, 9]).expect("synthetic source");
        let grid = Extractor::new(BrokenBackend, 8)
            .extract(&source)
            .expect("identity extraction should not touch the backend");

        assert_eq!(grid.pixels().len(), 16);
    }
}
