//! # 图片转换模块（converter）
//!
//! ## 设计思路
//!
//! 该模块将“输入选择 → 加载校验 → 解码 → 尺寸约束降采样 → 行优先展开”
//! 按职责拆分为多个子模块，每一步都返回结果值，不修改任何共享状态。
//!
//! - `handler`：编排整条处理流水线
//! - `loader`：负责 URL/Data URL/文件/字节加载与安全校验
//! - `pipeline`：解码与降采样能力（`RasterBackend`）及默认实现
//! - `extract`：尺寸策略与像素展开
//! - `grid`：输出结构与 JSON 格式
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! 调用方（CLI / 服务）
//!    ↓
//! handler.rs（输入选择 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + URL/体积/签名校验）
//!    ├─ pipeline.rs（解码为 8 位 RGB）
//!    └─ extract.rs（ResizeTarget → 重采样 → 行优先展开）
//!    ↓
//! grid.rs（PixelGrid → {"Height","Width","Pixels"}）
//! ```
//!
//! ## 分层职责建议
//!
//! - 阈值与策略变更优先改 `config.rs`
//! - 输出格式相关只改 `grid.rs`，下游脚本依赖字段名与顺序
//! - 换解码/缩放实现时实现 `RasterBackend`，不要动 `extract.rs` 的尺寸策略

mod config;
mod error;
mod extract;
mod grid;
mod handler;
mod loader;
mod pipeline;
mod source;

pub use config::{ConvertConfig, ResampleFilter, DEFAULT_MAX_DIMENSION};
pub use error::{ConvertError, ErrorReport, LoadError};
pub use extract::{extract, flatten_rows, Extractor, ResizeTarget};
pub use grid::PixelGrid;
pub use handler::{Conversion, ImageHandler};
pub use pipeline::{DefaultBackend, RasterBackend};
pub use source::{FileInput, ImageSource, InputSource, PixelSource, URL_DISPLAY_NAME};
