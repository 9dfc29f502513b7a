//! # 图片转 Roblox 像素数据：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │        调用方（CLI / 服务 / 批处理）                      │
//! │   文件路径 · 内存字节 · URL · Data URL                    │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ InputSource
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  converter::ImageHandler                                 │
//! │     ├─ loader    下载 / 读取 / 签名校验                  │
//! │     ├─ pipeline  解码为 8 位 RGB（RasterBackend）         │
//! │     └─ extract   单边 ≤ 512 等比缩小 + 行优先展开         │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↓ PixelGrid
//!   {"Height": H, "Width": W, "Pixels": [[R,G,B], ...]}
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`converter`] | 加载、解码、降采样、像素展开与输出格式 |

pub mod converter;
pub mod error;
