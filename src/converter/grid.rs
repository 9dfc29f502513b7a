//! # 输出网格
//!
//! 下游脚本按 `{ "Height", "Width", "Pixels" }` 固定结构解析，
//! 字段名大小写与顺序不可改动，`Pixels` 为行优先的 `[R, G, B]` 序列。
//! 构造与反序列化都会校验 `len(Pixels) == Width * Height`。

use serde::{Deserialize, Serialize};

use super::ConvertError;

/// 像素网格。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PixelGridWire")]
pub struct PixelGrid {
    #[serde(rename = "Height")]
    height: u32,
    #[serde(rename = "Width")]
    width: u32,
    #[serde(rename = "Pixels")]
    pixels: Vec<[u8; 3]>,
}

/// 反序列化中转结构，校验通过后才转为 `PixelGrid`。
#[derive(Deserialize)]
struct PixelGridWire {
    #[serde(rename = "Height")]
    height: u32,
    #[serde(rename = "Width")]
    width: u32,
    #[serde(rename = "Pixels")]
    pixels: Vec<[u8; 3]>,
}

impl TryFrom<PixelGridWire> for PixelGrid {
    type Error = ConvertError;

    fn try_from(wire: PixelGridWire) -> Result<Self, Self::Error> {
        Self::new(wire.width, wire.height, wire.pixels)
    }
}

impl PixelGrid {
    /// 构造并校验形状。
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 3]>) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 {
            return Err(ConvertError::InvalidGrid(format!(
                "宽高必须为正：{}x{}",
                width, height
            )));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| ConvertError::InvalidGrid("像素数量溢出".to_string()))?;

        if pixels.len() != expected {
            return Err(ConvertError::InvalidGrid(format!(
                "像素数量 {} 与 {}x{} 不一致",
                pixels.len(),
                width,
                height
            )));
        }

        Ok(Self {
            height,
            width,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }

    /// 按坐标读取像素，越界返回 `None`。
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// 紧凑 JSON（无多余空白）。
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 解析并校验下游格式的 JSON。
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        serde_json::from_str(json).map_err(|e| ConvertError::InvalidGrid(format!("JSON 解析失败：{}", e)))
    }

    /// 完成提示文案，例如 `512×256 • 131,072 pixels`。
    pub fn summary(&self) -> String {
        format!(
            "{}×{} • {} pixels",
            self.width,
            self.height,
            group_thousands(self.pixels.len())
        )
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
