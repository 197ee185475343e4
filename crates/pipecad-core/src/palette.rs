//! AutoCAD 颜色索引 (ACI) 调色板

use serde::{Deserialize, Serialize};
use std::fmt;

/// ByLayer 颜色索引
pub const ACI_BY_LAYER: i32 = 256;
/// ByBlock 颜色索引
pub const ACI_BY_BLOCK: i32 = 0;
/// 默认颜色索引（白）
pub const ACI_DEFAULT: i32 = 7;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const LIGHT_GRAY: Color = Color::rgb(192, 192, 192);
    pub const DARK: Color = Color::rgb(51, 51, 51);
    /// 未知索引的中性回退色
    pub const NEUTRAL: Color = Color::rgb(136, 136, 136);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB` 形式
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// ACI 转 RGB，未知索引返回中性色
pub fn aci_to_color(index: i32) -> Color {
    match index {
        1 => Color::RED,
        2 => Color::YELLOW,
        3 => Color::GREEN,
        4 => Color::CYAN,
        5 => Color::BLUE,
        6 => Color::MAGENTA,
        7 => Color::WHITE,
        8 => Color::GRAY,
        9 => Color::LIGHT_GRAY,
        250 => Color::DARK,
        _ => Color::NEUTRAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(aci_to_color(1), Color::RED);
        assert_eq!(aci_to_color(250).to_hex(), "#333333");
        assert_eq!(aci_to_color(42), Color::NEUTRAL);
        assert_eq!(aci_to_color(-3).to_hex(), "#888888");
    }
}
