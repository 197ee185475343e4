//! DXF 组码读取
//!
//! DXF 文本由成对的行组成：第一行是组码（数字），第二行是值。
//!
//! ```text
//! 0
//! SECTION
//! 2
//! ENTITIES
//! 0
//! LINE
//! 8
//! PIPES
//! 10
//! 0.0
//! ...
//! 0
//! ENDSEC
//! 0
//! EOF
//! ```
//!
//! 常用组码：
//! - 0: 实体类型 / 段标记
//! - 2: 名称
//! - 8: 图层名
//! - 10, 20, 30: X, Y, Z 坐标
//! - 11, 21, 31: 第二个点
//! - 40, 41, 42...: 浮点数值
//! - 60: 可见性
//! - 62: 颜色
//! - 70: 标志位

use crate::error::ParseError;
use pipecad_core::math::Point3;

/// DXF 组码-值对
#[derive(Debug, Clone, PartialEq)]
pub struct DxfPair {
    pub code: i32,
    pub value: String,
    /// 值所在的行号
    pub line: usize,
}

impl DxfPair {
    pub fn new(code: i32, value: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            value: value.into(),
            line,
        }
    }

    /// 去掉首尾空白的值
    pub fn text(&self) -> &str {
        self.value.trim()
    }

    /// 组码与值同时匹配
    pub fn is(&self, code: i32, value: &str) -> bool {
        self.code == code && self.text() == value
    }

    /// 解析为浮点数
    pub fn as_f64(&self) -> Result<f64, ParseError> {
        self.text()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.invalid_number())
    }

    /// 解析为整数
    ///
    /// 有些导出程序会把整数写成 `1.0`，这里一并接受。
    pub fn as_i32(&self) -> Result<i32, ParseError> {
        let text = self.text();
        if let Ok(v) = text.parse::<i32>() {
            return Ok(v);
        }
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() <= i32::MAX as f64 => Ok(v as i32),
            _ => Err(self.invalid_number()),
        }
    }

    fn invalid_number(&self) -> ParseError {
        ParseError::InvalidNumber {
            line: self.line,
            code: self.code,
            value: self.value.clone(),
        }
    }
}

/// 把文本切分为组码-值对，读到 `0 EOF` 即停止
pub fn tokenize(text: &str) -> Result<Vec<DxfPair>, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut pairs = Vec::new();
    let mut lines = text.lines().enumerate();

    loop {
        // 读取组码
        let Some((index, code_line)) = lines.next() else {
            break;
        };
        let code_text = code_line.trim();

        // 读取值
        let Some((value_index, value_line)) = lines.next() else {
            if code_text.is_empty() {
                break;
            }
            let code = parse_code(code_text, index + 1)?;
            return Err(ParseError::MissingValue { line: index + 1, code });
        };

        let code = parse_code(code_text, index + 1)?;
        let pair = DxfPair::new(code, value_line, value_index + 1);
        let at_eof = pair.is(0, "EOF");
        pairs.push(pair);

        if at_eof {
            break;
        }
    }

    Ok(pairs)
}

fn parse_code(text: &str, line: usize) -> Result<i32, ParseError> {
    text.parse().map_err(|_| ParseError::InvalidGroupCode {
        line,
        code: text.to_string(),
    })
}

/// 组码对的游标
#[derive(Debug, Clone)]
pub struct DxfReader<'a> {
    pairs: &'a [DxfPair],
    position: usize,
}

impl<'a> DxfReader<'a> {
    pub fn new(pairs: &'a [DxfPair]) -> Self {
        Self { pairs, position: 0 }
    }

    /// 当前对（不前进）
    pub fn peek(&self) -> Option<&'a DxfPair> {
        self.pairs.get(self.position)
    }

    /// 前进一步
    pub fn next_pair(&mut self) -> Option<&'a DxfPair> {
        let pair = self.pairs.get(self.position)?;
        self.position += 1;
        Some(pair)
    }

    /// 读取直到下一个组码 0（不含）
    pub fn read_until_zero(&mut self) -> &'a [DxfPair] {
        let start = self.position;
        while let Some(pair) = self.peek() {
            if pair.code == 0 {
                break;
            }
            self.position += 1;
        }
        &self.pairs[start..self.position]
    }
}

/// 一组属性对中按组码查找
pub trait PairsExt {
    fn find_code(&self, code: i32) -> Option<&DxfPair>;

    fn string(&self, code: i32) -> Option<String> {
        self.find_code(code).map(|p| p.text().to_string())
    }

    fn f64_or(&self, code: i32, default: f64) -> Result<f64, ParseError> {
        self.find_code(code).map_or(Ok(default), DxfPair::as_f64)
    }

    fn i32_or(&self, code: i32, default: i32) -> Result<i32, ParseError> {
        self.find_code(code).map_or(Ok(default), DxfPair::as_i32)
    }

    /// 读取以 `base` 为 X 组码的点（Y = base+10, Z = base+20）
    ///
    /// X 和 Y 都缺失时返回 None，缺失的 Z 取 0。
    fn point(&self, base: i32) -> Result<Option<Point3>, ParseError> {
        if self.find_code(base).is_none() && self.find_code(base + 10).is_none() {
            return Ok(None);
        }
        Ok(Some(Point3::new(
            self.f64_or(base, 0.0)?,
            self.f64_or(base + 10, 0.0)?,
            self.f64_or(base + 20, 0.0)?,
        )))
    }
}

impl PairsExt for [DxfPair] {
    fn find_code(&self, code: i32) -> Option<&DxfPair> {
        self.iter().find(|p| p.code == code)
    }
}
