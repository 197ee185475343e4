//! 文件操作错误定义

use thiserror::Error;

/// 交换格式解析错误，行号从 1 开始
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Empty input")]
    Empty,

    #[error("Line {line}: invalid group code {code:?}")]
    InvalidGroupCode { line: usize, code: String },

    #[error("Line {line}: missing value after group code {code}")]
    MissingValue { line: usize, code: i32 },

    #[error("Line {line}: invalid numeric value {value:?} for group code {code}")]
    InvalidNumber { line: usize, code: i32, value: String },

    #[error("Unterminated section: {0}")]
    UnterminatedSection(String),

    #[error("No recognizable section found")]
    NoSections,
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DXF error: {0}")]
    Dxf(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Import cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(String),
}
