//! PipeCAD 项目存档（.pcad）
//!
//! 基于 MessagePack + Zstd 的紧凑二进制格式：
//! - 16 字节文件头：魔数、版本、标志位、压缩数据长度（小端）
//! - 之后是 Zstd 压缩的 MessagePack `{metadata, session}`
//!
//! MessagePack 按字段名编码，管段的冗余长度字段在读取时可以被忽略。

use crate::error::FileError;
use chrono::{DateTime, Utc};
use pipecad_core::session::SessionData;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// 文件魔数 "PCAD"
const MAGIC: &[u8; 4] = b"PCAD";

/// 当前存档格式版本
const FORMAT_VERSION: u32 = 1;

/// Zstd 压缩级别
const COMPRESSION_LEVEL: i32 = 3;

/// 文件头长度：魔数 4 + 版本 4 + 保留 4 + 压缩长度 4
const HEADER_LEN: usize = 16;

fn header_bytes(compressed_len: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(MAGIC);
    header[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    // 8..12 保留，写 0
    header[12..].copy_from_slice(&compressed_len.to_le_bytes());
    header
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

/// 校验文件头，返回压缩数据长度
fn check_header(header: &[u8; HEADER_LEN]) -> Result<u64, FileError> {
    if &header[..4] != MAGIC {
        return Err(FileError::InvalidFormat(
            "Invalid magic number, not a PipeCAD archive".to_string(),
        ));
    }
    let version = le_u32(&header[4..8]);
    if version > FORMAT_VERSION {
        return Err(FileError::UnsupportedVersion(format!(
            "Archive version {} is newer than supported version {}",
            version, FORMAT_VERSION
        )));
    }
    Ok(u64::from(le_u32(&header[12..])))
}

/// 项目元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub title: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// 写入存档的程序版本
    pub app_version: String,
}

impl ProjectMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            created: now,
            modified: now,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 更新修改时间
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

/// 存档内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub metadata: ProjectMetadata,
    pub session: SessionData,
}

impl Archive {
    pub fn new(title: impl Into<String>, session: SessionData) -> Self {
        Self {
            metadata: ProjectMetadata::new(title),
            session,
        }
    }
}

/// 编码为存档字节
pub fn encode(archive: &Archive) -> Result<Vec<u8>, FileError> {
    let msgpack_data = rmp_serde::to_vec_named(archive)?;
    let compressed_data = zstd::encode_all(msgpack_data.as_slice(), COMPRESSION_LEVEL)?;

    let compressed_size = u32::try_from(compressed_data.len())
        .map_err(|_| FileError::InvalidFormat("Archive too large".to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed_data.len());
    bytes.extend_from_slice(&header_bytes(compressed_size));
    bytes.extend_from_slice(&compressed_data);
    Ok(bytes)
}

/// 从字节流解码
pub fn decode(reader: &mut impl Read) -> Result<Archive, FileError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let declared = check_header(&header)?;

    // 长度来自文件头，不可信：按实际读到的字节分配
    let mut compressed_data = Vec::new();
    reader.take(declared).read_to_end(&mut compressed_data)?;
    if (compressed_data.len() as u64) < declared {
        return Err(FileError::InvalidFormat(format!(
            "Archive truncated: expected {} bytes, found {}",
            declared,
            compressed_data.len()
        )));
    }

    let msgpack_data = zstd::decode_all(compressed_data.as_slice())?;
    Ok(rmp_serde::from_slice(&msgpack_data)?)
}

/// 保存存档到文件
pub fn save(archive: &Archive, path: &Path) -> Result<(), FileError> {
    let bytes = encode(archive)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} segments, {} components to {} ({} bytes)",
        archive.session.segments.len(),
        archive.session.components.len(),
        path.display(),
        bytes.len()
    );

    Ok(())
}

/// 从文件加载存档
pub fn load(path: &Path) -> Result<Archive, FileError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let archive = decode(&mut reader)?;

    tracing::info!(
        "Loaded {} segments, {} components from {}",
        archive.session.segments.len(),
        archive.session.components.len(),
        path.display()
    );

    Ok(archive)
}
