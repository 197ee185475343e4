//! PipeCAD 文件格式处理
//!
//! 支持：
//! - `.dxf` 导入（自带组码解析器）与管网导出
//! - `.pcad` 项目存档（MessagePack + Zstd）
//! - `.json` 项目文件
//! - 后台导入任务与基于目录的项目存储

pub mod archive;
pub mod dxf_export;
pub mod dxf_import;
pub mod dxf_raw;
pub mod error;
pub mod import_job;
pub mod project;
pub mod store;

pub use archive::{Archive, ProjectMetadata};
pub use dxf_import::parse;
pub use error::{FileError, ParseError};
pub use import_job::ImportJob;
pub use store::FileStore;
