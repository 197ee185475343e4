//! 基于目录的项目存储
//!
//! 每个项目 id 对应目录下的一个 `<id>.pcad` 存档。

use crate::archive::{self, Archive};
use crate::error::FileError;
use pipecad_core::collab::ProjectStore;
use pipecad_core::session::SessionData;
use std::fs;
use std::path::{Path, PathBuf};

/// 存档文件扩展名
pub const ARCHIVE_EXTENSION: &str = "pcad";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// 打开存储目录，不存在时创建
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FileError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// id 只允许字母、数字、`-` 和 `_`
    fn path_for(&self, id: &str) -> Result<PathBuf, FileError> {
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(FileError::InvalidFormat(format!("Invalid project id: {:?}", id)));
        }
        Ok(self.root.join(format!("{}.{}", id, ARCHIVE_EXTENSION)))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).map_or(false, |p| p.is_file())
    }

    /// 读取完整存档（含元数据）
    pub fn load_archive(&self, id: &str) -> Result<Archive, FileError> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(FileError::ProjectNotFound(id.to_string()));
        }
        archive::load(&path)
    }

    /// 所有项目 id，按名称排序
    pub fn list(&self) -> Result<Vec<String>, FileError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), FileError> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(FileError::ProjectNotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        tracing::debug!(%id, "Deleted project");
        Ok(())
    }
}

impl ProjectStore for FileStore {
    type Error = FileError;

    fn load(&self, id: &str) -> Result<SessionData, FileError> {
        Ok(self.load_archive(id)?.session)
    }

    /// 已存在的项目保留创建时间，只更新修改时间
    fn save(&mut self, id: &str, data: &SessionData) -> Result<(), FileError> {
        let path = self.path_for(id)?;
        let archive = match self.load_archive(id) {
            Ok(mut existing) => {
                existing.metadata.touch();
                existing.session = data.clone();
                existing
            }
            Err(FileError::ProjectNotFound(_)) => Archive::new(id, data.clone()),
            Err(e) => return Err(e),
        };
        archive::save(&archive, &path)
    }
}
