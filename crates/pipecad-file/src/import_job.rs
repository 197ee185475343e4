//! 后台导入任务
//!
//! 大文件在阻塞线程池上解析，得到完整的 [`ParsedDrawing`] 后再一次性合并进
//! 会话。任务被取消或丢弃时结果直接作废，会话不会看到任何中间状态。

use crate::dxf_import;
use crate::error::FileError;
use pipecad_core::drawing::ParsedDrawing;
use pipecad_core::entity::EntityId;
use pipecad_core::session::DrawingSession;
use std::path::Path;
use tokio::task::JoinHandle;

/// 正在进行的导入
#[derive(Debug)]
pub struct ImportJob {
    name: String,
    handle: JoinHandle<Result<ParsedDrawing, crate::error::ParseError>>,
    cancelled: bool,
}

impl ImportJob {
    /// 在后台开始解析（需要在 tokio 运行时内调用）
    pub fn spawn(name: impl Into<String>, text: String) -> Self {
        let name = name.into();
        tracing::debug!(%name, bytes = text.len(), "Spawning DXF import");
        let handle = tokio::task::spawn_blocking(move || dxf_import::parse(&text));
        Self {
            name,
            handle,
            cancelled: false,
        }
    }

    /// 读取文件并开始解析
    pub async fn open(path: &Path) -> Result<Self, FileError> {
        let text = tokio::fs::read_to_string(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::spawn(name, text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 放弃导入，之后的 `finish` 和 `merge_into` 都返回 [`FileError::Cancelled`]
    ///
    /// 已经在阻塞线程上运行的解析无法中断，但它的结果会被丢弃。
    pub fn cancel(&mut self) {
        tracing::debug!(name = %self.name, "Import cancelled");
        self.cancelled = true;
        self.handle.abort();
    }

    /// 等待解析完成
    pub async fn finish(self) -> Result<(String, ParsedDrawing), FileError> {
        if self.cancelled {
            return Err(FileError::Cancelled);
        }
        match self.handle.await {
            Ok(result) => Ok((self.name, result?)),
            Err(e) if e.is_cancelled() => Err(FileError::Cancelled),
            Err(e) => Err(FileError::Task(e.to_string())),
        }
    }

    /// 等待解析完成，并作为底图一次性合并进会话
    pub async fn merge_into(self, session: &mut DrawingSession) -> Result<EntityId, FileError> {
        let (name, drawing) = self.finish().await?;
        Ok(session.import_drawing(name, drawing))
    }
}
