//! PipeCAD 核心绘图引擎
//!
//! 提供管段与元件几何、捕捉求解、路径组装、快照撤销历史和导入图纸模型。
//!
//! # 架构设计
//!
//! 状态集中在显式持有的 [`session::DrawingSession`] 中，所有修改由离散输入
//! 事件驱动：
//! - `snap`: 从原始指针位置求出最佳捕捉点（纯函数）
//! - `assembler`: 把待定点转成管段（纯函数）
//! - `history`: 有上限的线性快照历史
//! - `drawing` / `blueprint`: 导入图纸及其缩放、居中
//!
//! # 示例
//!
//! ```rust
//! use pipecad_core::prelude::*;
//!
//! let session = DrawingSession::default()
//!     .apply(SessionEvent::SetMode(Mode::DrawPipe))
//!     .apply(SessionEvent::Click(Point3::new(0.0, 0.0, 0.0)))
//!     .apply(SessionEvent::Click(Point3::new(3.0, 0.0, 4.0)))
//!     .apply(SessionEvent::CompletePath);
//!
//! assert_eq!(session.segments().len(), 1);
//! println!("Length: {}", session.segments()[0].length());
//! ```

pub mod assembler;
pub mod blueprint;
pub mod collab;
pub mod component;
pub mod config;
pub mod drawing;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod history;
pub mod math;
pub mod palette;
pub mod session;
pub mod snap;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::blueprint::Blueprint;
    pub use crate::collab::{Catalog, CatalogEntry, ProjectStore};
    pub use crate::component::{ComponentInstance, ComponentKind, ComponentPatch, Port, PortKind};
    pub use crate::config::{EditorConfig, ToolSettings};
    pub use crate::drawing::{Block, DrawingEntity, EntityKind, Layer, ParsedDrawing, Units};
    pub use crate::entity::EntityId;
    pub use crate::error::DrawingError;
    pub use crate::geometry::PipeSegment;
    pub use crate::history::{History, Snapshot};
    pub use crate::math::{BoundingBox3, Point3, Vector3};
    pub use crate::palette::Color;
    pub use crate::session::{DrawingSession, Mode, SessionData, SessionEvent, SessionView};
    pub use crate::snap::{SnapCandidate, SnapKind, SnapSettings};
}
