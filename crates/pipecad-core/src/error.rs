//! 核心错误定义

use crate::entity::EntityId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrawingError {
    #[error("Invalid scale factor: {0} (must be finite and positive)")]
    InvalidScale(f64),

    #[error("Blueprint not found: {0}")]
    BlueprintNotFound(EntityId),

    #[error("Blueprint is locked: {0}")]
    BlueprintLocked(EntityId),
}
