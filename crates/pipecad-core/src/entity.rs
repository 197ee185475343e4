//! 实体标识

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 实体唯一标识符（管段、元件、底图共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// 生成新的随机标识
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 8位短标识，用于捕捉提示等显示场合
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
