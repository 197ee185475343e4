//! 撤销/重做历史
//!
//! 线性撤销：每次结构性修改保存一份 `(管段, 元件)` 快照，新快照会丢弃当前
//! 位置之后的所有记录，总数超过上限时淘汰最旧的一份。

use crate::component::ComponentInstance;
use crate::entity::EntityId;
use crate::geometry::PipeSegment;
use std::collections::VecDeque;

/// 默认保留的快照数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// 会话几何状态的独立副本
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub segments: Vec<PipeSegment>,
    pub components: Vec<ComponentInstance>,
}

impl Snapshot {
    pub fn new(segments: &[PipeSegment], components: &[ComponentInstance]) -> Self {
        Self {
            segments: segments.to_vec(),
            components: components.to_vec(),
        }
    }
}

/// 快照历史
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    index: usize,
    limit: usize,
    /// 最近一次可合并编辑的元件
    coalesce_key: Option<EntityId>,
}

impl History {
    /// 以初始状态创建，`limit` 至少为 1
    pub fn new(limit: usize, initial: Snapshot) -> Self {
        let limit = limit.max(1);
        let mut snapshots = VecDeque::with_capacity(limit);
        snapshots.push_back(initial);
        Self {
            snapshots,
            index: 0,
            limit,
            coalesce_key: None,
        }
    }

    /// 丢弃所有记录，只保留给定状态
    pub fn reset(&mut self, initial: Snapshot) {
        self.snapshots.clear();
        self.snapshots.push_back(initial);
        self.index = 0;
        self.coalesce_key = None;
    }

    /// 保存快照
    pub fn save(&mut self, snapshot: Snapshot) {
        self.coalesce_key = None;
        self.push(snapshot);
    }

    /// 保存一次元件编辑的快照
    ///
    /// 同一元件的连续编辑合并为一步：替换栈顶而不是追加。
    pub fn save_coalesced(&mut self, key: EntityId, snapshot: Snapshot) {
        let at_top = self.index + 1 == self.snapshots.len();
        if at_top && self.coalesce_key == Some(key) && self.index > 0 {
            self.snapshots[self.index] = snapshot;
            tracing::debug!(index = self.index, "coalesced component edit into snapshot");
            return;
        }
        self.push(snapshot);
        self.coalesce_key = Some(key);
    }

    fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
        self.index = self.snapshots.len() - 1;
        tracing::debug!(index = self.index, len = self.snapshots.len(), "saved snapshot");
    }

    /// 后退一步，返回要恢复的状态副本；已在最旧快照时返回 None
    pub fn undo(&mut self) -> Option<Snapshot> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.coalesce_key = None;
        tracing::debug!(index = self.index, "undo");
        self.snapshots.get(self.index).cloned()
    }

    /// 前进一步；已在最新快照时返回 None
    pub fn redo(&mut self) -> Option<Snapshot> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        self.coalesce_key = None;
        tracing::debug!(index = self.index, "redo");
        self.snapshots.get(self.index).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, Snapshot::default())
    }
}
