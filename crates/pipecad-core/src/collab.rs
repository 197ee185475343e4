//! 外部协作方接口
//!
//! 核心不做任何存储或网络访问，这些 trait 由上层实现。

use crate::component::ComponentInstance;
use crate::session::SessionData;
use std::collections::HashMap;

/// 项目持久化
pub trait ProjectStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self, id: &str) -> Result<SessionData, Self::Error>;

    fn save(&mut self, id: &str, data: &SessionData) -> Result<(), Self::Error>;
}

/// 目录条目（只读参考数据）
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub display_name: String,
    pub unit_price: f64,
}

/// 零件目录，按 `catalog_id` 查询
pub trait Catalog {
    fn lookup(&self, catalog_id: u32) -> Option<CatalogEntry>;

    /// 目录名称优先，查不到时用元件自身名称
    fn display_name(&self, component: &ComponentInstance) -> String {
        self.lookup(component.catalog_id)
            .map(|entry| entry.display_name)
            .unwrap_or_else(|| component.name.clone())
    }
}

impl Catalog for HashMap<u32, CatalogEntry> {
    fn lookup(&self, catalog_id: u32) -> Option<CatalogEntry> {
        self.get(&catalog_id).cloned()
    }
}
