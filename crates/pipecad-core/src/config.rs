//! 编辑器配置

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::snap::SnapSettings;
use serde::{Deserialize, Serialize};

/// 当前绘图工具设置：新管段使用的管径和材质
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub diameter: String,
    pub material: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            diameter: "1/2\"".to_string(),
            material: "copper".to_string(),
        }
    }
}

/// 编辑器配置，可从 JSON 文件加载，缺省字段取默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub snap: SnapSettings,
    pub tools: ToolSettings,
    /// 撤销历史最多保留的快照数
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap: SnapSettings::default(),
            tools: ToolSettings::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
