//! 底图：合并进会话的导入图纸

use crate::drawing::{plan_to_world, ParsedDrawing};
use crate::entity::EntityId;
use crate::math::BoundingBox3;
use serde::{Deserialize, Serialize};

/// 新底图的默认不透明度
pub const DEFAULT_OPACITY: f32 = 0.7;

/// 作为绘图参考的导入图纸
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: EntityId,
    pub name: String,
    pub drawing: ParsedDrawing,
    pub visible: bool,
    pub locked: bool,
    /// 0.0 ~ 1.0
    pub opacity: f32,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, drawing: ParsedDrawing) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            drawing,
            visible: true,
            locked: false,
            opacity: DEFAULT_OPACITY,
        }
    }

    /// 图纸的宽高（X/Y 范围），空图纸为 (0, 0)
    pub fn extent(&self) -> (f64, f64) {
        self.drawing
            .bounds
            .map_or((0.0, 0.0), |b| (b.width(), b.height()))
    }

    /// 图纸在场景中占据的范围（X/Z 地面，Y 向上）
    pub fn scene_bounds(&self) -> Option<BoundingBox3> {
        let bounds = self.drawing.bounds?;
        BoundingBox3::from_points([plan_to_world(&bounds.min), plan_to_world(&bounds.max)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{DrawingEntity, EntityKind};
    use crate::math::Point3;

    #[test]
    fn test_scene_bounds() {
        let line = DrawingEntity::new(EntityKind::Line {
            start: Point3::new(1.0, 2.0, 0.0),
            end: Point3::new(5.0, 4.0, 0.5),
        });
        let blueprint = Blueprint::new("plan", ParsedDrawing::new(vec![line], Vec::new(), Vec::new()));
        assert_eq!(blueprint.extent(), (4.0, 2.0));

        let scene = blueprint.scene_bounds().unwrap();
        assert_eq!(scene.min, Point3::new(1.0, 0.0, -4.0));
        assert_eq!(scene.max, Point3::new(5.0, 0.5, -2.0));

        let empty = Blueprint::new("empty", ParsedDrawing::new(Vec::new(), Vec::new(), Vec::new()));
        assert!(empty.scene_bounds().is_none());
        assert_eq!(empty.extent(), (0.0, 0.0));
    }
}
