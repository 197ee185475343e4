//! 管段图元
//!
//! 管段只能由管路装配器（[`crate::assembler`]）创建，之后除删除外不可变。
//! 长度始终由端点推导，反序列化时也会重新计算。

use crate::entity::EntityId;
use crate::math::{distance, midpoint, Point3, EPSILON};
use serde::{Deserialize, Serialize};

/// 管段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PipeSegmentRecord")]
pub struct PipeSegment {
    id: EntityId,
    start: Point3,
    end: Point3,
    /// 管径标记，如 `1/2"`
    diameter: String,
    /// 材质标记，如 `copper`
    material: String,
    length: f64,
}

/// 序列化时的原始记录，`length` 字段被忽略
#[derive(Deserialize)]
struct PipeSegmentRecord {
    id: EntityId,
    start: Point3,
    end: Point3,
    diameter: String,
    material: String,
}

impl From<PipeSegmentRecord> for PipeSegment {
    fn from(r: PipeSegmentRecord) -> Self {
        Self::with_id(r.id, r.start, r.end, r.diameter, r.material)
    }
}

impl PipeSegment {
    pub fn new(
        start: Point3,
        end: Point3,
        diameter: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self::with_id(EntityId::new(), start, end, diameter, material)
    }

    pub fn with_id(
        id: EntityId,
        start: Point3,
        end: Point3,
        diameter: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            id,
            start,
            end,
            diameter: diameter.into(),
            material: material.into(),
            length: distance(&start, &end),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn start(&self) -> Point3 {
        self.start
    }

    pub fn end(&self) -> Point3 {
        self.end
    }

    pub fn diameter(&self) -> &str {
        &self.diameter
    }

    pub fn material(&self) -> &str {
        &self.material
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// 修改端点并重新计算长度
    pub fn set_endpoints(&mut self, start: Point3, end: Point3) {
        self.start = start;
        self.end = end;
        self.length = distance(&start, &end);
    }

    pub fn midpoint(&self) -> Point3 {
        midpoint(&self.start, &self.end)
    }

    /// 长度接近零的退化管段
    pub fn is_degenerate(&self) -> bool {
        self.length < EPSILON
    }

    /// 线段上距离给定点最近的点
    pub fn nearest_point(&self, point: &Point3) -> Point3 {
        let v = self.end - self.start;
        let w = point - self.start;

        let c1 = w.dot(&v);
        if c1 <= 0.0 {
            return self.start;
        }

        let c2 = v.dot(&v);
        if c2 <= c1 {
            return self.end;
        }

        self.start + v * (c1 / c2)
    }

    /// 点到线段的距离
    pub fn distance_to_point(&self, point: &Point3) -> f64 {
        distance(point, &self.nearest_point(point))
    }
}
