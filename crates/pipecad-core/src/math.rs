//! 数学基础类型
//!
//! 基于 nalgebra，所有坐标单位为米。Y 轴朝上，地面平面为 X/Z。

use serde::{Deserialize, Serialize};

pub type Point3 = nalgebra::Point3<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;

/// 几何比较容差
pub const EPSILON: f64 = 1e-9;

/// 两点之间的欧氏距离
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    (b - a).norm()
}

/// 两点的中点
pub fn midpoint(a: &Point3, b: &Point3) -> Point3 {
    nalgebra::center(a, b)
}

/// 点的所有分量是否为有限值
pub fn is_finite(p: &Point3) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

/// 轴对齐包围盒（3D）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// 从点集构造，空点集返回 None
    pub fn from_points<I: IntoIterator<Item = Point3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first, first);
        for p in iter {
            bbox.include(&p);
        }
        Some(bbox)
    }

    /// 扩展以包含一个点
    pub fn include(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn center(&self) -> Point3 {
        midpoint(&self.min, &self.max)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// 以原点为中心缩放，系数须为正
    pub fn scaled(&self, factor: f64) -> Self {
        debug_assert!(factor > 0.0);
        Self::new(self.min * factor, self.max * factor)
    }

    pub fn translated(&self, offset: &Vector3) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 0.0, 4.0);
        assert!((distance(&a, &b) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_bbox_from_points() {
        assert!(BoundingBox3::from_points(std::iter::empty()).is_none());

        let bbox = BoundingBox3::from_points([
            Point3::new(1.0, -2.0, 0.0),
            Point3::new(-3.0, 4.0, 2.0),
        ])
        .unwrap();
        assert_eq!(bbox.min, Point3::new(-3.0, -2.0, 0.0));
        assert_eq!(bbox.max, Point3::new(1.0, 4.0, 2.0));
        assert_eq!(bbox.center(), Point3::new(-1.0, 1.0, 1.0));
    }

    #[test]
    fn test_bbox_scaled() {
        let bbox = BoundingBox3::new(Point3::new(-1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 0.0));
        let s = bbox.scaled(0.5);
        assert_eq!(s.min, Point3::new(-0.5, 0.0, 0.0));
        assert_eq!(s.max, Point3::new(1.0, 0.5, 0.0));
        assert_eq!(s.width(), 1.5);
    }
}
