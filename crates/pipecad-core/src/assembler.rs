//! 管路装配：把待定点折线转换为管段

use crate::config::ToolSettings;
use crate::geometry::PipeSegment;
use crate::math::{distance, Point3, EPSILON};

/// 把相邻待定点两两连成管段
///
/// 少于两个点时返回空。首尾重合的相邻点不产生管段。
pub fn complete_pending_path(points: &[Point3], tools: &ToolSettings) -> Vec<PipeSegment> {
    if points.len() < 2 {
        return Vec::new();
    }

    points
        .windows(2)
        .filter(|pair| distance(&pair[0], &pair[1]) >= EPSILON)
        .map(|pair| PipeSegment::new(pair[0], pair[1], tools.diameter.as_str(), tools.material.as_str()))
        .collect()
}
