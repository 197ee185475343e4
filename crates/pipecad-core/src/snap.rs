//! 对象捕捉
//!
//! 给定原始指针位置和当前几何，求出修正后的点及捕捉信息。
//!
//! 支持的捕捉类型（按优先级从高到低）：
//! - 端点 (Endpoint)
//! - 元件中心 (Center)
//! - 中点 (Midpoint)
//! - 交点 (Intersection)
//! - 垂足 (Perpendicular)，保留，暂不产生候选
//! - 网格点 (Grid)
//!
//! 求解器是纯函数，每次指针移动和每次点击各调用一次。交点搜索对管段数
//! 是 O(n²)，编辑器规模（几十到几百根管段）下可以接受。

use crate::component::ComponentInstance;
use crate::geometry::PipeSegment;
use crate::math::{distance, is_finite, Point3, EPSILON};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 捕捉类型，声明顺序即优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapKind {
    Endpoint,
    Center,
    Midpoint,
    Intersection,
    Perpendicular,
    Grid,
}

impl SnapKind {
    /// 获取捕捉类型的名称
    pub fn name(&self) -> &'static str {
        match self {
            SnapKind::Endpoint => "Endpoint",
            SnapKind::Center => "Center",
            SnapKind::Midpoint => "Midpoint",
            SnapKind::Intersection => "Intersection",
            SnapKind::Perpendicular => "Perpendicular",
            SnapKind::Grid => "Grid",
        }
    }
}

/// 捕捉设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// 总开关
    pub enabled: bool,
    pub endpoint: bool,
    pub midpoint: bool,
    pub intersection: bool,
    /// 保留
    pub perpendicular: bool,
    pub center: bool,
    pub grid: bool,
    /// 捕捉半径（米）
    pub radius: f64,
    /// 网格间距（米）
    pub grid_size: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: true,
            midpoint: true,
            intersection: true,
            perpendicular: false,
            center: true,
            grid: true,
            radius: 0.5,
            grid_size: 1.0,
        }
    }
}

impl SnapSettings {
    pub fn is_enabled(&self, kind: SnapKind) -> bool {
        match kind {
            SnapKind::Endpoint => self.endpoint,
            SnapKind::Center => self.center,
            SnapKind::Midpoint => self.midpoint,
            SnapKind::Intersection => self.intersection,
            SnapKind::Perpendicular => self.perpendicular,
            SnapKind::Grid => self.grid,
        }
    }

    pub fn set(&mut self, kind: SnapKind, enabled: bool) {
        let flag = match kind {
            SnapKind::Endpoint => &mut self.endpoint,
            SnapKind::Center => &mut self.center,
            SnapKind::Midpoint => &mut self.midpoint,
            SnapKind::Intersection => &mut self.intersection,
            SnapKind::Perpendicular => &mut self.perpendicular,
            SnapKind::Grid => &mut self.grid,
        };
        *flag = enabled;
    }

    pub fn toggle(&mut self, kind: SnapKind) {
        let enabled = self.is_enabled(kind);
        self.set(kind, !enabled);
    }
}

/// 捕捉候选点，每次查询临时生成
#[derive(Debug, Clone, PartialEq)]
pub struct SnapCandidate {
    pub point: Point3,
    pub kind: SnapKind,
    /// 到查询点的距离
    pub distance: f64,
    /// 来源描述，如 "Pipe 1a2b3c4d start"
    pub reference: String,
}

impl SnapCandidate {
    pub fn new(point: Point3, kind: SnapKind, distance: f64, reference: impl Into<String>) -> Self {
        Self {
            point,
            kind,
            distance,
            reference: reference.into(),
        }
    }

    /// 先按优先级，再按距离
    fn rank(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.distance.total_cmp(&other.distance))
    }
}

/// 求解捕捉点
///
/// 返回修正后的点；没有可用候选时返回原始点和 `None`。
pub fn resolve(
    point: Point3,
    segments: &[PipeSegment],
    components: &[ComponentInstance],
    settings: &SnapSettings,
) -> (Point3, Option<SnapCandidate>) {
    if !settings.enabled || !is_finite(&point) {
        return (point, None);
    }

    let candidates = collect_candidates(&point, segments, components, settings);

    let Some(best) = candidates.iter().min_by(|a, b| a.rank(b)) else {
        return (point, None);
    };

    // 网格以外的候选必须在半径内，否则退回网格
    if best.kind != SnapKind::Grid && best.distance > settings.radius {
        return match candidates.iter().find(|c| c.kind == SnapKind::Grid) {
            Some(grid) if settings.grid => (grid.point, Some(grid.clone())),
            _ => (point, None),
        };
    }

    tracing::trace!(
        kind = best.kind.name(),
        distance = best.distance,
        "snapped to {}",
        best.reference
    );
    (best.point, Some(best.clone()))
}

/// 收集所有启用类型的候选点
pub fn collect_candidates(
    point: &Point3,
    segments: &[PipeSegment],
    components: &[ComponentInstance],
    settings: &SnapSettings,
) -> Vec<SnapCandidate> {
    let mut candidates = Vec::new();
    if !settings.enabled || !is_finite(point) {
        return candidates;
    }

    let radius = settings.radius;

    if settings.endpoint {
        collect_endpoints(&mut candidates, point, segments, radius);
    }
    if settings.center {
        collect_centers(&mut candidates, point, components, radius);
    }
    if settings.midpoint {
        collect_midpoints(&mut candidates, point, segments, radius);
    }
    if settings.intersection {
        collect_intersections(&mut candidates, point, segments, radius);
    }
    if settings.grid {
        candidates.extend(snap_to_grid(point, settings.grid_size));
    }

    candidates
}

fn collect_endpoints(out: &mut Vec<SnapCandidate>, mouse: &Point3, segments: &[PipeSegment], radius: f64) {
    for seg in segments.iter().filter(|s| !s.is_degenerate()) {
        for (p, label) in [(seg.start(), "start"), (seg.end(), "end")] {
            let dist = distance(mouse, &p);
            if dist <= radius {
                out.push(SnapCandidate::new(
                    p,
                    SnapKind::Endpoint,
                    dist,
                    format!("Pipe {} {}", seg.id().short(), label),
                ));
            }
        }
    }
}

fn collect_centers(
    out: &mut Vec<SnapCandidate>,
    mouse: &Point3,
    components: &[ComponentInstance],
    radius: f64,
) {
    for comp in components {
        let dist = distance(mouse, &comp.position);
        if dist <= radius {
            out.push(SnapCandidate::new(
                comp.position,
                SnapKind::Center,
                dist,
                format!("{} center", comp.name),
            ));
        }
    }
}

fn collect_midpoints(out: &mut Vec<SnapCandidate>, mouse: &Point3, segments: &[PipeSegment], radius: f64) {
    for seg in segments.iter().filter(|s| !s.is_degenerate()) {
        let mid = seg.midpoint();
        let dist = distance(mouse, &mid);
        if dist <= radius {
            out.push(SnapCandidate::new(
                mid,
                SnapKind::Midpoint,
                dist,
                format!("Pipe {} midpoint", seg.id().short()),
            ));
        }
    }
}

fn collect_intersections(
    out: &mut Vec<SnapCandidate>,
    mouse: &Point3,
    segments: &[PipeSegment],
    radius: f64,
) {
    // 双重循环检查所有管段对
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let Some(p) = segment_intersection_xz(&segments[i], &segments[j]) else {
                continue;
            };
            let dist = distance(mouse, &p);
            if dist <= radius {
                out.push(SnapCandidate::new(p, SnapKind::Intersection, dist, "Intersection"));
            }
        }
    }
}

/// 网格捕捉：X/Y/Z 各自四舍五入到网格间距的整数倍，不受距离限制
pub fn snap_to_grid(point: &Point3, grid_size: f64) -> Option<SnapCandidate> {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return None;
    }

    let round = |v: f64| (v / grid_size).round() * grid_size;
    let grid_point = Point3::new(round(point.x), round(point.y), round(point.z));
    if !is_finite(&grid_point) {
        return None;
    }

    let dist = distance(point, &grid_point);
    Some(SnapCandidate::new(
        grid_point,
        SnapKind::Grid,
        dist,
        format!("Grid ({:.1}, {:.1})", grid_point.x, grid_point.z),
    ))
}

/// 两管段在 X/Z 平面上的交点（参数法）
///
/// 只接受两个参数都在 `[0, 1]` 内的真正线段交点。平行或退化的管段返回
/// `None`。交点的 Y 沿第一根管段插值。
pub fn segment_intersection_xz(a: &PipeSegment, b: &PipeSegment) -> Option<Point3> {
    if a.is_degenerate() || b.is_degenerate() {
        return None;
    }

    let (p1, p2, p3, p4) = (a.start(), a.end(), b.start(), b.end());

    let denom = (p4.z - p3.z) * (p2.x - p1.x) - (p4.x - p3.x) * (p2.z - p1.z);
    if denom.abs() < EPSILON {
        return None;
    }

    let ua = ((p4.x - p3.x) * (p1.z - p3.z) - (p4.z - p3.z) * (p1.x - p3.x)) / denom;
    let ub = ((p2.x - p1.x) * (p1.z - p3.z) - (p2.z - p1.z) * (p1.x - p3.x)) / denom;

    if !(0.0..=1.0).contains(&ua) || !(0.0..=1.0).contains(&ub) {
        return None;
    }

    let p = p1 + (p2 - p1) * ua;
    is_finite(&p).then_some(p)
}
