//! 导入图纸模型
//!
//! 交换格式解析后的只读结构，与会话几何使用相同的坐标类型。每种实体是
//! [`EntityKind`] 的一个变体，包围盒、缩放、居中、颜色解析都对其做穷尽匹配。

use crate::error::DrawingError;
use crate::math::{BoundingBox3, Point3, Vector3};
use crate::palette::{aci_to_color, Color, ACI_BY_BLOCK, ACI_BY_LAYER, ACI_DEFAULT};
use serde::{Deserialize, Serialize};

/// 所有实体共有的属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCommon {
    /// 所属图层
    pub layer: String,
    /// ACI 颜色索引，256 表示随层
    pub color: i32,
    pub visible: bool,
}

impl Default for EntityCommon {
    fn default() -> Self {
        Self {
            layer: "0".to_string(),
            color: ACI_BY_LAYER,
            visible: true,
        }
    }
}

/// 实体几何
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Line {
        start: Point3,
        end: Point3,
    },
    Circle {
        center: Point3,
        radius: f64,
    },
    Arc {
        center: Point3,
        radius: f64,
        /// 起始角度（度）
        start_angle: f64,
        /// 终止角度（度）
        end_angle: f64,
    },
    Polyline {
        vertices: Vec<Point3>,
        closed: bool,
    },
    Text {
        position: Point3,
        content: String,
        height: f64,
        /// 旋转角度（度）
        rotation: f64,
    },
    Insert {
        position: Point3,
        block_name: String,
        /// 旋转角度（度）
        rotation: f64,
        scale: Vector3,
    },
    Dimension {
        points: Vec<Point3>,
    },
}

impl EntityKind {
    /// 交换格式中的类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            EntityKind::Line { .. } => "LINE",
            EntityKind::Circle { .. } => "CIRCLE",
            EntityKind::Arc { .. } => "ARC",
            EntityKind::Polyline { .. } => "POLYLINE",
            EntityKind::Text { .. } => "TEXT",
            EntityKind::Insert { .. } => "INSERT",
            EntityKind::Dimension { .. } => "DIMENSION",
        }
    }

    /// 参与包围盒计算的点
    ///
    /// 圆和弧按整圆计算。文字没有绘制轮廓，不参与。
    pub fn extent_points(&self) -> Vec<Point3> {
        match self {
            EntityKind::Line { start, end } => vec![*start, *end],
            EntityKind::Circle { center, radius } | EntityKind::Arc { center, radius, .. } => {
                let r = radius.abs();
                vec![
                    *center,
                    Point3::new(center.x - r, center.y - r, center.z),
                    Point3::new(center.x + r, center.y + r, center.z),
                ]
            }
            EntityKind::Polyline { vertices, .. } => vertices.clone(),
            EntityKind::Text { .. } => Vec::new(),
            EntityKind::Insert { position, .. } => vec![*position],
            EntityKind::Dimension { points } => points.clone(),
        }
    }

    /// 所有坐标及半径、字高乘以系数
    pub fn scale(&mut self, factor: f64) {
        let s = |p: &mut Point3| *p *= factor;
        match self {
            EntityKind::Line { start, end } => {
                s(start);
                s(end);
            }
            EntityKind::Circle { center, radius } | EntityKind::Arc { center, radius, .. } => {
                s(center);
                *radius *= factor;
            }
            EntityKind::Polyline { vertices, .. } => vertices.iter_mut().for_each(s),
            EntityKind::Text { position, height, .. } => {
                s(position);
                *height *= factor;
            }
            EntityKind::Insert { position, .. } => s(position),
            EntityKind::Dimension { points } => points.iter_mut().for_each(s),
        }
    }

    pub fn translate(&mut self, offset: &Vector3) {
        let t = |p: &mut Point3| *p += offset;
        match self {
            EntityKind::Line { start, end } => {
                t(start);
                t(end);
            }
            EntityKind::Circle { center, .. } | EntityKind::Arc { center, .. } => t(center),
            EntityKind::Polyline { vertices, .. } => vertices.iter_mut().for_each(t),
            EntityKind::Text { position, .. } | EntityKind::Insert { position, .. } => t(position),
            EntityKind::Dimension { points } => points.iter_mut().for_each(t),
        }
    }
}

/// 导入的图纸实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingEntity {
    #[serde(flatten)]
    pub common: EntityCommon,
    pub kind: EntityKind,
}

impl DrawingEntity {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            common: EntityCommon::default(),
            kind,
        }
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.common.layer = layer.into();
        self
    }

    pub fn with_color(mut self, color: i32) -> Self {
        self.common.color = color;
        self
    }

    /// 解析显示颜色：随层时取图层颜色，随块或图层缺失时取默认白色
    pub fn resolve_color(&self, layers: &[Layer]) -> Color {
        match self.common.color {
            ACI_BY_LAYER => {
                let index = layers
                    .iter()
                    .find(|l| l.name == self.common.layer)
                    .map(|l| l.color)
                    .unwrap_or(ACI_DEFAULT);
                aci_to_color(index)
            }
            ACI_BY_BLOCK => aci_to_color(ACI_DEFAULT),
            index => aci_to_color(index),
        }
    }
}

/// 图层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub color: i32,
    pub visible: bool,
    pub frozen: bool,
    pub locked: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: ACI_DEFAULT,
            visible: true,
            frozen: false,
            locked: false,
        }
    }
}

/// 块定义，实体坐标相对于块的基点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub base_point: Point3,
    pub entities: Vec<DrawingEntity>,
}

/// 图纸单位（`$INSUNITS`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Unitless,
    Inches,
    Feet,
    Miles,
    Millimeters,
    Centimeters,
    Meters,
    Kilometers,
    Other(i32),
}

impl Units {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Units::Unitless,
            1 => Units::Inches,
            2 => Units::Feet,
            3 => Units::Miles,
            4 => Units::Millimeters,
            5 => Units::Centimeters,
            6 => Units::Meters,
            7 => Units::Kilometers,
            other => Units::Other(other),
        }
    }

    /// 每个图纸单位对应的米数，无单位或未知时返回 None
    pub fn meters_per_unit(&self) -> Option<f64> {
        match self {
            Units::Inches => Some(0.0254),
            Units::Feet => Some(0.3048),
            Units::Miles => Some(1609.344),
            Units::Millimeters => Some(0.001),
            Units::Centimeters => Some(0.01),
            Units::Meters => Some(1.0),
            Units::Kilometers => Some(1000.0),
            Units::Unitless | Units::Other(_) => None,
        }
    }
}

impl Default for Units {
    fn default() -> Self {
        Units::Meters
    }
}

/// 解析时跳过的实体类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub kind: String,
    pub count: usize,
}

/// 解析后的图纸
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDrawing {
    pub entities: Vec<DrawingEntity>,
    pub layers: Vec<Layer>,
    pub blocks: Vec<Block>,
    /// 没有任何有空间范围的实体时为 None
    pub bounds: Option<BoundingBox3>,
    pub units: Units,
    pub version: String,
    /// 不支持而被跳过的实体（非致命警告）
    pub skipped: Vec<SkippedEntity>,
}

impl ParsedDrawing {
    /// 创建并计算包围盒
    pub fn new(entities: Vec<DrawingEntity>, layers: Vec<Layer>, blocks: Vec<Block>) -> Self {
        let bounds = compute_bounds(&entities);
        Self {
            entities,
            layers,
            blocks,
            bounds,
            units: Units::default(),
            version: "Unknown".to_string(),
            skipped: Vec::new(),
        }
    }

    /// 按系数缩放
    ///
    /// 包围盒直接由原包围盒缩放得到，与重新扫描等价。块内容同样缩放。
    pub fn scaled(&self, factor: f64) -> Result<ParsedDrawing, DrawingError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(DrawingError::InvalidScale(factor));
        }

        let mut out = self.clone();
        for entity in &mut out.entities {
            entity.kind.scale(factor);
        }
        for block in &mut out.blocks {
            block.base_point *= factor;
            for entity in &mut block.entities {
                entity.kind.scale(factor);
            }
        }
        out.bounds = self.bounds.map(|b| b.scaled(factor));
        Ok(out)
    }

    /// 把包围盒的 X/Y 中心移到原点，Z 不变
    ///
    /// 块内容是相对基点的局部坐标，不移动。
    pub fn centered(&self) -> ParsedDrawing {
        let Some(bounds) = self.bounds else {
            return self.clone();
        };

        let center = bounds.center();
        let offset = Vector3::new(-center.x, -center.y, 0.0);

        let mut out = self.clone();
        for entity in &mut out.entities {
            entity.kind.translate(&offset);
        }
        out.bounds = Some(bounds.translated(&offset));
        out
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// 设置图层可见性，图层不存在时返回 false
    pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.layers.iter_mut().find(|l| l.name == name) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    /// 自身可见且所在图层可见（未知图层视为可见）的实体
    pub fn visible_entities(&self) -> impl Iterator<Item = &DrawingEntity> {
        self.entities.iter().filter(move |e| {
            e.common.visible
                && self
                    .layer(&e.common.layer)
                    .map_or(true, |l| l.visible && !l.frozen)
        })
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

/// 图纸坐标（X/Y 平面，Z 向上）转为场景坐标（X/Z 地面，Y 向上）
pub fn plan_to_world(p: &Point3) -> Point3 {
    Point3::new(p.x, p.z, -p.y)
}

/// [`plan_to_world`] 的逆变换
pub fn world_to_plan(p: &Point3) -> Point3 {
    Point3::new(p.x, -p.z, p.y)
}

/// 扫描实体计算包围盒
pub fn compute_bounds(entities: &[DrawingEntity]) -> Option<BoundingBox3> {
    BoundingBox3::from_points(entities.iter().flat_map(|e| e.kind.extent_points()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn sample() -> ParsedDrawing {
        let mut layer = Layer::new("PIPES");
        layer.color = 1;
        let entities = vec![
            DrawingEntity::new(EntityKind::Line {
                start: Point3::new(100.0, 200.0, 0.0),
                end: Point3::new(700.0, 200.0, 0.0),
            })
            .on_layer("PIPES"),
            DrawingEntity::new(EntityKind::Circle {
                center: Point3::new(400.0, 500.0, 10.0),
                radius: 50.0,
            }),
            DrawingEntity::new(EntityKind::Text {
                position: Point3::new(-10_000.0, -10_000.0, 0.0),
                content: "note".to_string(),
                height: 2.5,
                rotation: 0.0,
            })
            .with_color(3),
        ];
        let blocks = vec![Block {
            name: "VALVE".to_string(),
            base_point: Point3::new(1.0, 1.0, 0.0),
            entities: vec![DrawingEntity::new(EntityKind::Line {
                start: Point3::new(0.0, 0.0, 0.0),
                end: Point3::new(10.0, 0.0, 0.0),
            })],
        }];
        ParsedDrawing::new(entities, vec![layer], blocks)
    }

    fn assert_bounds_close(a: &BoundingBox3, b: &BoundingBox3) {
        assert!((a.min - b.min).norm() < TOL, "{:?} != {:?}", a, b);
        assert!((a.max - b.max).norm() < TOL, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_bounds_ignore_text() {
        let drawing = sample();
        let bounds = drawing.bounds.unwrap();
        assert_eq!(bounds.min, Point3::new(100.0, 200.0, 0.0));
        assert_eq!(bounds.max, Point3::new(700.0, 550.0, 10.0));
    }

    #[test]
    fn test_empty_bounds() {
        let drawing = ParsedDrawing::new(Vec::new(), Vec::new(), Vec::new());
        assert!(drawing.bounds.is_none());
        assert_eq!(drawing.centered(), drawing);
    }

    #[test]
    fn test_scale_matches_rescan() {
        let drawing = sample();
        let scaled = drawing.scaled(0.01).unwrap();
        let rescanned = compute_bounds(&scaled.entities).unwrap();
        assert_bounds_close(&scaled.bounds.unwrap(), &rescanned);

        match &scaled.entities[1].kind {
            EntityKind::Circle { radius, .. } => assert!((radius - 0.5).abs() < TOL),
            other => panic!("unexpected {:?}", other),
        }
        match &scaled.entities[2].kind {
            EntityKind::Text { height, .. } => assert!((height - 0.025).abs() < TOL),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(scaled.blocks[0].base_point, Point3::new(0.01, 0.01, 0.0));
        match &scaled.blocks[0].entities[0].kind {
            EntityKind::Line { start, end } => {
                assert_eq!(*start, Point3::origin());
                assert!((end - Point3::new(0.1, 0.0, 0.0)).norm() < TOL);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scale_round_trip() {
        let drawing = sample();
        let back = drawing.scaled(0.01).unwrap().scaled(100.0).unwrap();
        assert_bounds_close(&back.bounds.unwrap(), &drawing.bounds.unwrap());
    }

    #[test]
    fn test_invalid_scale() {
        let drawing = sample();
        assert_eq!(drawing.scaled(0.0), Err(DrawingError::InvalidScale(0.0)));
        assert!(drawing.scaled(-2.0).is_err());
        assert!(drawing.scaled(f64::INFINITY).is_err());
    }

    #[test]
    fn test_center() {
        let drawing = sample();
        let centered = drawing.centered();
        let bounds = centered.bounds.unwrap();
        assert!(((bounds.min.x + bounds.max.x) / 2.0).abs() < TOL);
        assert!(((bounds.min.y + bounds.max.y) / 2.0).abs() < TOL);
        // Z 不变
        assert_eq!(bounds.max.z, 10.0);

        // 包围盒与重新扫描一致
        assert_bounds_close(&bounds, &compute_bounds(&centered.entities).unwrap());

        // 块内容不移动
        assert_eq!(centered.blocks, drawing.blocks);
    }

    #[test]
    fn test_resolve_color() {
        let drawing = sample();
        assert_eq!(drawing.entities[0].resolve_color(&drawing.layers), Color::RED);
        // 图层缺失时取默认白色
        assert_eq!(drawing.entities[1].resolve_color(&drawing.layers), Color::WHITE);
        assert_eq!(drawing.entities[2].resolve_color(&drawing.layers), Color::GREEN);

        // 随块颜色不跟随图层，按默认白色显示
        let by_block = DrawingEntity::new(EntityKind::Line {
            start: Point3::origin(),
            end: Point3::new(1.0, 0.0, 0.0),
        })
        .on_layer("PIPES")
        .with_color(ACI_BY_BLOCK);
        assert_eq!(by_block.resolve_color(&drawing.layers), Color::WHITE);
    }

    #[test]
    fn test_layer_visibility() {
        let mut drawing = sample();
        assert_eq!(drawing.visible_entities().count(), 3);
        assert!(drawing.set_layer_visible("PIPES", false));
        assert_eq!(drawing.visible_entities().count(), 2);
        assert!(!drawing.set_layer_visible("MISSING", false));

        // 冻结图层即使处于打开状态也不显示
        assert!(drawing.set_layer_visible("PIPES", true));
        drawing.layers[0].frozen = true;
        assert!(drawing.layers[0].visible);
        let visible: Vec<_> = drawing.visible_entities().map(|e| e.kind.type_name()).collect();
        assert_eq!(visible, ["CIRCLE", "TEXT"]);
    }

    #[test]
    fn test_plan_world_mapping() {
        let plan = Point3::new(3.0, 4.0, 1.5);
        let world = plan_to_world(&plan);
        assert_eq!(world, Point3::new(3.0, 1.5, -4.0));
        assert_eq!(world_to_plan(&world), plan);
    }

    #[test]
    fn test_units() {
        assert_eq!(Units::from_code(4), Units::Millimeters);
        assert_eq!(Units::from_code(4).meters_per_unit(), Some(0.001));
        assert_eq!(Units::from_code(0).meters_per_unit(), None);
        assert_eq!(Units::from_code(99), Units::Other(99));
        assert_eq!(Units::default(), Units::Meters);
    }
}
