//! DXF 导出
//!
//! 把管网写成 DXF：管段为 `PIPES` 图层上的 LINE，元件为 `COMPONENTS`
//! 图层上的 POINT。场景坐标换回图纸平面坐标。

use crate::error::FileError;
use pipecad_core::drawing::world_to_plan;
use pipecad_core::math::Point3;
use pipecad_core::session::SessionData;
use std::io::Write;
use std::path::Path;

pub const PIPE_LAYER: &str = "PIPES";
pub const COMPONENT_LAYER: &str = "COMPONENTS";

/// 图层颜色（ACI）
const PIPE_LAYER_COLOR: u8 = 1;
const COMPONENT_LAYER_COLOR: u8 = 5;

/// 构建 DXF 图纸
pub fn build_drawing(data: &SessionData) -> dxf::Drawing {
    let mut drawing = dxf::Drawing::new();

    for (name, color) in [(PIPE_LAYER, PIPE_LAYER_COLOR), (COMPONENT_LAYER, COMPONENT_LAYER_COLOR)] {
        let mut layer = dxf::tables::Layer::default();
        layer.name = name.to_string();
        layer.color = dxf::Color::from_index(color);
        drawing.add_layer(layer);
    }

    for segment in &data.segments {
        let mut line = dxf::entities::Line::default();
        line.p1 = to_dxf_point(&segment.start());
        line.p2 = to_dxf_point(&segment.end());

        let mut entity = dxf::entities::Entity::new(dxf::entities::EntityType::Line(line));
        entity.common.layer = PIPE_LAYER.to_string();
        drawing.add_entity(entity);
    }

    for component in &data.components {
        let mut point = dxf::entities::ModelPoint::default();
        point.location = to_dxf_point(&component.position);

        let mut entity = dxf::entities::Entity::new(dxf::entities::EntityType::ModelPoint(point));
        entity.common.layer = COMPONENT_LAYER.to_string();
        drawing.add_entity(entity);
    }

    drawing
}

fn to_dxf_point(p: &Point3) -> dxf::Point {
    let plan = world_to_plan(p);
    dxf::Point::new(plan.x, plan.y, plan.z)
}

/// 写入任意输出流
pub fn write(data: &SessionData, writer: &mut impl Write) -> Result<(), FileError> {
    build_drawing(data)
        .save(writer)
        .map_err(|e| FileError::Dxf(e.to_string()))
}

/// 导出到 DXF 文件
pub fn export(data: &SessionData, path: &Path) -> Result<(), FileError> {
    build_drawing(data)
        .save_file(path)
        .map_err(|e| FileError::Dxf(e.to_string()))?;

    tracing::info!(
        "Exported {} segments, {} components to {}",
        data.segments.len(),
        data.components.len(),
        path.display()
    );
    Ok(())
}
