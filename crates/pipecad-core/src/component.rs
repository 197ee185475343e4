//! 管路元件（阀门、水表、锅炉、弯头）
//!
//! 元件实例归绘图会话独占所有。`catalog_id` 只是外部目录的键，
//! 核心不解析它。

use crate::entity::EntityId;
use crate::math::{distance, Point3, Vector3};
use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 默认的接口吸附阈值（米）
pub const PORT_SNAP_THRESHOLD: f64 = 0.3;

/// 元件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Valve,
    Meter,
    Boiler,
    Elbow,
}

impl ComponentKind {
    /// 放置时使用的默认名称
    pub fn default_name(&self) -> &'static str {
        match self {
            ComponentKind::Valve => "Ball Valve",
            ComponentKind::Meter => "Meter",
            ComponentKind::Boiler => "Boiler",
            ComponentKind::Elbow => "Elbow 90°",
        }
    }

    /// 本地坐标系下的连接接口
    pub fn ports(&self) -> &'static [PortSpec] {
        match self {
            ComponentKind::Boiler => &BOILER_PORTS,
            ComponentKind::Meter => &METER_PORTS,
            ComponentKind::Valve => &VALVE_PORTS,
            ComponentKind::Elbow => &[],
        }
    }
}

/// 接口类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    Input,
    Output,
    Gas,
}

/// 接口定义：名称、类型、相对元件原点的偏移
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSpec {
    pub name: &'static str,
    pub kind: PortKind,
    pub offset: [f64; 3],
}

const BOILER_PORTS: [PortSpec; 3] = [
    PortSpec { name: "cold_in", kind: PortKind::Input, offset: [-0.25, 0.125, 0.0] },
    PortSpec { name: "hot_out", kind: PortKind::Output, offset: [0.25, 0.125, 0.0] },
    PortSpec { name: "gas", kind: PortKind::Gas, offset: [0.0, 0.05, 0.0] },
];

const METER_PORTS: [PortSpec; 2] = [
    PortSpec { name: "input", kind: PortKind::Input, offset: [-0.325, 0.3, 0.0] },
    PortSpec { name: "output", kind: PortKind::Output, offset: [0.325, 0.3, 0.0] },
];

const VALVE_PORTS: [PortSpec; 2] = [
    PortSpec { name: "input", kind: PortKind::Input, offset: [-0.25, 0.0, 0.0] },
    PortSpec { name: "output", kind: PortKind::Output, offset: [0.25, 0.0, 0.0] },
];

/// 世界坐标下的接口
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub component_id: EntityId,
    pub name: &'static str,
    pub kind: PortKind,
    pub position: Point3,
}

/// 元件实例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    pub id: EntityId,
    pub kind: ComponentKind,
    pub position: Point3,
    /// 欧拉角（弧度）：绕 X、Y、Z
    pub rotation: Vector3,
    pub name: String,
    /// 外部目录中的键
    pub catalog_id: u32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ComponentInstance {
    /// 在已捕捉的位置创建元件
    pub fn new(kind: ComponentKind, position: Point3) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            position,
            rotation: Vector3::zeros(),
            name: kind.default_name().to_string(),
            catalog_id: 0,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_catalog_id(mut self, catalog_id: u32) -> Self {
        self.catalog_id = catalog_id;
        self
    }

    /// 世界坐标下的连接接口（先旋转偏移再平移）
    pub fn ports(&self) -> Vec<Port> {
        let rot = Rotation3::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z);
        self.kind
            .ports()
            .iter()
            .map(|spec| Port {
                component_id: self.id,
                name: spec.name,
                kind: spec.kind,
                position: self.position + rot * Vector3::from(spec.offset),
            })
            .collect()
    }

    /// 应用属性修改
    pub fn apply(&mut self, patch: ComponentPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(properties) = patch.properties {
            self.properties.extend(properties);
        }
    }
}

/// 元件的原地修改（重命名、数值输入移动等）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentPatch {
    pub name: Option<String>,
    pub position: Option<Point3>,
    pub rotation: Option<Vector3>,
    /// 合并进现有属性表
    pub properties: Option<BTreeMap<String, String>>,
}

impl ComponentPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn move_to(position: Point3) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }
}

/// 查找距离小于阈值的第一个元件接口
pub fn find_nearby_port(
    point: &Point3,
    components: &[ComponentInstance],
    threshold: f64,
) -> Option<Port> {
    components
        .iter()
        .flat_map(|c| c.ports())
        .find(|port| distance(point, &port.position) < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    #[test]
    fn test_default_names() {
        let c = ComponentInstance::new(ComponentKind::Valve, Point3::origin());
        assert_eq!(c.name, "Ball Valve");
        assert_eq!(c.catalog_id, 0);
        assert!(c.properties.is_empty());
    }

    #[test]
    fn test_ports_translated() {
        let meter = ComponentInstance::new(ComponentKind::Meter, Point3::new(1.0, 0.0, 2.0));
        let ports = meter.ports();
        assert_eq!(ports.len(), 2);
        assert!((ports[0].position - Point3::new(0.675, 0.3, 2.0)).norm() < EPSILON);
        assert_eq!(ports[1].kind, PortKind::Output);

        let elbow = ComponentInstance::new(ComponentKind::Elbow, Point3::origin());
        assert!(elbow.ports().is_empty());
    }

    #[test]
    fn test_ports_rotated() {
        let mut valve = ComponentInstance::new(ComponentKind::Valve, Point3::origin());
        // 绕 Y 轴旋转 90°，X 方向的接口转到 Z 方向
        valve.rotation = Vector3::new(0.0, std::f64::consts::FRAC_PI_2, 0.0);
        let ports = valve.ports();
        assert!(ports[0].position.x.abs() < 1e-9);
        assert!((ports[0].position.z.abs() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_find_nearby_port() {
        let boiler = ComponentInstance::new(ComponentKind::Boiler, Point3::origin());
        let comps = vec![boiler];

        let port = find_nearby_port(&Point3::new(0.3, 0.1, 0.0), &comps, PORT_SNAP_THRESHOLD).unwrap();
        assert_eq!(port.name, "hot_out");

        assert!(find_nearby_port(&Point3::new(5.0, 0.0, 0.0), &comps, PORT_SNAP_THRESHOLD).is_none());
    }

    #[test]
    fn test_apply_patch() {
        let mut c = ComponentInstance::new(ComponentKind::Boiler, Point3::origin());
        c.apply(ComponentPatch::rename("Kitchen boiler"));
        assert_eq!(c.name, "Kitchen boiler");
        assert_eq!(c.position, Point3::origin());

        let mut props = BTreeMap::new();
        props.insert("capacity".to_string(), "24kW".to_string());
        c.apply(ComponentPatch {
            position: Some(Point3::new(1.0, 0.0, 1.0)),
            properties: Some(props),
            ..Default::default()
        });
        assert_eq!(c.position, Point3::new(1.0, 0.0, 1.0));
        assert_eq!(c.properties.get("capacity").map(String::as_str), Some("24kW"));
        assert_eq!(c.name, "Kitchen boiler");
    }
}
