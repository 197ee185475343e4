//! DXF 导入
//!
//! 把 DXF 文本解析为 [`ParsedDrawing`]。支持 HEADER（版本、单位）、
//! TABLES（图层）、BLOCKS 和 ENTITIES 段，其他段整体跳过。
//!
//! 解析是全有或全无的：任何格式错误都返回 [`ParseError`]，不会产生部分结果。
//! 不支持的实体类型只记为跳过警告。

use crate::dxf_raw::{tokenize, DxfPair, DxfReader, PairsExt};
use crate::error::ParseError;
use pipecad_core::drawing::{Block, DrawingEntity, EntityKind, Layer, ParsedDrawing, SkippedEntity, Units};
use pipecad_core::math::{Point3, Vector3};
use pipecad_core::palette::{ACI_BY_LAYER, ACI_DEFAULT};
use std::collections::BTreeMap;

/// 解析 DXF 文本
pub fn parse(text: &str) -> Result<ParsedDrawing, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let pairs = tokenize(text)?;
    let mut reader = DxfReader::new(&pairs);
    let mut state = ImportState::default();
    let mut sections = 0usize;

    while let Some(pair) = reader.next_pair() {
        if pair.is(0, "EOF") {
            break;
        }
        if !pair.is(0, "SECTION") {
            continue;
        }

        let name = match reader.peek() {
            Some(p) if p.code == 2 => {
                reader.next_pair();
                p.text().to_string()
            }
            _ => String::new(),
        };
        sections += 1;

        match name.as_str() {
            "HEADER" => parse_header(&mut reader, &mut state)?,
            "TABLES" => parse_tables(&mut reader, &mut state)?,
            "BLOCKS" => parse_blocks(&mut reader, &mut state)?,
            "ENTITIES" => {
                let entities = parse_entity_list(&mut reader, "ENDSEC", &name, &mut state)?;
                state.entities.extend(entities);
            }
            _ => skip_section(&mut reader, &name)?,
        }
    }

    if sections == 0 {
        return Err(ParseError::NoSections);
    }

    Ok(state.finish())
}

/// 解析过程中累积的数据
#[derive(Default)]
struct ImportState {
    version: Option<String>,
    units: Option<Units>,
    layers: Vec<Layer>,
    blocks: Vec<Block>,
    entities: Vec<DrawingEntity>,
    skipped: BTreeMap<String, usize>,
}

impl ImportState {
    fn skip(&mut self, kind: &str) {
        *self.skipped.entry(kind.to_string()).or_default() += 1;
    }

    fn finish(self) -> ParsedDrawing {
        let skipped: Vec<SkippedEntity> = self
            .skipped
            .into_iter()
            .map(|(kind, count)| SkippedEntity { kind, count })
            .collect();

        for s in &skipped {
            tracing::warn!(kind = %s.kind, count = s.count, "Skipped unsupported entity type");
        }

        let mut drawing = ParsedDrawing::new(self.entities, self.layers, self.blocks);
        drawing.units = self.units.unwrap_or_default();
        if let Some(version) = self.version {
            drawing.version = version;
        }
        drawing.skipped = skipped;

        tracing::debug!(
            entities = drawing.entities.len(),
            layers = drawing.layers.len(),
            blocks = drawing.blocks.len(),
            version = %drawing.version,
            "Parsed DXF"
        );
        drawing
    }
}

fn next_in_section<'a>(reader: &mut DxfReader<'a>, section: &str) -> Result<&'a DxfPair, ParseError> {
    match reader.next_pair() {
        Some(pair) if pair.is(0, "EOF") => Err(ParseError::UnterminatedSection(section.to_string())),
        Some(pair) => Ok(pair),
        None => Err(ParseError::UnterminatedSection(section.to_string())),
    }
}

fn skip_section(reader: &mut DxfReader<'_>, section: &str) -> Result<(), ParseError> {
    loop {
        if next_in_section(reader, section)?.is(0, "ENDSEC") {
            return Ok(());
        }
    }
}

// ========== HEADER ==========

fn parse_header(reader: &mut DxfReader<'_>, state: &mut ImportState) -> Result<(), ParseError> {
    let mut variable = String::new();
    loop {
        let pair = next_in_section(reader, "HEADER")?;
        match pair.code {
            0 if pair.text() == "ENDSEC" => return Ok(()),
            9 => variable = pair.text().to_string(),
            1 if variable == "$ACADVER" => state.version = Some(pair.text().to_string()),
            70 if variable == "$INSUNITS" => state.units = Some(Units::from_code(pair.as_i32()?)),
            _ => {}
        }
    }
}

// ========== TABLES ==========

fn parse_tables(reader: &mut DxfReader<'_>, state: &mut ImportState) -> Result<(), ParseError> {
    loop {
        let pair = next_in_section(reader, "TABLES")?;
        if pair.code != 0 {
            continue;
        }
        match pair.text() {
            "ENDSEC" => return Ok(()),
            "LAYER" => {
                let attrs = reader.read_until_zero();
                state.layers.push(layer_from(attrs)?);
            }
            _ => {}
        }
    }
}

/// 颜色为负表示图层关闭；标志位 1 冻结，4 锁定
fn layer_from(attrs: &[DxfPair]) -> Result<Layer, ParseError> {
    let mut layer = Layer::new(attrs.string(2).unwrap_or_else(|| "0".to_string()));
    let color = attrs.i32_or(62, ACI_DEFAULT)?;
    let flags = attrs.i32_or(70, 0)?;
    layer.color = color.abs();
    layer.visible = color >= 0;
    layer.frozen = flags & 1 != 0;
    layer.locked = flags & 4 != 0;
    Ok(layer)
}

// ========== BLOCKS ==========

fn parse_blocks(reader: &mut DxfReader<'_>, state: &mut ImportState) -> Result<(), ParseError> {
    loop {
        let pair = next_in_section(reader, "BLOCKS")?;
        if pair.code != 0 {
            continue;
        }
        match pair.text() {
            "ENDSEC" => return Ok(()),
            "BLOCK" => {
                let attrs = reader.read_until_zero();
                let name = attrs.string(2).unwrap_or_default();
                let base_point = attrs.point(10)?.unwrap_or_else(Point3::origin);
                let entities = parse_entity_list(reader, "ENDBLK", "BLOCKS", state)?;
                // ENDBLK 自身的属性
                reader.read_until_zero();
                state.blocks.push(Block {
                    name,
                    base_point,
                    entities,
                });
            }
            _ => {}
        }
    }
}

// ========== ENTITIES ==========

/// 读取实体直到 `terminator`（ENDSEC 或 ENDBLK），终止标记被消费
fn parse_entity_list(
    reader: &mut DxfReader<'_>,
    terminator: &str,
    section: &str,
    state: &mut ImportState,
) -> Result<Vec<DrawingEntity>, ParseError> {
    let mut entities = Vec::new();
    loop {
        let pair = next_in_section(reader, section)?;
        if pair.code != 0 {
            continue;
        }

        let kind = pair.text();
        if kind == terminator {
            return Ok(entities);
        }
        // 段落意外结束
        if kind == "ENDSEC" {
            return Err(ParseError::UnterminatedSection(section.to_string()));
        }

        let attrs = reader.read_until_zero();
        let has_attributes = kind == "INSERT" && attrs.i32_or(66, 0)? == 1;
        let entity = match kind {
            "POLYLINE" => Some(polyline_from(attrs, reader, section)?),
            "INSERT" if has_attributes => {
                skip_attributes(reader, section)?;
                entity_from(kind, attrs)?
            }
            _ => entity_from(kind, attrs)?,
        };

        match entity {
            Some(entity) => entities.push(entity),
            None => state.skip(kind),
        }
    }
}

/// 公共属性：图层、颜色、可见性（60 = 1 不可见）
fn with_common(kind: EntityKind, attrs: &[DxfPair]) -> Result<DrawingEntity, ParseError> {
    let mut entity = DrawingEntity::new(kind);
    if let Some(layer) = attrs.string(8) {
        entity.common.layer = layer;
    }
    entity.common.color = attrs.i32_or(62, ACI_BY_LAYER)?;
    entity.common.visible = attrs.i32_or(60, 0)? != 1;
    Ok(entity)
}

fn required_point(attrs: &[DxfPair], base: i32) -> Result<Point3, ParseError> {
    Ok(attrs.point(base)?.unwrap_or_else(Point3::origin))
}

/// 解析单个实体，不支持的类型返回 None
fn entity_from(kind: &str, attrs: &[DxfPair]) -> Result<Option<DrawingEntity>, ParseError> {
    let geometry = match kind {
        "LINE" => EntityKind::Line {
            start: required_point(attrs, 10)?,
            end: required_point(attrs, 11)?,
        },

        "CIRCLE" => EntityKind::Circle {
            center: required_point(attrs, 10)?,
            radius: attrs.f64_or(40, 0.0)?,
        },

        "ARC" => EntityKind::Arc {
            center: required_point(attrs, 10)?,
            radius: attrs.f64_or(40, 0.0)?,
            start_angle: attrs.f64_or(50, 0.0)?,
            end_angle: attrs.f64_or(51, 360.0)?,
        },

        "LWPOLYLINE" => lwpolyline_from(attrs)?,

        "TEXT" => EntityKind::Text {
            position: required_point(attrs, 10)?,
            content: attrs.string(1).unwrap_or_default(),
            height: attrs.f64_or(40, 1.0)?,
            rotation: attrs.f64_or(50, 0.0)?,
        },

        "MTEXT" => {
            // 长文本先以若干个 3 分段，最后一段是 1
            let mut content: String = attrs.iter().filter(|p| p.code == 3).map(|p| p.value.as_str()).collect();
            content.push_str(attrs.find_code(1).map_or("", |p| p.value.as_str()));
            EntityKind::Text {
                position: required_point(attrs, 10)?,
                content: content.replace("\\P", "\n"),
                height: attrs.f64_or(40, 1.0)?,
                rotation: attrs.f64_or(50, 0.0)?,
            }
        }

        "INSERT" => EntityKind::Insert {
            position: required_point(attrs, 10)?,
            block_name: attrs.string(2).unwrap_or_default(),
            rotation: attrs.f64_or(50, 0.0)?,
            scale: Vector3::new(
                attrs.f64_or(41, 1.0)?,
                attrs.f64_or(42, 1.0)?,
                attrs.f64_or(43, 1.0)?,
            ),
        },

        "DIMENSION" => {
            let mut points = Vec::new();
            for base in [10, 11, 13, 14] {
                if let Some(p) = attrs.point(base)? {
                    points.push(p);
                }
            }
            EntityKind::Dimension { points }
        }

        _ => return Ok(None),
    };

    with_common(geometry, attrs).map(Some)
}

/// LWPOLYLINE：每个 10 开始一个新顶点，20 是其 Y；Z 取标高 38
fn lwpolyline_from(attrs: &[DxfPair]) -> Result<EntityKind, ParseError> {
    let elevation = attrs.f64_or(38, 0.0)?;
    let flags = attrs.i32_or(70, 0)?;

    let mut vertices: Vec<Point3> = Vec::new();
    for pair in attrs {
        match pair.code {
            10 => vertices.push(Point3::new(pair.as_f64()?, 0.0, elevation)),
            20 => {
                if let Some(last) = vertices.last_mut() {
                    last.y = pair.as_f64()?;
                }
            }
            _ => {}
        }
    }

    Ok(EntityKind::Polyline {
        vertices,
        closed: flags & 1 != 0,
    })
}

/// 旧式 POLYLINE：后跟 VERTEX 实体，以 SEQEND 结束
fn polyline_from(attrs: &[DxfPair], reader: &mut DxfReader<'_>, section: &str) -> Result<DrawingEntity, ParseError> {
    let flags = attrs.i32_or(70, 0)?;
    let mut vertices = Vec::new();

    loop {
        let pair = next_in_section(reader, section)?;
        if pair.code != 0 {
            continue;
        }
        let vertex_attrs = reader.read_until_zero();
        match pair.text() {
            "VERTEX" => vertices.push(required_point(vertex_attrs, 10)?),
            "SEQEND" => break,
            _ => return Err(ParseError::UnterminatedSection(format!("{} POLYLINE", section))),
        }
    }

    with_common(
        EntityKind::Polyline {
            vertices,
            closed: flags & 1 != 0,
        },
        attrs,
    )
}

/// 带属性的块参照（66 = 1）后跟 ATTRIB 记录，以 SEQEND 结束
fn skip_attributes(reader: &mut DxfReader<'_>, section: &str) -> Result<(), ParseError> {
    loop {
        let pair = next_in_section(reader, section)?;
        if pair.code != 0 {
            continue;
        }
        reader.read_until_zero();
        match pair.text() {
            "ATTRIB" => {}
            "SEQEND" => return Ok(()),
            _ => return Err(ParseError::UnterminatedSection(format!("{} INSERT", section))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipecad_core::palette::Color;

    /// 把 (组码, 值) 列表拼成 DXF 文本
    fn dxf(pairs: &[(i32, &str)]) -> String {
        pairs
            .iter()
            .map(|(code, value)| format!("{:>3}\n{}\n", code, value))
            .collect()
    }

    fn sample() -> String {
        dxf(&[
            (0, "SECTION"),
            (2, "HEADER"),
            (9, "$ACADVER"),
            (1, "AC1015"),
            (9, "$INSUNITS"),
            (70, "4"),
            (0, "ENDSEC"),
            (0, "SECTION"),
            (2, "TABLES"),
            (0, "TABLE"),
            (2, "LAYER"),
            (70, "2"),
            (0, "LAYER"),
            (2, "WALLS"),
            (70, "0"),
            (62, "1"),
            (0, "LAYER"),
            (2, "HIDDEN"),
            (70, "5"),
            (62, "-3"),
            (0, "ENDTAB"),
            (0, "ENDSEC"),
            (0, "SECTION"),
            (2, "BLOCKS"),
            (0, "BLOCK"),
            (2, "VALVE"),
            (10, "5.0"),
            (20, "5.0"),
            (0, "CIRCLE"),
            (8, "0"),
            (10, "0.0"),
            (20, "0.0"),
            (40, "2.0"),
            (0, "ENDBLK"),
            (0, "ENDSEC"),
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "LINE"),
            (8, "WALLS"),
            (10, "0.0"),
            (20, "0.0"),
            (30, "0.0"),
            (11, "4000.0"),
            (21, "0.0"),
            (31, "0.0"),
            (0, "CIRCLE"),
            (8, "WALLS"),
            (62, "3"),
            (10, "2000.0"),
            (20, "1000.0"),
            (40, "500.0"),
            (0, "LWPOLYLINE"),
            (8, "HIDDEN"),
            (90, "3"),
            (70, "1"),
            (10, "0.0"),
            (20, "0.0"),
            (10, "100.0"),
            (20, "0.0"),
            (10, "100.0"),
            (20, "3000.0"),
            (0, "TEXT"),
            (10, "-9000.0"),
            (20, "-9000.0"),
            (40, "250.0"),
            (1, "Kitchen"),
            (0, "INSERT"),
            (2, "VALVE"),
            (10, "1000.0"),
            (20, "500.0"),
            (60, "1"),
            (0, "SPLINE"),
            (8, "WALLS"),
            (0, "HATCH"),
            (0, "SPLINE"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ])
    }

    #[test]
    fn test_parse_sample() {
        let drawing = parse(&sample()).unwrap();

        assert_eq!(drawing.version, "AC1015");
        assert_eq!(drawing.units, Units::Millimeters);
        assert_eq!(drawing.entities.len(), 5);

        let types: Vec<_> = drawing.entities.iter().map(|e| e.kind.type_name()).collect();
        assert_eq!(types, ["LINE", "CIRCLE", "POLYLINE", "TEXT", "INSERT"]);

        match &drawing.entities[2].kind {
            EntityKind::Polyline { vertices, closed } => {
                assert_eq!(vertices.len(), 3);
                assert_eq!(vertices[2], Point3::new(100.0, 3000.0, 0.0));
                assert!(closed);
            }
            other => panic!("unexpected {:?}", other),
        }

        match &drawing.entities[3].kind {
            EntityKind::Text { content, height, .. } => {
                assert_eq!(content, "Kitchen");
                assert_eq!(*height, 250.0);
            }
            other => panic!("unexpected {:?}", other),
        }

        // 60 = 1 不可见
        assert!(!drawing.entities[4].common.visible);
        assert!(drawing.entities[0].common.visible);

        // 文字不参与包围盒
        let bounds = drawing.bounds.unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(4000.0, 3000.0, 0.0));
    }

    #[test]
    fn test_layers_and_colors() {
        let drawing = parse(&sample()).unwrap();
        assert_eq!(drawing.layers.len(), 2);

        let walls = drawing.layer("WALLS").unwrap();
        assert_eq!(walls.color, 1);
        assert!(walls.visible && !walls.frozen && !walls.locked);

        let hidden = drawing.layer("HIDDEN").unwrap();
        assert_eq!(hidden.color, 3);
        assert!(!hidden.visible);
        assert!(hidden.frozen);
        assert!(hidden.locked);

        // 随层颜色经图层解析
        assert_eq!(drawing.entities[0].common.color, ACI_BY_LAYER);
        assert_eq!(drawing.entities[0].resolve_color(&drawing.layers), Color::RED);
        assert_eq!(drawing.entities[1].resolve_color(&drawing.layers), Color::GREEN);
    }

    #[test]
    fn test_blocks() {
        let drawing = parse(&sample()).unwrap();
        let block = drawing.block("VALVE").unwrap();
        assert_eq!(block.base_point, Point3::new(5.0, 5.0, 0.0));
        assert_eq!(block.entities.len(), 1);
        assert_eq!(block.entities[0].kind.type_name(), "CIRCLE");
    }

    #[test]
    fn test_skipped_entities_reported() {
        let drawing = parse(&sample()).unwrap();
        assert_eq!(
            drawing.skipped,
            vec![
                SkippedEntity {
                    kind: "HATCH".to_string(),
                    count: 1
                },
                SkippedEntity {
                    kind: "SPLINE".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn test_old_style_polyline() {
        let text = dxf(&[
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "POLYLINE"),
            (8, "PIPES"),
            (66, "1"),
            (70, "0"),
            (0, "VERTEX"),
            (10, "1.0"),
            (20, "2.0"),
            (30, "3.0"),
            (0, "VERTEX"),
            (10, "4.0"),
            (20, "5.0"),
            (0, "SEQEND"),
            (0, "LINE"),
            (10, "0.0"),
            (20, "0.0"),
            (11, "1.0"),
            (21, "1.0"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ]);
        let drawing = parse(&text).unwrap();
        assert_eq!(drawing.entities.len(), 2);
        assert_eq!(drawing.entities[0].common.layer, "PIPES");
        match &drawing.entities[0].kind {
            EntityKind::Polyline { vertices, closed } => {
                assert_eq!(vertices, &vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 0.0)]);
                assert!(!closed);
            }
            other => panic!("unexpected {:?}", other),
        }
        // 默认值
        assert_eq!(drawing.version, "Unknown");
        assert_eq!(drawing.units, Units::Meters);
    }

    #[test]
    fn test_insert_attributes_consumed() {
        let text = dxf(&[
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "INSERT"),
            (2, "TAG"),
            (66, "1"),
            (10, "5.0"),
            (20, "6.0"),
            (0, "ATTRIB"),
            (2, "NUMBER"),
            (1, "V-101"),
            (0, "ATTRIB"),
            (2, "SIZE"),
            (1, "DN25"),
            (0, "SEQEND"),
            (0, "LINE"),
            (11, "1.0"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ]);
        let drawing = parse(&text).unwrap();
        assert_eq!(drawing.entities.len(), 2);
        assert!(drawing.skipped.is_empty());
        match &drawing.entities[0].kind {
            EntityKind::Insert { block_name, position, .. } => {
                assert_eq!(block_name, "TAG");
                assert_eq!(*position, Point3::new(5.0, 6.0, 0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(drawing.entities[1].kind, EntityKind::Line { .. }));
    }

    #[test]
    fn test_mtext_and_dimension() {
        let text = dxf(&[
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "MTEXT"),
            (10, "1.0"),
            (20, "1.0"),
            (40, "0.5"),
            (3, "Boiler "),
            (1, "room\\Pfloor 1"),
            (0, "DIMENSION"),
            (10, "0.0"),
            (20, "2.0"),
            (13, "0.0"),
            (23, "0.0"),
            (14, "6.0"),
            (24, "0.0"),
            (0, "ENDSEC"),
        ]);
        let drawing = parse(&text).unwrap();
        match &drawing.entities[0].kind {
            EntityKind::Text { content, .. } => assert_eq!(content, "Boiler room\nfloor 1"),
            other => panic!("unexpected {:?}", other),
        }
        match &drawing.entities[1].kind {
            EntityKind::Dimension { points } => assert_eq!(points.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   \n  "), Err(ParseError::Empty));
        assert_eq!(parse("0\nEOF\n"), Err(ParseError::NoSections));
        assert!(matches!(
            parse("not a dxf file\nat all\n"),
            Err(ParseError::InvalidGroupCode { line: 1, .. })
        ));

        let unterminated = dxf(&[(0, "SECTION"), (2, "ENTITIES"), (0, "LINE"), (10, "1.0")]);
        assert_eq!(
            parse(&unterminated),
            Err(ParseError::UnterminatedSection("ENTITIES".to_string()))
        );

        let bad_number = dxf(&[(0, "SECTION"), (2, "ENTITIES"), (0, "CIRCLE"), (40, "big"), (0, "ENDSEC")]);
        assert!(matches!(
            parse(&bad_number),
            Err(ParseError::InvalidNumber { line: 8, code: 40, .. })
        ));
    }

    #[test]
    fn test_unknown_sections_skipped() {
        let text = dxf(&[
            (0, "SECTION"),
            (2, "OBJECTS"),
            (0, "DICTIONARY"),
            (5, "C"),
            (0, "ENDSEC"),
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "CIRCLE"),
            (10, "0.0"),
            (20, "0.0"),
            (40, "1.0"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ]);
        let drawing = parse(&text).unwrap();
        assert_eq!(drawing.entities.len(), 1);
        assert!(drawing.skipped.is_empty());
    }
}
