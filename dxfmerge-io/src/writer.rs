use std::fmt::Display;

use dxfmerge_core::{
    document::{BlockDefinition, Document, Entity, Hatch, HatchBoundary, HatchEdge},
    geometry::{Point2, Vector2},
};

/// MTEXT 单个组码值的长度上限，超出部分以组码 3 分段。
const MTEXT_CHUNK: usize = 250;

/// 将文档序列化为 ASCII DXF。输出包含 HEADER、LAYER 表、BLOCKS（有块定义时）
/// 与 ENTITIES 段，图层与块按名称排序，保证同一文档的输出稳定。
///
/// 输出是不带句柄（组码 5）、子类标记（组码 100）与 OBJECTS 段的精简 R2000 结构。
/// 本 crate 的读取器以及 ezdxf、LibreCAD、QCAD 这类宽松读取器可以直接打开；
/// AutoCAD 的严格加载器要求完整的句柄与字典结构，不在支持范围内，需先经上述工具另存。
pub fn write_dxf(document: &Document) -> String {
    let mut out = DxfEmitter::default();

    out.section("HEADER");
    out.pair(9, "$ACADVER");
    out.pair(1, "AC1015");
    out.pair(9, "$INSUNITS");
    out.pair(70, 4); // 毫米
    out.pair(0, "ENDSEC");

    let mut layers: Vec<&str> = document.layers().map(|layer| layer.name.as_str()).collect();
    layers.sort_unstable();
    out.section("TABLES");
    out.pair(0, "TABLE");
    out.pair(2, "LAYER");
    out.pair(70, layers.len());
    for name in layers {
        out.pair(0, "LAYER");
        out.pair(2, name);
        out.pair(70, 0);
        out.pair(62, 7);
        out.pair(6, "CONTINUOUS");
    }
    out.pair(0, "ENDTAB");
    out.pair(0, "ENDSEC");

    let mut blocks: Vec<&BlockDefinition> = document.blocks().collect();
    if !blocks.is_empty() {
        blocks.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        out.section("BLOCKS");
        for block in blocks {
            out.block(block);
        }
        out.pair(0, "ENDSEC");
    }

    out.section("ENTITIES");
    for (_, entity) in document.entities() {
        out.entity(entity);
    }
    out.pair(0, "ENDSEC");
    out.pair(0, "EOF");
    out.finish()
}

#[derive(Default)]
struct DxfEmitter {
    buffer: String,
}

impl DxfEmitter {
    fn pair(&mut self, code: i32, value: impl Display) {
        use std::fmt::Write;
        // 写入 String 不会失败
        let _ = write!(self.buffer, "{code}\n{value}\n");
    }

    fn section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn point(&mut self, base: i32, point: Point2) {
        self.pair(base, point.x());
        self.pair(base + 10, point.y());
        self.pair(base + 20, 0.0);
    }

    fn vector(&mut self, base: i32, vector: Vector2) {
        self.pair(base, vector.x());
        self.pair(base + 10, vector.y());
        self.pair(base + 20, 0.0);
    }

    /// HATCH 边界数据只有 X/Y。
    fn point2d(&mut self, base: i32, point: Point2) {
        self.pair(base, point.x());
        self.pair(base + 10, point.y());
    }

    fn flag(&mut self, code: i32, value: bool) {
        self.pair(code, if value { 1 } else { 0 });
    }

    fn block(&mut self, block: &BlockDefinition) {
        self.pair(0, "BLOCK");
        self.pair(8, "0");
        self.pair(2, &block.name);
        self.pair(70, block.flags);
        self.point(10, block.base_point);
        self.pair(3, &block.name);
        self.pair(1, "");
        for entity in &block.entities {
            self.entity(entity);
        }
        self.pair(0, "ENDBLK");
        self.pair(8, "0");
    }

    fn entity(&mut self, entity: &Entity) {
        if let Entity::Unknown(unknown) = entity {
            self.pair(0, &unknown.kind);
            for (code, value) in &unknown.pairs {
                self.pair(*code, value);
            }
            return;
        }

        self.pair(0, entity.kind_name());
        self.pair(8, entity.layer_name());
        match entity {
            Entity::Line(line) => {
                self.point(10, line.start);
                self.point(11, line.end);
            }
            Entity::Circle(circle) => {
                self.point(10, circle.center);
                self.pair(40, circle.radius);
            }
            Entity::Arc(arc) => {
                self.point(10, arc.center);
                self.pair(40, arc.radius);
                self.pair(50, arc.start_angle.to_degrees());
                self.pair(51, arc.end_angle.to_degrees());
            }
            Entity::Ellipse(ellipse) => {
                self.point(10, ellipse.center);
                self.vector(11, ellipse.major_axis);
                self.pair(40, ellipse.ratio);
                self.pair(41, ellipse.start_parameter);
                self.pair(42, ellipse.end_parameter);
            }
            Entity::Polyline(polyline) => {
                self.pair(90, polyline.vertices.len());
                self.pair(70, if polyline.is_closed { 1 } else { 0 });
                for vertex in &polyline.vertices {
                    self.pair(10, vertex.position.x());
                    self.pair(20, vertex.position.y());
                    if vertex.bulge != 0.0 {
                        self.pair(42, vertex.bulge);
                    }
                }
            }
            Entity::Spline(spline) => {
                let mut flags = 0;
                if spline.is_closed {
                    flags |= 0x01;
                }
                if spline.is_periodic {
                    flags |= 0x02;
                }
                if spline.is_rational {
                    flags |= 0x04;
                }
                self.pair(70, flags);
                self.pair(71, spline.degree);
                self.pair(72, spline.knot_values.len());
                self.pair(73, spline.control_points.len());
                self.pair(74, spline.fit_points.len());
                if let Some(tangent) = spline.start_tangent {
                    self.vector(12, tangent);
                }
                if let Some(tangent) = spline.end_tangent {
                    self.vector(13, tangent);
                }
                for knot in &spline.knot_values {
                    self.pair(40, knot);
                }
                for weight in &spline.weights {
                    self.pair(41, weight);
                }
                for point in &spline.control_points {
                    self.point(10, *point);
                }
                for point in &spline.fit_points {
                    self.point(11, *point);
                }
            }
            Entity::Text(text) => {
                self.point(10, text.insert);
                self.pair(40, text.height);
                self.pair(1, text.content.replace('\n', " "));
                self.pair(50, text.rotation.to_degrees());
            }
            Entity::MText(mtext) => {
                self.point(10, mtext.insert);
                self.pair(40, mtext.height);
                if let Some(width) = mtext.reference_width {
                    self.pair(41, width);
                }
                self.pair(71, mtext.attachment_point);
                self.vector(11, mtext.direction);
                let encoded = encode_mtext_content(&mtext.content);
                let chars: Vec<char> = encoded.chars().collect();
                let mut chunks = chars.chunks(MTEXT_CHUNK).peekable();
                if chunks.peek().is_none() {
                    self.pair(1, "");
                }
                while let Some(chunk) = chunks.next() {
                    let code = if chunks.peek().is_some() { 3 } else { 1 };
                    self.pair(code, chunk.iter().collect::<String>());
                }
            }
            Entity::Point(point) => {
                self.point(10, point.position);
            }
            Entity::BlockReference(reference) => {
                if !reference.attributes.is_empty() {
                    self.pair(66, 1);
                }
                self.pair(2, &reference.name);
                self.point(10, reference.insert);
                self.pair(41, reference.scale.x());
                self.pair(42, reference.scale.y());
                self.pair(43, 1.0);
                self.pair(50, reference.rotation.to_degrees());
                if reference.attributes.is_empty() {
                    return;
                }
                for attribute in &reference.attributes {
                    self.pair(0, "ATTRIB");
                    self.pair(8, &attribute.layer);
                    self.point(10, attribute.insert);
                    self.pair(40, attribute.height);
                    self.pair(1, &attribute.value);
                    self.pair(2, &attribute.tag);
                    self.pair(70, 0);
                    self.pair(50, attribute.rotation.to_degrees());
                }
                self.pair(0, "SEQEND");
                self.pair(8, &reference.layer);
            }
            Entity::Hatch(hatch) => self.hatch(hatch),
            Entity::Unknown(_) => {}
        }
    }

    /// 边界以世界坐标写出，拉伸方向固定为 +Z，源边界关联不保留。
    fn hatch(&mut self, hatch: &Hatch) {
        self.point(10, Point2::new(0.0, 0.0));
        self.pair(210, 0.0);
        self.pair(220, 0.0);
        self.pair(230, 1.0);
        self.pair(2, &hatch.pattern_name);
        self.flag(70, hatch.is_solid);
        self.pair(71, 0);
        self.pair(91, hatch.loops.len());
        for path in &hatch.loops {
            match &path.boundary {
                HatchBoundary::Polyline {
                    vertices,
                    is_closed,
                } => {
                    let has_bulge = vertices.iter().any(|vertex| vertex.bulge != 0.0);
                    self.pair(92, path.flags | 0x02);
                    self.flag(72, has_bulge);
                    self.flag(73, *is_closed);
                    self.pair(93, vertices.len());
                    for vertex in vertices {
                        self.point2d(10, vertex.position);
                        if has_bulge {
                            self.pair(42, vertex.bulge);
                        }
                    }
                }
                HatchBoundary::Edges(edges) => {
                    self.pair(92, path.flags & !0x02);
                    self.pair(93, edges.len());
                    for edge in edges {
                        self.hatch_edge(edge);
                    }
                }
            }
            self.pair(97, 0);
        }
        self.pair(75, 0);
        self.pair(76, 1);
        if !hatch.is_solid {
            self.pair(52, hatch.pattern_angle.to_degrees());
            self.pair(41, hatch.pattern_scale);
            self.pair(77, 0);
            self.pair(78, hatch.pattern_lines.len());
            for line in &hatch.pattern_lines {
                self.pair(53, line.angle.to_degrees());
                self.pair(43, line.base.x());
                self.pair(44, line.base.y());
                self.pair(45, line.offset.x());
                self.pair(46, line.offset.y());
                self.pair(79, line.dashes.len());
                for dash in &line.dashes {
                    self.pair(49, dash);
                }
            }
        }
        self.pair(98, hatch.seeds.len());
        for seed in &hatch.seeds {
            self.point2d(10, *seed);
        }
    }

    fn hatch_edge(&mut self, edge: &HatchEdge) {
        match edge {
            HatchEdge::Line { start, end } => {
                self.pair(72, 1);
                self.point2d(10, *start);
                self.point2d(11, *end);
            }
            HatchEdge::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => {
                self.pair(72, 2);
                self.point2d(10, *center);
                self.pair(40, radius);
                self.pair(50, start_angle.to_degrees());
                self.pair(51, end_angle.to_degrees());
                self.flag(73, *is_counter_clockwise);
            }
            HatchEdge::Ellipse {
                center,
                major_axis,
                ratio,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => {
                self.pair(72, 3);
                self.point2d(10, *center);
                self.point2d(11, Point2::new(major_axis.x(), major_axis.y()));
                self.pair(40, ratio);
                self.pair(50, start_angle.to_degrees());
                self.pair(51, end_angle.to_degrees());
                self.flag(73, *is_counter_clockwise);
            }
            HatchEdge::Spline {
                degree,
                is_rational,
                is_periodic,
                knot_values,
                control_points,
                weights,
            } => {
                // 权重与控制点数量不一致时无法逐点对应，整体省略
                let weighted = weights.len() == control_points.len();
                self.pair(72, 4);
                self.pair(94, degree);
                self.flag(73, *is_rational);
                self.flag(74, *is_periodic);
                self.pair(95, knot_values.len());
                self.pair(96, control_points.len());
                for knot in knot_values {
                    self.pair(40, knot);
                }
                for (index, point) in control_points.iter().enumerate() {
                    self.point2d(10, *point);
                    if weighted {
                        self.pair(42, weights[index]);
                    }
                }
            }
        }
    }

    fn finish(self) -> String {
        self.buffer
    }
}

fn encode_mtext_content(content: &str) -> String {
    content.replace('\\', "\\\\").replace('\n', "\\P")
}
