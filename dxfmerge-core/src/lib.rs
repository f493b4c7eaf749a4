pub mod geometry {
    use std::ops::Neg;

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，坐标均为双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        /// 绕坐标原点逆时针旋转（弧度）。
        #[inline]
        pub fn rotate_about_origin(self, radians: f64) -> Self {
            Self(DVec2::from_angle(radians).rotate(self.0))
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    /// 二维向量，用于平移量与方向。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn rotate(self, radians: f64) -> Self {
            Self(DVec2::from_angle(radians).rotate(self.0))
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl Neg for Vector2 {
        type Output = Vector2;

        fn neg(self) -> Self::Output {
            Vector2(-self.0)
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框。`empty()` 表示尚未包含任何点，与零尺寸框区分。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            debug_assert!(!self.is_empty());
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            debug_assert!(!self.is_empty());
            self.max.y() - self.min.y()
        }

        #[inline]
        pub fn area(&self) -> f64 {
            self.width() * self.height()
        }

        pub fn include_point(&mut self, point: Point2) {
            *self = if self.is_empty() {
                Self::new(point, point)
            } else {
                Self::new(
                    Point2(self.min.0.min(point.0)),
                    Point2(self.max.0.max(point.0)),
                )
            };
        }

        /// 逆时针排列的四个角点。
        pub fn corners(&self) -> [Point2; 4] {
            [
                self.min,
                Point2::new(self.max.x(), self.min.y()),
                self.max,
                Point2::new(self.min.x(), self.max.y()),
            ]
        }

        /// 合并另一个框；空框不产生影响。
        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if !other.is_empty() {
                self.include_point(other.min);
                self.include_point(other.max);
            }
        }
    }

    /// 刚体变换：先绕原点逆时针旋转 `rotation` 弧度，再平移 `offset`。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct RigidTransform {
        rotation: f64,
        offset: Vector2,
    }

    impl RigidTransform {
        pub fn new(rotation: f64, offset: Vector2) -> Self {
            Self { rotation, offset }
        }

        pub fn translation(offset: Vector2) -> Self {
            Self::new(0.0, offset)
        }

        pub fn rotation(radians: f64) -> Self {
            Self::new(radians, Vector2::new(0.0, 0.0))
        }

        #[inline]
        pub fn rotation_radians(&self) -> f64 {
            self.rotation
        }

        pub fn apply_point(&self, point: Point2) -> Point2 {
            let rotated = if self.rotation == 0.0 {
                point
            } else {
                point.rotate_about_origin(self.rotation)
            };
            rotated.translate(self.offset)
        }

        /// 方向量只旋转，不平移。
        pub fn apply_direction(&self, vector: Vector2) -> Vector2 {
            if self.rotation == 0.0 {
                vector
            } else {
                vector.rotate(self.rotation)
            }
        }
    }

}

pub mod document {
    use std::collections::HashMap;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use glam::DVec2;
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::geometry::{Bounds2D, Point2, RigidTransform, Vector2};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    /// 实体不具备某项几何变换能力时返回。
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum TransformError {
        #[error("entity {kind} does not support {operation}")]
        Unsupported {
            kind: String,
            operation: &'static str,
        },
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Arc(Arc),
        Ellipse(Ellipse),
        Polyline(Polyline),
        Spline(Spline),
        Text(Text),
        MText(MText),
        Point(PointEntity),
        BlockReference(BlockReference),
        Hatch(Hatch),
        Unknown(UnknownEntity),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Ellipse(ellipse) => &ellipse.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Spline(spline) => &spline.layer,
                Entity::Text(text) => &text.layer,
                Entity::MText(mtext) => &mtext.layer,
                Entity::Point(point) => &point.layer,
                Entity::BlockReference(reference) => &reference.layer,
                Entity::Hatch(hatch) => &hatch.layer,
                Entity::Unknown(unknown) => &unknown.layer,
            }
        }

        /// DXF 实体类型名，用于日志与报告。
        pub fn kind_name(&self) -> &str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Arc(_) => "ARC",
                Entity::Ellipse(_) => "ELLIPSE",
                Entity::Polyline(_) => "LWPOLYLINE",
                Entity::Spline(_) => "SPLINE",
                Entity::Text(_) => "TEXT",
                Entity::MText(_) => "MTEXT",
                Entity::Point(_) => "POINT",
                Entity::BlockReference(_) => "INSERT",
                Entity::Hatch(_) => "HATCH",
                Entity::Unknown(unknown) => &unknown.kind,
            }
        }

        /// 计算实体的 2D 轴对齐范围，文本类对象退化为插入点。
        /// 块参照在这里只计入属性文字，块内容需经 [`Document::entity_extent`] 解析。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Circle(circle) => {
                    let reach = Vector2::new(circle.radius.abs(), circle.radius.abs());
                    bounds.include_point(circle.center.translate(-reach));
                    bounds.include_point(circle.center.translate(reach));
                }
                Entity::Arc(arc) => include_arc(
                    &mut bounds,
                    arc.center,
                    arc.radius,
                    arc.start_angle,
                    arc.end_angle,
                ),
                Entity::Ellipse(ellipse) => include_elliptic_arc(
                    &mut bounds,
                    ellipse.center,
                    ellipse.major_axis,
                    ellipse.ratio,
                    (ellipse.start_parameter, ellipse.end_parameter),
                ),
                Entity::Polyline(polyline) => {
                    include_polyline(&mut bounds, &polyline.vertices, polyline.is_closed)
                }
                Entity::Spline(spline) => {
                    for point in spline.control_points.iter().chain(&spline.fit_points) {
                        bounds.include_point(*point);
                    }
                }
                Entity::Text(text) => {
                    bounds.include_point(text.insert);
                }
                Entity::MText(mtext) => {
                    bounds.include_point(mtext.insert);
                }
                Entity::Point(point) => {
                    bounds.include_point(point.position);
                }
                Entity::BlockReference(reference) => {
                    for attribute in &reference.attributes {
                        bounds.include_point(attribute.insert);
                    }
                }
                Entity::Hatch(hatch) => {
                    for path in &hatch.loops {
                        include_hatch_loop(&mut bounds, path);
                    }
                }
                Entity::Unknown(_) => {}
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }

        /// 平移实体的所有坐标。
        pub fn translate(&mut self, offset: Vector2) -> Result<(), TransformError> {
            self.transform(&RigidTransform::translation(offset), "translate")
        }

        /// 绕坐标原点旋转实体（弧度，逆时针为正）。
        pub fn rotate_about_origin(&mut self, radians: f64) -> Result<(), TransformError> {
            self.transform(&RigidTransform::rotation(radians), "rotate")
        }

        /// 应用刚体变换。点与方向量一并变换，角度属性累加旋转量，bulge 保持不变。
        /// 未知实体原样保留并返回错误。
        pub fn transform(
            &mut self,
            transform: &RigidTransform,
            operation: &'static str,
        ) -> Result<(), TransformError> {
            let point = |p: &mut Point2| *p = transform.apply_point(*p);
            let turn = transform.rotation_radians();
            match self {
                Entity::Line(line) => {
                    point(&mut line.start);
                    point(&mut line.end);
                }
                Entity::Circle(circle) => point(&mut circle.center),
                Entity::Arc(arc) => {
                    point(&mut arc.center);
                    arc.start_angle += turn;
                    arc.end_angle += turn;
                }
                Entity::Ellipse(ellipse) => {
                    point(&mut ellipse.center);
                    ellipse.major_axis = transform.apply_direction(ellipse.major_axis);
                }
                Entity::Polyline(polyline) => {
                    polyline
                        .vertices
                        .iter_mut()
                        .for_each(|vertex| point(&mut vertex.position));
                }
                Entity::Spline(spline) => {
                    spline
                        .control_points
                        .iter_mut()
                        .chain(spline.fit_points.iter_mut())
                        .for_each(point);
                    for tangent in [&mut spline.start_tangent, &mut spline.end_tangent] {
                        *tangent = tangent.map(|t| transform.apply_direction(t));
                    }
                }
                Entity::Text(text) => {
                    point(&mut text.insert);
                    text.rotation += turn;
                }
                Entity::MText(mtext) => {
                    point(&mut mtext.insert);
                    mtext.direction = transform.apply_direction(mtext.direction);
                }
                Entity::Point(entity) => point(&mut entity.position),
                Entity::BlockReference(reference) => {
                    point(&mut reference.insert);
                    reference.rotation += turn;
                    for attribute in &mut reference.attributes {
                        point(&mut attribute.insert);
                        attribute.rotation += turn;
                    }
                }
                Entity::Hatch(hatch) => hatch.transform(transform),
                Entity::Unknown(unknown) => {
                    return Err(TransformError::Unsupported {
                        kind: unknown.kind.clone(),
                        operation,
                    });
                }
            }
            Ok(())
        }

        /// 所有坐标与标量是否均为有限值。
        pub fn is_finite(&self) -> bool {
            match self {
                Entity::Line(line) => line.start.is_finite() && line.end.is_finite(),
                Entity::Circle(circle) => circle.center.is_finite() && circle.radius.is_finite(),
                Entity::Arc(arc) => {
                    arc.center.is_finite()
                        && arc.radius.is_finite()
                        && arc.start_angle.is_finite()
                        && arc.end_angle.is_finite()
                }
                Entity::Ellipse(ellipse) => {
                    ellipse.center.is_finite()
                        && ellipse.major_axis.is_finite()
                        && ellipse.ratio.is_finite()
                }
                Entity::Polyline(polyline) => polyline
                    .vertices
                    .iter()
                    .all(|vertex| vertex.position.is_finite() && vertex.bulge.is_finite()),
                Entity::Spline(spline) => spline
                    .control_points
                    .iter()
                    .chain(&spline.fit_points)
                    .all(|point| point.is_finite()),
                Entity::Text(text) => text.insert.is_finite() && text.rotation.is_finite(),
                Entity::MText(mtext) => mtext.insert.is_finite() && mtext.direction.is_finite(),
                Entity::Point(point) => point.position.is_finite(),
                Entity::BlockReference(reference) => {
                    reference.insert.is_finite()
                        && reference.scale.is_finite()
                        && reference.rotation.is_finite()
                        && reference
                            .attributes
                            .iter()
                            .all(|attribute| attribute.insert.is_finite())
                }
                Entity::Hatch(hatch) => hatch.is_finite(),
                Entity::Unknown(_) => true,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以弧度形式储存，遵循数学正方向。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    /// 椭圆实体，记录主轴向量与参数范围（单位为弧度）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub is_rational: bool,
        pub is_closed: bool,
        pub is_periodic: bool,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub knot_values: Vec<f64>,
        pub weights: Vec<f64>,
        pub start_tangent: Option<Vector2>,
        pub end_tangent: Option<Vector2>,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MText {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub reference_width: Option<f64>,
        pub direction: Vector2,
        pub attachment_point: i16,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PointEntity {
        pub position: Point2,
        pub layer: String,
    }

    /// 块参照（INSERT）。块内坐标先减去块基点，再依次缩放、旋转并移到插入点。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockReference {
        pub name: String,
        pub insert: Point2,
        pub scale: Vector2,
        pub rotation: f64,
        pub attributes: Vec<Attribute>,
        pub layer: String,
    }

    impl BlockReference {
        /// 把块定义中的点映射到世界坐标。
        pub fn place(&self, base_point: Point2, local: Point2) -> Point2 {
            let scaled = (local.as_vec2() - base_point.as_vec2()) * self.scale.as_vec2();
            Point2::from_vec(DVec2::from_angle(self.rotation).rotate(scaled))
                .translate(Vector2::from(self.insert.as_vec2()))
        }
    }

    /// 跟随块参照的属性文字（ATTRIB），坐标为世界坐标。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Attribute {
        pub tag: String,
        pub value: String,
        pub insert: Point2,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
    }

    /// BLOCKS 段中的块定义。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockDefinition {
        pub name: String,
        pub base_point: Point2,
        pub flags: i32,
        pub entities: Vec<Entity>,
    }

    /// 填充边界环路。`flags` 保留 DXF 组码 92 的原值。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HatchLoop {
        pub flags: i32,
        pub boundary: HatchBoundary,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum HatchBoundary {
        Polyline {
            vertices: Vec<PolylineVertex>,
            is_closed: bool,
        },
        Edges(Vec<HatchEdge>),
    }

    /// 边界边。顺时针的圆弧与椭圆弧按 DXF 约定以取反后的角度储存。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum HatchEdge {
        Line {
            start: Point2,
            end: Point2,
        },
        Arc {
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            is_counter_clockwise: bool,
        },
        Ellipse {
            center: Point2,
            major_axis: Vector2,
            ratio: f64,
            start_angle: f64,
            end_angle: f64,
            is_counter_clockwise: bool,
        },
        Spline {
            degree: i32,
            is_rational: bool,
            is_periodic: bool,
            knot_values: Vec<f64>,
            control_points: Vec<Point2>,
            weights: Vec<f64>,
        },
    }

    /// 图案填充的一条定义线，角度为弧度。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HatchPatternLine {
        pub angle: f64,
        pub base: Point2,
        pub offset: Vector2,
        pub dashes: Vec<f64>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Hatch {
        pub pattern_name: String,
        pub is_solid: bool,
        pub loops: Vec<HatchLoop>,
        pub pattern_angle: f64,
        pub pattern_scale: f64,
        pub pattern_lines: Vec<HatchPatternLine>,
        pub seeds: Vec<Point2>,
        pub layer: String,
    }

    impl Hatch {
        fn transform(&mut self, transform: &RigidTransform) {
            let turn = transform.rotation_radians();
            let point = |p: &mut Point2| *p = transform.apply_point(*p);
            for path in &mut self.loops {
                match &mut path.boundary {
                    HatchBoundary::Polyline { vertices, .. } => {
                        vertices.iter_mut().for_each(|vertex| point(&mut vertex.position));
                    }
                    HatchBoundary::Edges(edges) => {
                        for edge in edges {
                            edge.transform(transform);
                        }
                    }
                }
            }
            self.seeds.iter_mut().for_each(point);
            self.pattern_angle += turn;
            for line in &mut self.pattern_lines {
                line.angle += turn;
                point(&mut line.base);
                line.offset = transform.apply_direction(line.offset);
            }
        }

        fn is_finite(&self) -> bool {
            let edge_finite = |edge: &HatchEdge| match edge {
                HatchEdge::Line { start, end } => start.is_finite() && end.is_finite(),
                HatchEdge::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    ..
                } => {
                    center.is_finite()
                        && radius.is_finite()
                        && start_angle.is_finite()
                        && end_angle.is_finite()
                }
                HatchEdge::Ellipse {
                    center,
                    major_axis,
                    ratio,
                    ..
                } => center.is_finite() && major_axis.is_finite() && ratio.is_finite(),
                HatchEdge::Spline { control_points, .. } => {
                    control_points.iter().all(|point| point.is_finite())
                }
            };
            self.loops.iter().all(|path| match &path.boundary {
                HatchBoundary::Polyline { vertices, .. } => vertices
                    .iter()
                    .all(|vertex| vertex.position.is_finite() && vertex.bulge.is_finite()),
                HatchBoundary::Edges(edges) => edges.iter().all(edge_finite),
            }) && self.seeds.iter().all(|seed| seed.is_finite())
                && self.pattern_angle.is_finite()
        }
    }

    impl HatchEdge {
        fn transform(&mut self, transform: &RigidTransform) {
            let turn = transform.rotation_radians();
            // 顺时针边的角度取反储存，旋转方向随之相反
            let oriented = |ccw: bool| if ccw { turn } else { -turn };
            match self {
                HatchEdge::Line { start, end } => {
                    *start = transform.apply_point(*start);
                    *end = transform.apply_point(*end);
                }
                HatchEdge::Arc {
                    center,
                    start_angle,
                    end_angle,
                    is_counter_clockwise,
                    ..
                } => {
                    *center = transform.apply_point(*center);
                    *start_angle += oriented(*is_counter_clockwise);
                    *end_angle += oriented(*is_counter_clockwise);
                }
                HatchEdge::Ellipse {
                    center,
                    major_axis,
                    ..
                } => {
                    *center = transform.apply_point(*center);
                    *major_axis = transform.apply_direction(*major_axis);
                }
                HatchEdge::Spline { control_points, .. } => {
                    for point in control_points {
                        *point = transform.apply_point(*point);
                    }
                }
            }
        }
    }

    /// 读取器未建模的实体，原样保留组码对。没有范围，也不支持几何变换。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UnknownEntity {
        pub kind: String,
        pub layer: String,
        pub pairs: Vec<(i32, String)>,
    }

    /// 块参照嵌套的最大解析深度，超出部分不计入范围（同时截断循环引用）。
    const MAX_BLOCK_DEPTH: usize = 16;

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
        blocks: HashMap<String, BlockDefinition>,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Line(Line {
                start,
                end,
                layer: layer.into(),
            }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Circle(Circle {
                center,
                radius,
                layer: layer.into(),
            }))
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer: layer.into(),
            }))
        }

        pub fn add_polyline<I>(
            &mut self,
            points: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            self.add_polyline_with_vertices(
                points.into_iter().map(PolylineVertex::new),
                is_closed,
                layer,
            )
        }

        pub fn add_polyline_with_vertices<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = PolylineVertex>,
        {
            self.add_entity(Entity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer: layer.into(),
            }))
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            rotation: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Text(Text {
                insert,
                content: content.into(),
                height,
                rotation,
                layer: layer.into(),
            }))
        }

        /// 追加实体并登记其图层。编号按插入顺序递增。
        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(entity.layer_name());
            let id = EntityId(self.next_entity_id);
            self.next_entity_id += 1;
            self.entities.push((id, entity));
            id
        }

        /// 登记块定义及其实体用到的图层，同名定义被替换并返回。
        pub fn add_block(&mut self, definition: BlockDefinition) -> Option<BlockDefinition> {
            for entity in &definition.entities {
                self.ensure_layer(entity.layer_name());
            }
            self.blocks.insert(definition.name.clone(), definition)
        }

        #[inline]
        pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
            self.blocks.get(name)
        }

        #[inline]
        pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
            self.blocks.values()
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        #[inline]
        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find_map(|(entity_id, entity)| (*entity_id == id).then_some(entity))
        }

        #[inline]
        pub fn entity_bounds(&self, id: EntityId) -> Option<Bounds2D> {
            self.entity(id).and_then(|entity| self.entity_extent(entity))
        }

        /// 实体范围；块参照按本文档的块定义展开。
        pub fn entity_extent(&self, entity: &Entity) -> Option<Bounds2D> {
            self.extent_at_depth(entity, 0)
        }

        /// 所有具备范围的实体的并集；没有任何此类实体时为 `None`。
        pub fn bounds(&self) -> Option<Bounds2D> {
            union(
                self.entities
                    .iter()
                    .filter_map(|(_, entity)| self.entity_extent(entity)),
            )
        }

        fn extent_at_depth(&self, entity: &Entity, depth: usize) -> Option<Bounds2D> {
            let Entity::BlockReference(reference) = entity else {
                return entity.bounds();
            };
            let own = entity.bounds();
            let placed = self
                .blocks
                .get(&reference.name)
                .filter(|_| depth < MAX_BLOCK_DEPTH)
                .and_then(|block| {
                    let local = union(
                        block
                            .entities
                            .iter()
                            .filter_map(|inner| self.extent_at_depth(inner, depth + 1)),
                    )?;
                    // 旋转后取角点外包，弧形内容可能略大于精确范围
                    let mut placed = Bounds2D::empty();
                    for corner in local.corners() {
                        placed.include_point(reference.place(block.base_point, corner));
                    }
                    Some(placed)
                });
            union(own.into_iter().chain(placed))
        }
    }

    fn union(extents: impl Iterator<Item = Bounds2D>) -> Option<Bounds2D> {
        extents.reduce(|mut total, next| {
            total.include_bounds(&next);
            total
        })
    }

    /// 整理为 `start ∈ [0, 2π)` 且 `start <= end` 的扫掠区间，起止重合视为整周。
    fn sweep(start: f64, end: f64) -> (f64, f64) {
        let start = start.rem_euclid(TAU);
        let mut end = end.rem_euclid(TAU);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn sweep_contains((start, end): (f64, f64), angle: f64) -> bool {
        let mut candidate = angle.rem_euclid(TAU);
        if candidate < start {
            candidate += TAU;
        }
        candidate <= end
    }

    fn include_arc(bounds: &mut Bounds2D, center: Point2, radius: f64, start: f64, end: f64) {
        let radius = radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(center);
            return;
        }
        let on_circle = |angle: f64| {
            center.translate(Vector2::new(radius * angle.cos(), radius * angle.sin()))
        };
        let range = sweep(start, end);
        bounds.include_point(on_circle(range.0));
        bounds.include_point(on_circle(range.1));
        for quadrant in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2] {
            if sweep_contains(range, quadrant) {
                bounds.include_point(on_circle(quadrant));
            }
        }
    }

    /// 端点加上各坐标分量的极值参数（导数为零处）。
    fn include_elliptic_arc(
        bounds: &mut Bounds2D,
        center: Point2,
        major_axis: Vector2,
        ratio: f64,
        (start, end): (f64, f64),
    ) {
        let major = major_axis.as_vec2();
        if major.length() <= f64::EPSILON {
            bounds.include_point(center);
            return;
        }
        let minor = major.perp() * ratio.abs();
        let at = |t: f64| center.translate(Vector2::from(major * t.cos() + minor * t.sin()));
        let range = sweep(start, end);
        bounds.include_point(at(range.0));
        bounds.include_point(at(range.1));
        for base in [minor.x.atan2(major.x), minor.y.atan2(major.y)] {
            for t in [base, base + PI] {
                if sweep_contains(range, t) {
                    bounds.include_point(at(t));
                }
            }
        }
    }

    fn include_polyline(bounds: &mut Bounds2D, vertices: &[PolylineVertex], is_closed: bool) {
        for vertex in vertices {
            bounds.include_point(vertex.position);
        }
        let closing = is_closed
            .then(|| vertices.last().zip(vertices.first()))
            .flatten();
        let segments = vertices
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .chain(closing);
        for (from, to) in segments {
            if let Some((center, radius, start, end)) =
                bulge_arc(from.position, to.position, from.bulge)
            {
                include_arc(bounds, center, radius, start, end);
            }
        }
    }

    /// 顺时针边按取反角度储存，换算为逆时针扫掠区间。
    fn counter_clockwise(start: f64, end: f64, is_counter_clockwise: bool) -> (f64, f64) {
        if is_counter_clockwise {
            (start, end)
        } else {
            (-end, -start)
        }
    }

    fn include_hatch_loop(bounds: &mut Bounds2D, path: &HatchLoop) {
        let edges = match &path.boundary {
            HatchBoundary::Polyline {
                vertices,
                is_closed,
            } => return include_polyline(bounds, vertices, *is_closed),
            HatchBoundary::Edges(edges) => edges,
        };
        for edge in edges {
            match edge {
                HatchEdge::Line { start, end } => {
                    bounds.include_point(*start);
                    bounds.include_point(*end);
                }
                HatchEdge::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    is_counter_clockwise,
                } => {
                    let (start, end) =
                        counter_clockwise(*start_angle, *end_angle, *is_counter_clockwise);
                    include_arc(bounds, *center, *radius, start, end);
                }
                HatchEdge::Ellipse {
                    center,
                    major_axis,
                    ratio,
                    start_angle,
                    end_angle,
                    is_counter_clockwise,
                } => include_elliptic_arc(
                    bounds,
                    *center,
                    *major_axis,
                    *ratio,
                    counter_clockwise(*start_angle, *end_angle, *is_counter_clockwise),
                ),
                HatchEdge::Spline { control_points, .. } => {
                    for point in control_points {
                        bounds.include_point(*point);
                    }
                }
            }
        }
    }

    /// 由弦与 bulge（圆心角四分之一的正切，正值为逆时针）还原圆弧。
    /// 返回圆心、半径与起止角；直线段返回 `None`。
    fn bulge_arc(from: Point2, to: Point2, bulge: f64) -> Option<(Point2, f64, f64, f64)> {
        if bulge.abs() <= 1e-9 {
            return None;
        }
        let chord = to.as_vec2() - from.as_vec2();
        let chord_length = chord.length();
        if chord_length <= f64::EPSILON {
            return None;
        }
        let sweep_angle = 4.0 * bulge.atan();
        let half = sweep_angle / 2.0;
        if half.sin().abs() <= 1e-9 {
            return None;
        }

        // 圆心在弦的中垂线上
        let radius = chord_length / (2.0 * half.sin());
        let midpoint = (from.as_vec2() + to.as_vec2()) * 0.5;
        let center = midpoint + chord.perp() / chord_length * (radius * half.cos());
        let offset = from.as_vec2() - center;
        let start = offset.y.atan2(offset.x);
        let (start, end) = if sweep_angle > 0.0 {
            (start, start + sweep_angle)
        } else {
            (start + sweep_angle, start)
        };
        Some((Point2::from_vec(center), radius.abs(), start, end))
    }

}
