use std::f64::consts::TAU;

use dxfmerge_core::{
    document::{
        Arc, Attribute, BlockDefinition, BlockReference, Circle, Document, Ellipse, Entity, Line,
        MText, PointEntity, Polyline, PolylineVertex, Spline, Text, UnknownEntity,
    },
    geometry::{Point2, Vector2},
};
use tracing::{debug, warn};

use crate::IoError;

mod hatch;
mod ocs;

/// 解析 ASCII DXF 文本。读取 BLOCKS 与 ENTITIES 段，其余段落整体跳过。
/// 拉伸方向为 -Z 的实体在读取时换算到世界坐标。
pub fn parse_dxf(source: &str) -> Result<Document, IoError> {
    DxfParser::new(source).parse().map_err(|err| match err {
        DxfError::Unsupported { feature } => IoError::UnsupportedFeature(feature),
        DxfError::Invalid { message } => IoError::InvalidDocument(message),
    })
}

#[derive(Debug)]
enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code == 999 {
                continue;
            }
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "BLOCKS" => self.parse_blocks(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    /// 读取下一条记录的类型名（组码 0 的值）。
    fn next_marker(&mut self, section: &str) -> Result<String, DxfError> {
        match self.reader.next_pair()? {
            Some((0, value)) => Ok(value.trim().to_string()),
            Some((code, _)) => Err(DxfError::invalid(format!(
                "{section} 段遇到组码 {code}（期望 0 表示实体起始）"
            ))),
            None => Err(DxfError::invalid(format!("{section} 段提前结束"))),
        }
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let marker = self.next_marker("ENTITIES")?;
            if marker == "ENDSEC" {
                break;
            }
            if let Some(entity) = self.parse_record(&marker)? {
                document.add_entity(entity);
            }
        }
        Ok(())
    }

    fn parse_blocks(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            match self.next_marker("BLOCKS")?.as_str() {
                "ENDSEC" => break,
                "BLOCK" => {
                    if let Some(block) = self.parse_block()? {
                        document.add_block(block);
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    /// 模型空间与图纸空间的布局块不保留。
    fn parse_block(&mut self) -> Result<Option<BlockDefinition>, DxfError> {
        let header = self.read_body("BLOCK")?;
        let name = header
            .values(2)
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| header.missing(2, "块名"))?
            .to_string();
        let base_point = Point2::new(
            header.real(10, "基点 X")?.unwrap_or(0.0),
            header.real(20, "基点 Y")?.unwrap_or(0.0),
        );
        let flags = header.int(70, "块标志")?.unwrap_or(0);

        let mut entities = Vec::new();
        loop {
            let marker = self.next_marker("BLOCKS")?;
            match marker.as_str() {
                "ENDBLK" => {
                    self.skip_entity_body()?;
                    break;
                }
                "ENDSEC" => {
                    return Err(DxfError::invalid(format!(
                        "BLOCK {name} 未找到 ENDBLK 终止标记"
                    )));
                }
                kind => {
                    if let Some(entity) = self.parse_record(kind)? {
                        entities.push(entity);
                    }
                }
            }
        }

        let lowered = name.to_ascii_lowercase();
        if lowered.starts_with("*model_space") || lowered.starts_with("*paper_space") {
            debug!(block = %name, entities = entities.len(), "跳过布局块");
            return Ok(None);
        }
        Ok(Some(BlockDefinition {
            name,
            base_point,
            flags,
            entities,
        }))
    }

    /// 解析一条记录。游离的序列记录与属性定义返回 `None`。
    fn parse_record(&mut self, kind: &str) -> Result<Option<Entity>, DxfError> {
        match kind {
            "SEQEND" | "VERTEX" | "ATTRIB" | "ATTDEF" => {
                self.skip_entity_body()?;
                Ok(None)
            }
            "POLYLINE" => self.parse_polyline().map(Some),
            kind => self.parse_entity(kind).map(Some),
        }
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        if kind.is_empty() {
            return Err(DxfError::unsupported("实体类型名为空"));
        }
        let body = self.read_body(kind)?;
        let mut entity = match kind {
            "LINE" => line(&body),
            "CIRCLE" => circle(&body),
            "ARC" => arc(&body),
            "ELLIPSE" => ellipse(&body),
            "LWPOLYLINE" => lwpolyline(&body),
            "SPLINE" => spline(&body),
            "TEXT" => text(&body),
            "MTEXT" => mtext(&body),
            "POINT" => point(&body),
            "INSERT" => insert(&body),
            "HATCH" => hatch::hatch(&body).and_then(|entity| body.in_world(entity)),
            _ => Ok(unknown(body)),
        }?;
        if let Entity::BlockReference(reference) = &mut entity {
            reference.attributes = self.parse_attributes()?;
        }
        Ok(entity)
    }

    /// INSERT 之后的 ATTRIB 序列，遇到 SEQEND 结束；没有属性时不消耗后续记录。
    fn parse_attributes(&mut self) -> Result<Vec<Attribute>, DxfError> {
        let mut attributes = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, marker)) if marker.trim() == "ATTRIB" => {
                    attributes.push(attribute(&self.read_body("ATTRIB")?)?);
                }
                Some((0, marker)) if marker.trim() == "SEQEND" => {
                    self.skip_entity_body()?;
                    break;
                }
                Some(pair) => {
                    self.reader.put_back(pair)?;
                    break;
                }
                None => break,
            }
        }
        Ok(attributes)
    }

    /// 旧式 POLYLINE/VERTEX/SEQEND 序列。网格与多面网格不建模，整体保留为未知实体。
    fn parse_polyline(&mut self) -> Result<Entity, DxfError> {
        let header = self.read_body("POLYLINE")?;
        let flags = header.int(70, "标志")?.unwrap_or(0);
        let is_mesh = flags & (0x10 | 0x40) != 0;
        let mirrored = header.is_mirrored()?;
        let layer = header.layer();

        let mut vertices = Vec::new();
        // 网格序列按原样收集（含 VERTEX/SEQEND 记录），写出时可逐对还原
        let mut raw_sequence = header.pairs;
        loop {
            let (code, value) = self
                .reader
                .next_pair()?
                .ok_or_else(|| DxfError::invalid("POLYLINE 缺少 SEQEND 终止记录"))?;
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "POLYLINE 序列遇到组码 {code}（期望 0）"
                )));
            }
            let marker = value.trim();
            match marker {
                "VERTEX" | "SEQEND" if is_mesh => {
                    raw_sequence.push((0, marker.to_string()));
                    self.collect_entity_body(marker, &mut raw_sequence)?;
                }
                "VERTEX" => vertices.push(vertex(&self.read_body("VERTEX")?)?),
                "SEQEND" => self.skip_entity_body()?,
                other => {
                    return Err(DxfError::invalid(format!(
                        "POLYLINE 序列中出现意外实体 {other}"
                    )));
                }
            }
            if marker == "SEQEND" {
                break;
            }
        }

        if is_mesh {
            debug!(flags, "POLYLINE 网格未建模，保留为原始记录");
            return Ok(Entity::Unknown(UnknownEntity {
                kind: "POLYLINE".to_string(),
                layer,
                pairs: raw_sequence,
            }));
        }
        if vertices.is_empty() {
            return Err(DxfError::invalid("POLYLINE 未解析到任何顶点"));
        }
        let mut polyline = Entity::Polyline(Polyline {
            vertices,
            is_closed: flags & 0x01 != 0,
            layer,
        });
        if mirrored {
            ocs::to_world(&mut polyline);
        }
        Ok(polyline)
    }

    fn read_body<'k>(&mut self, kind: &'k str) -> Result<EntityBody<'k>, DxfError> {
        let mut pairs = Vec::new();
        self.collect_entity_body(kind, &mut pairs)?;
        Ok(EntityBody { kind, pairs })
    }

    /// 读取实体主体中的下一对组码，遇到下一个组码 0 时回退并返回 `None`。
    fn next_body_pair(&mut self, kind: &str) -> Result<Option<(i32, String)>, DxfError> {
        match self.reader.next_pair()? {
            Some((0, value)) => {
                self.reader.put_back((0, value))?;
                Ok(None)
            }
            Some(pair) => Ok(Some(pair)),
            None => Err(DxfError::invalid(format!("{kind} 未正确结束"))),
        }
    }

    fn collect_entity_body(
        &mut self,
        kind: &str,
        pairs: &mut Vec<(i32, String)>,
    ) -> Result<(), DxfError> {
        while let Some(pair) = self.next_body_pair(kind)? {
            pairs.push(pair);
        }
        Ok(())
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value))?;
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

/// 单个实体的组码（不含起始的组码 0），保持文件中的顺序。
struct EntityBody<'k> {
    kind: &'k str,
    pairs: Vec<(i32, String)>,
}

impl EntityBody<'_> {
    fn values(&self, code: i32) -> impl Iterator<Item = &str> + '_ {
        self.pairs
            .iter()
            .filter(move |(candidate, _)| *candidate == code)
            .map(|(_, value)| value.as_str())
    }

    fn context(&self, code: i32, what: &str) -> String {
        format!("{} {what}（组码 {code}）", self.kind)
    }

    fn missing(&self, code: i32, what: &str) -> DxfError {
        DxfError::invalid(format!("{} 缺少{what}（组码 {code}）", self.kind))
    }

    /// 空图层名按 "0" 处理。
    fn layer(&self) -> String {
        match self.values(8).next().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "0".to_string(),
        }
    }

    /// 只允许出现一次的实数组码。
    fn real(&self, code: i32, what: &str) -> Result<Option<f64>, DxfError> {
        let mut values = self.values(code);
        let Some(raw) = values.next() else {
            return Ok(None);
        };
        let context = self.context(code, what);
        if values.next().is_some() {
            return Err(DxfError::invalid(format!("{context} 出现重复值")));
        }
        parse_f64(raw, &context).map(Some)
    }

    fn required(&self, code: i32, what: &str) -> Result<f64, DxfError> {
        self.real(code, what)?
            .ok_or_else(|| self.missing(code, what))
    }

    /// X 在 `code`，Y 在 `code + 10`。
    fn point(&self, code: i32, what: &str) -> Result<Point2, DxfError> {
        let x = self.required(code, &format!("{what} X"))?;
        let y = self.required(code + 10, &format!("{what} Y"))?;
        Ok(Point2::new(x, y))
    }

    /// 两个分量齐全时才返回向量。
    fn vector(&self, code: i32, what: &str) -> Result<Option<Vector2>, DxfError> {
        let x = self.real(code, &format!("{what} X"))?;
        let y = self.real(code + 10, &format!("{what} Y"))?;
        Ok(x.zip(y).map(|(x, y)| Vector2::new(x, y)))
    }

    fn reals(&self, code: i32, what: &str) -> Result<Vec<f64>, DxfError> {
        let context = self.context(code, what);
        self.values(code).map(|raw| parse_f64(raw, &context)).collect()
    }

    /// 拉伸方向（组码 230）指向 -Z 时 OCS 的 X 轴与 WCS 相反。
    fn is_mirrored(&self) -> Result<bool, DxfError> {
        Ok(self.real(230, "拉伸方向 Z")?.is_some_and(|z| z < 0.0))
    }

    /// 整数组码，出现多次时以最后一次为准。
    fn int(&self, code: i32, what: &str) -> Result<Option<i32>, DxfError> {
        self.values(code)
            .last()
            .map(|raw| parse_i32(raw, &self.context(code, what)))
            .transpose()
    }

    /// 按拉伸方向把 OCS 坐标的实体换算到 WCS。
    fn in_world(&self, mut entity: Entity) -> Result<Entity, DxfError> {
        if self.is_mirrored()? {
            ocs::to_world(&mut entity);
        }
        Ok(entity)
    }

    /// 按出现顺序把 `code`/`code + 10` 配成点序列，X 必须先于 Y。
    fn point_run(&self, code: i32, what: &str) -> Result<Vec<Point2>, DxfError> {
        let y_code = code + 10;
        let mut points = Vec::new();
        let mut pending_x: Option<f64> = None;
        for (candidate, raw) in &self.pairs {
            if *candidate == code {
                let x = parse_f64(raw, &self.context(code, &format!("{what} X")))?;
                if pending_x.replace(x).is_some() {
                    return Err(DxfError::invalid(format!(
                        "{} {what} X（组码 {code}）在未提供 Y 之前重复出现",
                        self.kind
                    )));
                }
            } else if *candidate == y_code {
                let y = parse_f64(raw, &self.context(y_code, &format!("{what} Y")))?;
                let x = pending_x.take().ok_or_else(|| {
                    DxfError::invalid(format!(
                        "{} {what} Y（组码 {y_code}）缺少对应的 X",
                        self.kind
                    ))
                })?;
                points.push(Point2::new(x, y));
            }
        }
        if let Some(x) = pending_x {
            return Err(DxfError::invalid(format!(
                "{} {what} X={x} 缺少对应的 Y（组码 {y_code}）",
                self.kind
            )));
        }
        Ok(points)
    }
}

fn line(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    Ok(Entity::Line(Line {
        start: body.point(10, "起点")?,
        end: body.point(11, "终点")?,
        layer: body.layer(),
    }))
}

fn circle(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    body.in_world(Entity::Circle(Circle {
        center: body.point(10, "圆心")?,
        radius: body.required(40, "半径")?,
        layer: body.layer(),
    }))
}

/// 文件中的角度为度数，内部统一为弧度。
fn arc(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    body.in_world(Entity::Arc(Arc {
        center: body.point(10, "圆心")?,
        radius: body.required(40, "半径")?,
        start_angle: body.required(50, "起始角")?.to_radians(),
        end_angle: body.required(51, "终止角")?.to_radians(),
        layer: body.layer(),
    }))
}

fn ellipse(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    let center = body.point(10, "圆心")?;
    let major_axis = body
        .vector(11, "主轴向量")?
        .ok_or_else(|| body.missing(11, "主轴向量"))?;
    if major_axis.length_squared() < f64::EPSILON * f64::EPSILON {
        return Err(DxfError::invalid("ELLIPSE 主轴向量长度为 0，无法创建实体"));
    }
    let ratio = body.real(40, "半径比")?.unwrap_or(1.0);
    if ratio <= 0.0 {
        return Err(DxfError::invalid(format!(
            "ELLIPSE 半径比必须为正数，实际为 {ratio}"
        )));
    }
    body.in_world(Entity::Ellipse(Ellipse {
        center,
        major_axis,
        ratio,
        start_parameter: body.real(41, "起始参数")?.unwrap_or(0.0),
        end_parameter: body.real(42, "终止参数")?.unwrap_or(TAU),
        layer: body.layer(),
    }))
}

/// bulge（组码 42）归属于它之前最近完成的顶点。
fn lwpolyline(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    let mut vertices: Vec<PolylineVertex> = body
        .point_run(10, "顶点")?
        .into_iter()
        .map(PolylineVertex::new)
        .collect();
    if vertices.is_empty() {
        return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
    }

    let mut completed = 0usize;
    for (code, raw) in &body.pairs {
        match code {
            20 => completed += 1,
            42 => {
                let vertex = completed
                    .checked_sub(1)
                    .and_then(|index| vertices.get_mut(index))
                    .ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）")
                    })?;
                vertex.bulge = parse_f64(raw, &body.context(42, "顶点 bulge"))?;
            }
            _ => {}
        }
    }

    let flags = body.int(70, "标志")?.unwrap_or(0);
    body.in_world(Entity::Polyline(Polyline {
        vertices,
        is_closed: flags & 0x01 != 0,
        layer: body.layer(),
    }))
}

fn vertex(body: &EntityBody<'_>) -> Result<PolylineVertex, DxfError> {
    Ok(PolylineVertex::with_bulge(
        body.point(10, "坐标")?,
        body.real(42, "bulge")?.unwrap_or(0.0),
    ))
}

// 计数、公差、法向量等组码仅用于校验，不读取
fn spline(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    let flags = body.int(70, "类型标志")?.unwrap_or(0);
    let degree = body
        .int(71, "阶数")?
        .ok_or_else(|| body.missing(71, "阶数"))?;
    Ok(Entity::Spline(Spline {
        degree,
        is_closed: flags & 0x01 != 0,
        is_periodic: flags & 0x02 != 0,
        is_rational: flags & 0x04 != 0,
        control_points: body.point_run(10, "控制点")?,
        fit_points: body.point_run(11, "拟合点")?,
        knot_values: body.reals(40, "节点值")?,
        weights: body.reals(41, "权重")?,
        start_tangent: body.vector(12, "起始切向量")?,
        end_tangent: body.vector(13, "终止切向量")?,
        layer: body.layer(),
    }))
}

/// 多个组码 1 以换行连接。
fn text(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    let lines: Vec<&str> = body.values(1).collect();
    if lines.is_empty() {
        return Err(body.missing(1, "文本内容"));
    }
    body.in_world(Entity::Text(Text {
        insert: body.point(10, "插入点")?,
        content: lines.join("\n"),
        height: body.required(40, "文字高度")?,
        rotation: body.real(50, "旋转角")?.unwrap_or(0.0).to_radians(),
        layer: body.layer(),
    }))
}

/// 组码 3 为前置分块，组码 1 为最后一块。方向向量优先于旋转角。
fn mtext(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    let tail = body
        .values(1)
        .last()
        .ok_or_else(|| body.missing(1, "文本内容"))?;
    let mut raw: String = body.values(3).collect();
    raw.push_str(tail);

    let direction = match body.vector(11, "方向")? {
        Some(direction) => direction,
        None => match body.real(50, "旋转角")? {
            Some(angle) => Vector2::new(1.0, 0.0).rotate(angle.to_radians()),
            None => Vector2::new(1.0, 0.0),
        },
    };
    let attachment_point = match body.int(71, "附着点")? {
        Some(value) => i16::try_from(value).map_err(|_| {
            DxfError::invalid(format!("MTEXT 附着点超出范围（值：{value}）"))
        })?,
        None => 1,
    };

    Ok(Entity::MText(MText {
        insert: body.point(10, "插入点")?,
        content: decode_mtext_content(&raw),
        height: body.required(40, "文字高度")?,
        reference_width: body.real(41, "参考宽度")?,
        direction,
        attachment_point,
        layer: body.layer(),
    }))
}

fn point(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    Ok(Entity::Point(PointEntity {
        position: body.point(10, "位置")?,
        layer: body.layer(),
    }))
}

/// 属性由紧随其后的 ATTRIB 记录填充。
fn insert(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    let name = body
        .values(2)
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| body.missing(2, "块名"))?;
    body.in_world(Entity::BlockReference(BlockReference {
        name: name.to_string(),
        insert: body.point(10, "插入点")?,
        scale: Vector2::new(
            body.real(41, "X 缩放")?.unwrap_or(1.0),
            body.real(42, "Y 缩放")?.unwrap_or(1.0),
        ),
        rotation: body.real(50, "旋转角")?.unwrap_or(0.0).to_radians(),
        attributes: Vec::new(),
        layer: body.layer(),
    }))
}

fn attribute(body: &EntityBody<'_>) -> Result<Attribute, DxfError> {
    let mut insert = body.point(10, "插入点")?;
    let mut rotation = body.real(50, "旋转角")?.unwrap_or(0.0).to_radians();
    if body.is_mirrored()? {
        ocs::mirror_text(&mut insert, &mut rotation);
    }
    Ok(Attribute {
        tag: body.values(2).next().unwrap_or_default().trim().to_string(),
        value: body.values(1).last().unwrap_or_default().to_string(),
        insert,
        height: body.required(40, "文字高度")?,
        rotation,
        layer: body.layer(),
    })
}

fn unknown(body: EntityBody<'_>) -> Entity {
    warn!(kind = body.kind, "未建模的实体类型，保留原始组码");
    Entity::Unknown(UnknownEntity {
        kind: body.kind.to_string(),
        layer: body.layer(),
        pairs: body.pairs,
    })
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 文件末尾的空行不计入组码
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) -> Result<(), DxfError> {
        if self.buffer.is_some() {
            return Err(DxfError::invalid("内部错误：尝试多次回退 DXF pair"));
        }
        self.buffer = Some(pair);
        Ok(())
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn decode_mtext_content(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('P') | Some('p') => result.push('\n'),
                Some('~') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}
