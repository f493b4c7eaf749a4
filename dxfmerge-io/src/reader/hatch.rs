//! HATCH 需要按组码顺序解析：环路数、边数、图案线数与种子点数决定其后组码的含义，
//! 同一组码（例如 10/20）在不同位置分别表示标高点、边界顶点或种子点。

use dxfmerge_core::{
    document::{
        Entity, Hatch, HatchBoundary, HatchEdge, HatchLoop, HatchPatternLine, PolylineVertex,
    },
    geometry::{Point2, Vector2},
};

use super::{DxfError, EntityBody, parse_f64, parse_i32};

/// 渐变色（450 起）与扩展数据不保留。
pub(super) fn hatch(body: &EntityBody<'_>) -> Result<Entity, DxfError> {
    let mut cursor = Cursor {
        kind: body.kind,
        pairs: &body.pairs,
        index: 0,
    };

    let mut pattern_name = None;
    let mut is_solid = false;
    let mut loop_count = 0;
    while let Some((code, raw)) = cursor.next() {
        match code {
            2 => pattern_name = Some(raw.trim().to_string()),
            70 => is_solid = cursor.parse_int(code, raw, "实心填充标志")? != 0,
            91 => {
                loop_count = cursor.parse_count(code, raw, "环路数")?;
                break;
            }
            _ => {}
        }
    }

    let mut loops = Vec::new();
    for _ in 0..loop_count {
        loops.push(boundary_loop(&mut cursor)?);
    }

    let mut pattern_angle = 0.0;
    let mut pattern_scale = 1.0;
    let mut pattern_lines = Vec::new();
    let mut seeds = Vec::new();
    while let Some((code, raw)) = cursor.next() {
        match code {
            52 => pattern_angle = cursor.parse_real(code, raw, "图案角度")?.to_radians(),
            41 => pattern_scale = cursor.parse_real(code, raw, "图案比例")?,
            78 => {
                for _ in 0..cursor.parse_count(code, raw, "图案线数")? {
                    pattern_lines.push(pattern_line(&mut cursor)?);
                }
            }
            98 => {
                for _ in 0..cursor.parse_count(code, raw, "种子点数")? {
                    seeds.push(cursor.point(10, "种子点")?);
                }
            }
            _ => {}
        }
    }

    Ok(Entity::Hatch(Hatch {
        pattern_name: pattern_name.unwrap_or_else(|| "SOLID".to_string()),
        is_solid,
        loops,
        pattern_angle,
        pattern_scale,
        pattern_lines,
        seeds,
        layer: body.layer(),
    }))
}

fn boundary_loop(cursor: &mut Cursor<'_>) -> Result<HatchLoop, DxfError> {
    let flags = cursor.int(92, "边界类型")?;
    let boundary = if flags & 0x02 != 0 {
        let has_bulge = cursor.optional_int(72, "凸度标志")?.unwrap_or(0) != 0;
        let is_closed = cursor.optional_int(73, "闭合标志")?.unwrap_or(0) != 0;
        let count = cursor.count(93, "顶点数")?;
        let mut vertices = Vec::new();
        for _ in 0..count {
            let position = cursor.point(10, "边界顶点")?;
            let bulge = if has_bulge {
                cursor.optional_real(42, "凸度")?.unwrap_or(0.0)
            } else {
                0.0
            };
            vertices.push(PolylineVertex::with_bulge(position, bulge));
        }
        HatchBoundary::Polyline {
            vertices,
            is_closed,
        }
    } else {
        let count = cursor.count(93, "边数")?;
        let mut edges = Vec::new();
        for _ in 0..count {
            edges.push(edge(cursor)?);
        }
        HatchBoundary::Edges(edges)
    };

    // 关联的源边界对象句柄，合并后不再有效
    if cursor.peek() == Some(97) {
        for _ in 0..cursor.count(97, "源对象数")? {
            cursor.require(330, "源对象句柄")?;
        }
    }
    Ok(HatchLoop { flags, boundary })
}

fn edge(cursor: &mut Cursor<'_>) -> Result<HatchEdge, DxfError> {
    match cursor.int(72, "边类型")? {
        1 => {
            let start = cursor.point(10, "直线边起点")?;
            let end = cursor.point(11, "直线边终点")?;
            Ok(HatchEdge::Line { start, end })
        }
        2 => {
            let center = cursor.point(10, "圆弧边圆心")?;
            let radius = cursor.real(40, "圆弧边半径")?;
            let start_angle = cursor.real(50, "圆弧边起始角")?.to_radians();
            let end_angle = cursor.real(51, "圆弧边终止角")?.to_radians();
            Ok(HatchEdge::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                is_counter_clockwise: cursor.optional_int(73, "逆时针标志")?.unwrap_or(1) != 0,
            })
        }
        3 => {
            let center = cursor.point(10, "椭圆边圆心")?;
            let axis = cursor.point(11, "椭圆边主轴")?;
            let ratio = cursor.real(40, "椭圆边轴比")?;
            let start_angle = cursor.real(50, "椭圆边起始参数")?.to_radians();
            let end_angle = cursor.real(51, "椭圆边终止参数")?.to_radians();
            Ok(HatchEdge::Ellipse {
                center,
                major_axis: Vector2::new(axis.x(), axis.y()),
                ratio,
                start_angle,
                end_angle,
                is_counter_clockwise: cursor.optional_int(73, "逆时针标志")?.unwrap_or(1) != 0,
            })
        }
        4 => spline_edge(cursor),
        other => Err(DxfError::invalid(format!(
            "{} 不支持的边类型 {other}",
            cursor.kind
        ))),
    }
}

fn spline_edge(cursor: &mut Cursor<'_>) -> Result<HatchEdge, DxfError> {
    let degree = cursor.int(94, "样条边阶数")?;
    let is_rational = cursor.int(73, "有理标志")? != 0;
    let is_periodic = cursor.int(74, "周期标志")? != 0;
    let knot_count = cursor.count(95, "节点数")?;
    let control_count = cursor.count(96, "控制点数")?;

    let mut knot_values = Vec::new();
    for _ in 0..knot_count {
        knot_values.push(cursor.real(40, "节点值")?);
    }
    let mut control_points = Vec::new();
    let mut weights = Vec::new();
    for _ in 0..control_count {
        control_points.push(cursor.point(10, "控制点")?);
        if let Some(weight) = cursor.optional_real(42, "权重")? {
            weights.push(weight);
        }
    }

    // R2010 起的拟合点与端点切向只用于编辑，读取后丢弃。
    // 组码 97 也是环路的源对象数，靠其后的组码区分。
    if cursor.peek() == Some(97) && matches!(cursor.peek_after(), Some(11 | 12 | 13 | 72 | 97)) {
        for _ in 0..cursor.count(97, "拟合点数")? {
            cursor.point(11, "拟合点")?;
        }
        for code in [12, 13] {
            if cursor.peek() == Some(code) {
                cursor.point(code, "端点切向")?;
            }
        }
    }

    Ok(HatchEdge::Spline {
        degree,
        is_rational,
        is_periodic,
        knot_values,
        control_points,
        weights,
    })
}

fn pattern_line(cursor: &mut Cursor<'_>) -> Result<HatchPatternLine, DxfError> {
    let angle = cursor.real(53, "图案线角度")?.to_radians();
    let base = Point2::new(cursor.real(43, "图案线基点 X")?, cursor.real(44, "图案线基点 Y")?);
    let offset = Vector2::new(cursor.real(45, "图案线偏移 X")?, cursor.real(46, "图案线偏移 Y")?);
    let mut dashes = Vec::new();
    for _ in 0..cursor.count(79, "虚线段数")? {
        dashes.push(cursor.real(49, "虚线段长")?);
    }
    Ok(HatchPatternLine {
        angle,
        base,
        offset,
        dashes,
    })
}

/// 顺序读取实体组码。
struct Cursor<'b> {
    kind: &'b str,
    pairs: &'b [(i32, String)],
    index: usize,
}

impl<'b> Cursor<'b> {
    fn next(&mut self) -> Option<(i32, &'b str)> {
        let (code, raw) = self.pairs.get(self.index)?;
        self.index += 1;
        Some((*code, raw.as_str()))
    }

    fn peek(&self) -> Option<i32> {
        self.pairs.get(self.index).map(|(code, _)| *code)
    }

    fn peek_after(&self) -> Option<i32> {
        self.pairs.get(self.index + 1).map(|(code, _)| *code)
    }

    fn context(&self, code: i32, what: &str) -> String {
        format!("{} {what}（组码 {code}）", self.kind)
    }

    fn parse_real(&self, code: i32, raw: &str, what: &str) -> Result<f64, DxfError> {
        parse_f64(raw, &self.context(code, what))
    }

    fn parse_int(&self, code: i32, raw: &str, what: &str) -> Result<i32, DxfError> {
        parse_i32(raw, &self.context(code, what))
    }

    fn parse_count(&self, code: i32, raw: &str, what: &str) -> Result<usize, DxfError> {
        let value = self.parse_int(code, raw, what)?;
        usize::try_from(value).map_err(|_| {
            DxfError::invalid(format!("{} 不能为负数（值：{value}）", self.context(code, what)))
        })
    }

    /// 下一个组码必须是 `code`。
    fn require(&mut self, code: i32, what: &str) -> Result<&'b str, DxfError> {
        match self.next() {
            Some((found, raw)) if found == code => Ok(raw),
            Some((found, _)) => Err(DxfError::invalid(format!(
                "{} 处遇到组码 {found}",
                self.context(code, what)
            ))),
            None => Err(DxfError::invalid(format!(
                "{} 缺少{what}（组码 {code}）",
                self.kind
            ))),
        }
    }

    fn real(&mut self, code: i32, what: &str) -> Result<f64, DxfError> {
        let raw = self.require(code, what)?;
        self.parse_real(code, raw, what)
    }

    fn int(&mut self, code: i32, what: &str) -> Result<i32, DxfError> {
        let raw = self.require(code, what)?;
        self.parse_int(code, raw, what)
    }

    fn count(&mut self, code: i32, what: &str) -> Result<usize, DxfError> {
        let raw = self.require(code, what)?;
        self.parse_count(code, raw, what)
    }

    /// X 在 `code`，Y 紧随其后在 `code + 10`。
    fn point(&mut self, code: i32, what: &str) -> Result<Point2, DxfError> {
        let x = self.real(code, what)?;
        let y = self.real(code + 10, what)?;
        Ok(Point2::new(x, y))
    }

    fn optional_real(&mut self, code: i32, what: &str) -> Result<Option<f64>, DxfError> {
        if self.peek() == Some(code) {
            self.real(code, what).map(Some)
        } else {
            Ok(None)
        }
    }

    fn optional_int(&mut self, code: i32, what: &str) -> Result<Option<i32>, DxfError> {
        if self.peek() == Some(code) {
            self.int(code, what).map(Some)
        } else {
            Ok(None)
        }
    }
}
