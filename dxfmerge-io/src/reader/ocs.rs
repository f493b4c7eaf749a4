//! 拉伸方向为 (0, 0, -1) 的实体（MIRROR 命令的常见产物）在对象坐标系中记录坐标，
//! 该坐标系的 X 轴与世界坐标系相反。这里把它们换算回世界坐标。
//!
//! LINE、SPLINE、MTEXT、POINT 本身就以世界坐标记录，不做处理。

use std::f64::consts::PI;

use dxfmerge_core::{
    document::{Entity, HatchBoundary, HatchEdge, PolylineVertex},
    geometry::{Point2, Vector2},
};

fn mirror(point: Point2) -> Point2 {
    Point2::new(-point.x(), point.y())
}

/// 方向角 θ 镜像后为 π - θ，逆时针区间的起止互换。
fn mirror_sweep(start: f64, end: f64) -> (f64, f64) {
    (PI - end, PI - start)
}

fn mirror_vertices(vertices: &mut [PolylineVertex]) {
    for vertex in vertices {
        vertex.position = mirror(vertex.position);
        vertex.bulge = -vertex.bulge;
    }
}

pub(super) fn mirror_text(insert: &mut Point2, rotation: &mut f64) {
    *insert = mirror(*insert);
    *rotation = PI - *rotation;
}

pub(super) fn to_world(entity: &mut Entity) {
    match entity {
        Entity::Circle(circle) => circle.center = mirror(circle.center),
        Entity::Arc(arc) => {
            arc.center = mirror(arc.center);
            (arc.start_angle, arc.end_angle) = mirror_sweep(arc.start_angle, arc.end_angle);
        }
        // 圆心与主轴已是世界坐标，只有短轴随法向翻转，参数区间取反
        Entity::Ellipse(ellipse) => {
            (ellipse.start_parameter, ellipse.end_parameter) =
                (-ellipse.end_parameter, -ellipse.start_parameter);
        }
        Entity::Polyline(polyline) => mirror_vertices(&mut polyline.vertices),
        Entity::Text(text) => mirror_text(&mut text.insert, &mut text.rotation),
        Entity::BlockReference(reference) => {
            reference.insert = mirror(reference.insert);
            reference.rotation = -reference.rotation;
            reference.scale = Vector2::new(-reference.scale.x(), reference.scale.y());
        }
        Entity::Hatch(hatch) => {
            for path in &mut hatch.loops {
                match &mut path.boundary {
                    HatchBoundary::Polyline { vertices, .. } => mirror_vertices(vertices),
                    HatchBoundary::Edges(edges) => edges.iter_mut().for_each(mirror_edge),
                }
            }
            for seed in &mut hatch.seeds {
                *seed = mirror(*seed);
            }
            hatch.pattern_angle = PI - hatch.pattern_angle;
            for line in &mut hatch.pattern_lines {
                line.angle = PI - line.angle;
                line.base = mirror(line.base);
                line.offset = Vector2::new(-line.offset.x(), line.offset.y());
            }
        }
        Entity::Line(_)
        | Entity::Spline(_)
        | Entity::MText(_)
        | Entity::Point(_)
        | Entity::Unknown(_) => {}
    }
}

/// 镜像使环路走向反转：逆时针边变为顺时针边，沿用顺时针边取反储存角度的约定。
fn mirror_edge(edge: &mut HatchEdge) {
    match edge {
        HatchEdge::Line { start, end } => {
            *start = mirror(*start);
            *end = mirror(*end);
        }
        HatchEdge::Arc {
            center,
            start_angle,
            end_angle,
            is_counter_clockwise,
            ..
        } => {
            *center = mirror(*center);
            let shift = if *is_counter_clockwise { -PI } else { PI };
            *start_angle += shift;
            *end_angle += shift;
            *is_counter_clockwise = !*is_counter_clockwise;
        }
        HatchEdge::Ellipse {
            center,
            major_axis,
            is_counter_clockwise,
            ..
        } => {
            *center = mirror(*center);
            *major_axis = Vector2::new(-major_axis.x(), major_axis.y());
            *is_counter_clockwise = !*is_counter_clockwise;
        }
        HatchEdge::Spline { control_points, .. } => {
            for point in control_points {
                *point = mirror(*point);
            }
        }
    }
}
