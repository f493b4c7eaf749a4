mod golden;

use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec2;

use dxfmerge_core::{
    document::{
        Attribute, BlockDefinition, BlockReference, Document, Entity, Hatch, HatchBoundary,
        HatchEdge, HatchLoop, HatchPatternLine, Line, MText, PolylineVertex, UnknownEntity,
    },
    geometry::{Point2, Vector2},
};
use dxfmerge_io::{DocumentLoader, DocumentSaver, DxfFacade, IoError};
use golden::{assert_documents_close, fixture};

const BASIC_ENTITIES: &str = "\
999
basic entities
0
SECTION
2
HEADER
9
$ACADVER
1
AC1015
0
ENDSEC
0
SECTION
2
ENTITIES
0
LINE
8
CUT
10
0.0
20
0.0
30
0.0
11
10.0
21
5.0
31
0.0
0
CIRCLE
8
CUT
10
20.0
20
20.0
40
2.5
0
ARC
8
0
10
0.0
20
0.0
40
4.0
50
0.0
51
90.0
0
LWPOLYLINE
8
OUTLINE
90
2
70
1
10
0.0
20
0.0
42
1.0
10
10.0
20
0.0
0
TEXT
8
NOTE
10
1.0
20
2.0
40
3.5
1
PART-7
50
90.0
0
MTEXT
10
5.0
20
6.0
40
2.0
3
first line\\P
1
second line
0
POINT
10
7.0
20
8.0
0
WIPEOUT
8
FILL
70
1
0
ENDSEC
0
EOF
";

fn load(contents: &str) -> Result<Document, IoError> {
    let file = fixture(contents);
    DxfFacade::new().load(file.path())
}

#[test]
fn load_basic_entities_preserves_geometry() {
    let doc = load(BASIC_ENTITIES).expect("读取 DXF 失败");
    let kinds: Vec<&str> = doc.entities().map(|(_, e)| e.kind_name()).collect();
    assert_eq!(
        kinds,
        ["LINE", "CIRCLE", "ARC", "LWPOLYLINE", "TEXT", "MTEXT", "POINT", "WIPEOUT"]
    );

    let mut entities = doc.entities().map(|(_, entity)| entity);
    match entities.next() {
        Some(Entity::Line(line)) => {
            assert_eq!(line.layer, "CUT");
            assert!(line.end.as_vec2().abs_diff_eq(DVec2::new(10.0, 5.0), 1e-9));
        }
        other => panic!("期望 LINE，实际 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Circle(circle)) => assert!((circle.radius - 2.5).abs() < 1e-9),
        other => panic!("期望 CIRCLE，实际 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Arc(arc)) => {
            assert!(arc.start_angle.abs() < 1e-9);
            assert!((arc.end_angle - FRAC_PI_2).abs() < 1e-9);
        }
        other => panic!("期望 ARC，实际 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Polyline(polyline)) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.vertices.len(), 2);
            assert!((polyline.vertices[0].bulge - 1.0).abs() < 1e-9);
            assert!(polyline.vertices[1].bulge.abs() < 1e-9);
        }
        other => panic!("期望 LWPOLYLINE，实际 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Text(text)) => {
            assert_eq!(text.content, "PART-7");
            assert!((text.rotation - FRAC_PI_2).abs() < 1e-9);
        }
        other => panic!("期望 TEXT，实际 {other:?}"),
    }
    match entities.next() {
        Some(Entity::MText(mtext)) => {
            assert_eq!(mtext.content, "first line\nsecond line");
            assert_eq!(mtext.layer, "0");
            assert!(mtext.direction.as_vec2().abs_diff_eq(DVec2::X, 1e-12));
        }
        other => panic!("期望 MTEXT，实际 {other:?}"),
    }
    assert!(matches!(entities.next(), Some(Entity::Point(_))));
    match entities.next() {
        Some(Entity::Unknown(unknown)) => {
            assert_eq!(unknown.layer, "FILL");
            assert_eq!(unknown.pairs, vec![(8, "FILL".to_string()), (70, "1".to_string())]);
        }
        other => panic!("期望未知实体，实际 {other:?}"),
    }

    let mut layers: Vec<&str> = doc.layers().map(|layer| layer.name.as_str()).collect();
    layers.sort_unstable();
    assert_eq!(layers, ["0", "CUT", "FILL", "NOTE", "OUTLINE"]);
}

#[test]
fn bulged_polyline_bounds_cover_the_arc() {
    let doc = load(BASIC_ENTITIES).expect("读取 DXF 失败");
    let polyline = doc
        .entities()
        .find_map(|(id, entity)| matches!(entity, Entity::Polyline(_)).then_some(*id))
        .expect("未找到多段线实体");
    let bounds = doc.entity_bounds(polyline).expect("多段线应有包围盒");
    // 半圆凸度向下鼓出 5 个单位
    assert!((bounds.min().y() + 5.0).abs() < 1e-9);
    assert!((bounds.max().y() - 0.0).abs() < 1e-9);
}

#[test]
fn legacy_polyline_becomes_lightweight_polyline() {
    let contents = "\
0
SECTION
2
ENTITIES
0
POLYLINE
8
PROFILE
66
1
70
1
0
VERTEX
10
0.0
20
0.0
0
VERTEX
10
4.0
20
0.0
42
0.5
0
VERTEX
10
4.0
20
3.0
0
SEQEND
0
ENDSEC
0
EOF
";
    let doc = load(contents).expect("读取 POLYLINE 失败");
    assert_eq!(doc.entity_count(), 1);
    match doc.entities().next().map(|(_, entity)| entity) {
        Some(Entity::Polyline(polyline)) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.layer, "PROFILE");
            assert_eq!(polyline.vertices.len(), 3);
            assert!((polyline.vertices[1].bulge - 0.5).abs() < 1e-9);
        }
        other => panic!("期望多段线，实际 {other:?}"),
    }
}

#[test]
fn polyface_mesh_is_kept_verbatim() {
    let contents = "\
0
SECTION
2
ENTITIES
0
POLYLINE
8
MESH
70
64
0
VERTEX
10
1.0
20
2.0
0
SEQEND
0
ENDSEC
0
EOF
";
    let doc = load(contents).expect("读取多面网格失败");
    match doc.entities().next().map(|(_, entity)| entity) {
        Some(Entity::Unknown(unknown)) => {
            assert_eq!(unknown.kind, "POLYLINE");
            assert!(!unknown.pairs.is_empty());
            assert!(unknown.pairs.contains(&(0, "VERTEX".to_string())));
            assert_eq!(unknown.pairs.last(), Some(&(0, "SEQEND".to_string())));
        }
        other => panic!("期望未知实体，实际 {other:?}"),
    }
}

#[test]
fn truncated_file_is_invalid() {
    let contents = "0\nSECTION\n2\nENTITIES\n0\nLINE\n10\n";
    let err = load(contents).unwrap_err();
    assert!(matches!(err, IoError::InvalidDocument(_)), "实际错误：{err}");
}

#[test]
fn line_without_end_point_is_invalid() {
    let contents = "0\nSECTION\n2\nENTITIES\n0\nLINE\n10\n1.0\n20\n1.0\n0\nENDSEC\n0\nEOF\n";
    let err = load(contents).unwrap_err();
    match err {
        IoError::InvalidDocument(message) => assert!(message.contains("LINE")),
        other => panic!("期望 InvalidDocument，实际 {other}"),
    }
}

#[test]
fn saved_document_loads_back_unchanged() {
    let mut doc = Document::new();
    doc.add_line(Point2::new(-1.25, 0.5), Point2::new(3.0, 7.75), "CUT");
    doc.add_circle(Point2::new(10.0, 10.0), 0.125, "CUT");
    doc.add_arc(Point2::new(1.0, 1.0), 2.0, 0.3, 2.1, "ARCS");
    doc.add_polyline_with_vertices(
        [
            PolylineVertex::new(Point2::new(0.0, 0.0)),
            PolylineVertex::with_bulge(Point2::new(5.0, 0.0), -0.4),
            PolylineVertex::new(Point2::new(5.0, 5.0)),
        ],
        true,
        "OUTLINE",
    );
    doc.add_text(Point2::new(2.0, 3.0), "LABEL", 1.8, 0.7, "NOTE");
    doc.add_entity(Entity::MText(MText {
        insert: Point2::new(4.0, 4.0),
        content: "two\nlines \\ slash".to_string(),
        height: 2.0,
        reference_width: Some(30.0),
        direction: Vector2::new(0.0, 1.0),
        attachment_point: 5,
        layer: "NOTE".to_string(),
    }));
    doc.add_entity(Entity::Unknown(UnknownEntity {
        kind: "WIPEOUT".to_string(),
        layer: "FILL".to_string(),
        pairs: vec![(8, "FILL".to_string()), (70, "1".to_string())],
    }));
    doc.add_entity(Entity::Hatch(Hatch {
        pattern_name: "ANSI31".to_string(),
        is_solid: false,
        loops: vec![
            HatchLoop {
                flags: 3,
                boundary: HatchBoundary::Polyline {
                    vertices: vec![
                        PolylineVertex::new(Point2::new(0.0, 0.0)),
                        PolylineVertex::with_bulge(Point2::new(8.0, 0.0), 0.25),
                        PolylineVertex::new(Point2::new(8.0, 6.0)),
                    ],
                    is_closed: true,
                },
            },
            HatchLoop {
                flags: 1,
                boundary: HatchBoundary::Edges(vec![
                    HatchEdge::Line {
                        start: Point2::new(1.0, 1.0),
                        end: Point2::new(3.0, 1.0),
                    },
                    HatchEdge::Arc {
                        center: Point2::new(3.0, 2.0),
                        radius: 1.0,
                        start_angle: -FRAC_PI_2,
                        end_angle: FRAC_PI_2,
                        is_counter_clockwise: true,
                    },
                    HatchEdge::Ellipse {
                        center: Point2::new(2.0, 3.0),
                        major_axis: Vector2::new(1.0, 0.0),
                        ratio: 0.5,
                        start_angle: -PI,
                        end_angle: 0.0,
                        is_counter_clockwise: false,
                    },
                    HatchEdge::Spline {
                        degree: 2,
                        is_rational: true,
                        is_periodic: false,
                        knot_values: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
                        control_points: vec![
                            Point2::new(1.0, 3.0),
                            Point2::new(0.5, 2.0),
                            Point2::new(1.0, 1.0),
                        ],
                        weights: vec![1.0, 0.5, 1.0],
                    },
                ]),
            },
        ],
        pattern_angle: 0.25,
        pattern_scale: 1.5,
        pattern_lines: vec![HatchPatternLine {
            angle: 0.25,
            base: Point2::new(0.0, 0.0),
            offset: Vector2::new(-0.75, 2.5),
            dashes: vec![2.0, -0.5],
        }],
        seeds: vec![Point2::new(4.0, 2.0)],
        layer: "FILL".to_string(),
    }));
    doc.add_block(BlockDefinition {
        name: "PART".to_string(),
        base_point: Point2::new(1.0, 2.0),
        flags: 2,
        entities: vec![Entity::Line(Line {
            start: Point2::new(0.0, 0.0),
            end: Point2::new(5.0, 5.0),
            layer: "PARTS".to_string(),
        })],
    });
    doc.add_entity(Entity::BlockReference(BlockReference {
        name: "PART".to_string(),
        insert: Point2::new(20.0, 5.0),
        scale: Vector2::new(2.0, 0.5),
        rotation: 0.4,
        attributes: vec![Attribute {
            tag: "ID".to_string(),
            value: "A-7".to_string(),
            insert: Point2::new(21.0, 6.0),
            height: 1.25,
            rotation: 0.4,
            layer: "NOTE".to_string(),
        }],
        layer: "PARTS".to_string(),
    }));

    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("round_trip.dxf");
    let facade = DxfFacade::new();
    facade.save(&doc, &path).expect("写出 DXF 失败");
    let loaded = facade.load(&path).expect("重新读取 DXF 失败");

    assert_documents_close(&doc, &loaded, 1e-9);
    let block = loaded.block("PART").expect("块定义未写出");
    assert_eq!(loaded.blocks().count(), 1);
    assert_eq!(block.entities.len(), 1);
    assert_eq!(block.flags, 2);
    assert_eq!(block.base_point, Point2::new(1.0, 2.0));
}

#[test]
fn saving_into_missing_directory_reports_write_error() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("missing").join("out.dxf");
    let err = DxfFacade::new().save(&Document::new(), &path).unwrap_err();
    assert!(matches!(err, IoError::WriteError { .. }));
}

fn entities_section(body: &str) -> String {
    format!("0\nSECTION\n2\nENTITIES\n{body}0\nENDSEC\n0\nEOF\n")
}

#[test]
fn mirrored_circle_is_centred_in_world_coordinates() {
    let contents = entities_section(
        "0\nCIRCLE\n8\n0\n10\n10.0\n20\n0.0\n30\n0.0\n40\n1.0\n210\n0.0\n220\n0.0\n230\n-1.0\n",
    );
    let doc = load(&contents).expect("读取镜像圆失败");
    let bounds = doc.bounds().expect("圆应有包围盒");
    assert!(bounds.min().as_vec2().abs_diff_eq(DVec2::new(-11.0, -1.0), 1e-9));
    assert!(bounds.max().as_vec2().abs_diff_eq(DVec2::new(-9.0, 1.0), 1e-9));
}

#[test]
fn mirrored_arc_and_polyline_keep_their_shape() {
    // OCS 中 0°..90° 的圆弧镜像后位于世界坐标第二象限
    let contents = entities_section(concat!(
        "0\nARC\n10\n0.0\n20\n0.0\n40\n2.0\n50\n0.0\n51\n90.0\n230\n-1.0\n",
        "0\nLWPOLYLINE\n90\n2\n70\n0\n10\n0.0\n20\n0.0\n42\n1.0\n10\n4.0\n20\n0.0\n230\n-1.0\n",
    ));
    let doc = load(&contents).expect("读取镜像实体失败");
    let mut entities = doc.entities().map(|(id, entity)| (*id, entity));

    let (arc_id, arc) = entities.next().expect("arc");
    match arc {
        Entity::Arc(arc) => {
            assert!((arc.start_angle - FRAC_PI_2).abs() < 1e-9);
            assert!((arc.end_angle - PI).abs() < 1e-9);
        }
        other => panic!("期望 ARC，实际 {other:?}"),
    }
    let bounds = doc.entity_bounds(arc_id).expect("arc bounds");
    assert!(bounds.min().as_vec2().abs_diff_eq(DVec2::new(-2.0, 0.0), 1e-9));
    assert!(bounds.max().as_vec2().abs_diff_eq(DVec2::new(0.0, 2.0), 1e-9));

    // OCS 中向下鼓出的半圆，镜像后仍向下鼓出
    let (polyline_id, polyline) = entities.next().expect("polyline");
    match polyline {
        Entity::Polyline(polyline) => {
            assert_eq!(polyline.vertices[1].position, Point2::new(-4.0, 0.0));
            assert!((polyline.vertices[0].bulge + 1.0).abs() < 1e-9);
        }
        other => panic!("期望多段线，实际 {other:?}"),
    }
    let bounds = doc.entity_bounds(polyline_id).expect("polyline bounds");
    assert!((bounds.min().y() + 2.0).abs() < 1e-9);
    assert!(bounds.max().y().abs() < 1e-9);
}

const INSERT_ONLY: &str = "\
0
SECTION
2
BLOCKS
0
BLOCK
8
0
2
*Model_Space
70
0
10
0.0
20
0.0
0
ENDBLK
8
0
0
BLOCK
8
0
2
PART
70
0
10
0.0
20
0.0
30
0.0
3
PART
1

0
LINE
8
0
10
0.0
20
0.0
11
5.0
21
5.0
0
ENDBLK
8
0
0
ENDSEC
0
SECTION
2
ENTITIES
0
INSERT
8
PARTS
66
1
2
PART
10
10.0
20
10.0
0
ATTRIB
8
PARTS
10
11.0
20
12.0
40
1.0
1
A-1
2
ID
0
SEQEND
8
PARTS
0
LINE
8
CUT
10
30.0
20
30.0
11
31.0
21
31.0
0
ENDSEC
0
EOF
";

#[test]
fn insert_extent_comes_from_its_block() {
    let doc = load(INSERT_ONLY).expect("读取块参照失败");
    assert_eq!(doc.blocks().count(), 1);
    assert!(doc.block("*Model_Space").is_none());

    let kinds: Vec<&str> = doc.entities().map(|(_, e)| e.kind_name()).collect();
    assert_eq!(kinds, ["INSERT", "LINE"]);
    let (insert_id, insert) = doc.entities().next().expect("insert");
    match insert {
        Entity::BlockReference(reference) => {
            assert_eq!(reference.name, "PART");
            assert_eq!(reference.attributes.len(), 1);
            assert_eq!(reference.attributes[0].tag, "ID");
            assert_eq!(reference.attributes[0].value, "A-1");
        }
        other => panic!("期望 INSERT，实际 {other:?}"),
    }
    let bounds = doc.entity_bounds(*insert_id).expect("块参照应有包围盒");
    assert!(bounds.min().as_vec2().abs_diff_eq(DVec2::new(10.0, 10.0), 1e-9));
    assert!(bounds.max().as_vec2().abs_diff_eq(DVec2::new(15.0, 15.0), 1e-9));
}

#[test]
fn block_without_endblk_is_invalid() {
    let contents = concat!(
        "0\nSECTION\n2\nBLOCKS\n0\nBLOCK\n2\nPART\n",
        "0\nLINE\n10\n0\n20\n0\n11\n1\n21\n1\n0\nENDSEC\n0\nEOF\n",
    );
    match load(contents).unwrap_err() {
        IoError::InvalidDocument(message) => assert!(message.contains("ENDBLK")),
        other => panic!("期望 InvalidDocument，实际 {other}"),
    }
}

#[test]
fn hatch_boundary_defines_its_extent() {
    let contents = entities_section(concat!(
        "0\nHATCH\n8\nFILL\n10\n0\n20\n0\n30\n0\n210\n0\n220\n0\n230\n1\n",
        "2\nSOLID\n70\n1\n71\n0\n91\n2\n",
        "92\n2\n72\n0\n73\n1\n93\n3\n10\n0\n20\n0\n10\n6\n20\n0\n10\n6\n20\n4\n97\n0\n",
        "92\n16\n93\n1\n72\n2\n10\n3\n20\n4\n40\n1\n50\n0\n51\n180\n73\n1\n97\n0\n",
        "75\n0\n76\n1\n98\n1\n10\n3\n20\n1\n",
    ));
    let doc = load(&contents).expect("读取填充失败");
    let (id, entity) = doc.entities().next().expect("hatch");
    match entity {
        Entity::Hatch(hatch) => {
            assert!(hatch.is_solid);
            assert_eq!(hatch.layer, "FILL");
            assert_eq!(hatch.loops.len(), 2);
            assert!(matches!(hatch.loops[0].boundary, HatchBoundary::Polyline { .. }));
            assert!(matches!(&hatch.loops[1].boundary, HatchBoundary::Edges(edges) if edges.len() == 1));
            assert_eq!(hatch.seeds, vec![Point2::new(3.0, 1.0)]);
        }
        other => panic!("期望 HATCH，实际 {other:?}"),
    }
    // 圆弧边顶点 (3, 5) 高于多段线环路
    let bounds = doc.entity_bounds(*id).expect("填充应有包围盒");
    assert!(bounds.min().as_vec2().abs_diff_eq(DVec2::new(0.0, 0.0), 1e-9));
    assert!(bounds.max().as_vec2().abs_diff_eq(DVec2::new(6.0, 5.0), 1e-9));
}
