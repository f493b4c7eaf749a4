use std::fs;
use std::path::PathBuf;

use dxfmerge_config::NestingConfig;
use dxfmerge_core::document::{Document, Entity};
use dxfmerge_core::geometry::Point2;
use dxfmerge_frontend::{NestRequest, PipelineError, run};
use dxfmerge_io::{DocumentLoader, DocumentSaver, DxfFacade};

fn write_square(dir: &tempfile::TempDir, name: &str, origin: (f64, f64), size: f64) -> PathBuf {
    let mut document = Document::new();
    let (x, y) = origin;
    document.add_polyline(
        [
            Point2::new(x, y),
            Point2::new(x + size, y),
            Point2::new(x + size, y + size),
            Point2::new(x, y + size),
        ],
        true,
        "PART",
    );
    document.add_circle(Point2::new(x + size / 2.0, y + size / 2.0), size / 4.0, "HOLES");
    let path = dir.path().join(name);
    DxfFacade::new().save(&document, &path).expect("写出输入 DXF 失败");
    path
}

#[test]
fn merged_file_starts_with_border_and_keeps_all_entities() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let inputs = vec![
        write_square(&dir, "left.dxf", (-50.0, 10.0), 20.0),
        write_square(&dir, "right.dxf", (300.0, 300.0), 35.0),
    ];
    let output = dir.path().join("merged.dxf");
    let request = NestRequest::new(inputs, &output, &NestingConfig::default());

    let report = run(&request, &DxfFacade::new()).expect("排样流程失败");
    assert_eq!(report.placements.len(), 2);
    assert_eq!(report.placements[0].name, "right.dxf");
    assert!(report.skipped.is_empty());

    let merged = DxfFacade::new().load(&output).expect("读取合并结果失败");
    assert_eq!(merged.entity_count(), 5);
    match merged.entities().next().map(|(_, entity)| entity) {
        Some(Entity::Polyline(border)) => {
            assert_eq!(border.layer, "BORDER");
            assert_eq!(border.vertices.len(), 5);
        }
        other => panic!("首个实体应为边框，实际 {other:?}"),
    }

    let bounds = merged.bounds().expect("合并结果应有包围盒");
    assert!(bounds.min().x() >= -1e-9 && bounds.min().y() >= -1e-9);
    assert!(bounds.max().x() <= 100.0 + 1e-9 && bounds.max().y() <= 100.0 + 1e-9);
}

#[test]
fn empty_input_leaves_no_output_file() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let blank = dir.path().join("blank.dxf");
    DxfFacade::new()
        .save(&Document::new(), &blank)
        .expect("写出空 DXF 失败");
    let inputs = vec![write_square(&dir, "part.dxf", (0.0, 0.0), 10.0), blank];
    let output = dir.path().join("merged.dxf");
    let request = NestRequest::new(inputs, &output, &NestingConfig::default());

    let err = run(&request, &DxfFacade::new()).unwrap_err();
    assert!(matches!(err, PipelineError::Extract(_)));
    assert!(!output.exists());
    assert!(fs::read_dir(dir.path()).expect("列出目录").count() == 2);
}
