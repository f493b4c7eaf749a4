use std::fmt::{self, Write};
use std::path::PathBuf;

use dxfmerge_engine::{Container, MergedDocument, PackLayout, Placement};
use serde::Serialize;

/// 单次排样的结果摘要，可输出为文本或 JSON。
#[derive(Debug, Clone, Serialize)]
pub struct NestReport {
    pub output: PathBuf,
    pub container: ContainerSummary,
    pub grid: GridSummary,
    pub placements: Vec<PlacementSummary>,
    pub skipped: Vec<SkippedSummary>,
    pub merged_entities: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContainerSummary {
    pub width: f64,
    pub height: f64,
    pub gap: f64,
    pub border: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GridSummary {
    pub cols: usize,
    pub rows: usize,
    pub total_width: f64,
    pub total_height: f64,
    pub fits: bool,
    pub clamped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementSummary {
    pub name: String,
    pub path: PathBuf,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation_degrees: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSummary {
    pub drawing: String,
    pub entity_kind: String,
    pub reason: String,
}

impl NestReport {
    pub(crate) fn new(
        output: PathBuf,
        container: &Container,
        border: bool,
        layout: &PackLayout,
        placements: &[Placement<'_>],
        merged: &MergedDocument,
    ) -> Self {
        Self {
            output,
            container: ContainerSummary {
                width: container.width,
                height: container.height,
                gap: container.gap,
                border,
            },
            grid: GridSummary {
                cols: layout.grid.cols,
                rows: layout.grid.rows,
                total_width: layout.total_width,
                total_height: layout.total_height,
                fits: layout.fits,
                clamped: layout.clamped,
            },
            placements: placements
                .iter()
                .map(|placement| {
                    let drawing = placement.sized.drawing();
                    PlacementSummary {
                        name: drawing.name().to_string(),
                        path: drawing.path().to_path_buf(),
                        x: placement.position.x(),
                        y: placement.position.y(),
                        width: placement.sized.width(),
                        height: placement.sized.height(),
                        rotation_degrees: placement.rotation_degrees,
                    }
                })
                .collect(),
            skipped: merged
                .skipped()
                .iter()
                .map(|skipped| SkippedSummary {
                    drawing: skipped.drawing.clone(),
                    entity_kind: skipped.entity_kind.clone(),
                    reason: skipped.issue.to_string(),
                })
                .collect(),
            merged_entities: merged.document().entity_count(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 控制台文本格式。
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // 写入 String 不会失败
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "排样结果:")?;
        for (index, placement) in self.placements.iter().enumerate() {
            writeln!(out, "图形 {}: {}", index + 1, placement.name)?;
            writeln!(out, "  位置: ({:.2}, {:.2})", placement.x, placement.y)?;
            writeln!(out, "  尺寸: {:.2} x {:.2}", placement.width, placement.height)?;
            if placement.rotation_degrees != 0.0 {
                writeln!(out, "  旋转: {}度", placement.rotation_degrees)?;
            }
        }
        writeln!(
            out,
            "网格: {} 列 x {} 行, 占用 {:.2} x {:.2} / 容器 {:.2} x {:.2}",
            self.grid.cols,
            self.grid.rows,
            self.grid.total_width,
            self.grid.total_height,
            self.container.width,
            self.container.height
        )?;
        if !self.grid.fits {
            writeln!(out, "警告: 排样结果超出容器范围")?;
        }
        if !self.skipped.is_empty() {
            writeln!(out, "跳过的实体 ({}):", self.skipped.len())?;
            for skipped in &self.skipped {
                writeln!(
                    out,
                    "  - {} / {}: {}",
                    skipped.drawing, skipped.entity_kind, skipped.reason
                )?;
            }
        }
        writeln!(out, "处理完成! 文件已保存至: {}", self.output.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NestReport {
        NestReport {
            output: PathBuf::from("merged_result.dxf"),
            container: ContainerSummary {
                width: 100.0,
                height: 100.0,
                gap: 8.0,
                border: true,
            },
            grid: GridSummary {
                cols: 1,
                rows: 2,
                total_width: 40.0,
                total_height: 78.0,
                fits: true,
                clamped: false,
            },
            placements: vec![PlacementSummary {
                name: "file1.dxf".to_string(),
                path: PathBuf::from("parts/file1.dxf"),
                x: 30.0,
                y: 11.0,
                width: 40.0,
                height: 30.0,
                rotation_degrees: 0.0,
            }],
            skipped: vec![SkippedSummary {
                drawing: "file1.dxf".to_string(),
                entity_kind: "ACAD_PROXY_ENTITY".to_string(),
                reason: "ACAD_PROXY_ENTITY cannot be translated".to_string(),
            }],
            merged_entities: 3,
        }
    }

    #[test]
    fn text_report_lists_placements() {
        let text = sample().render_text();
        assert!(text.starts_with("排样结果:\n图形 1: file1.dxf\n  位置: (30.00, 11.00)\n  尺寸: 40.00 x 30.00\n"));
        assert!(!text.contains("旋转"));
        assert!(!text.contains("警告"));
        assert!(text.contains("  - file1.dxf / ACAD_PROXY_ENTITY: ACAD_PROXY_ENTITY cannot be translated"));
        assert!(text.ends_with("文件已保存至: merged_result.dxf\n"));
    }

    #[test]
    fn json_report_has_stable_fields() {
        let json = sample().to_json().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["placements"][0]["name"], "file1.dxf");
        assert_eq!(value["grid"]["cols"], 1);
        assert_eq!(value["container"]["border"], true);
        assert_eq!(value["skipped"][0]["entity_kind"], "ACAD_PROXY_ENTITY");
        assert_eq!(value["merged_entities"], 3);
    }
}
