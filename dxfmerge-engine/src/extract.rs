use std::path::{Path, PathBuf};

use dxfmerge_core::document::Document;
use dxfmerge_core::geometry::Bounds2D;
use tracing::info;

use crate::errors::ExtractError;

/// 已加载的单张图纸，加载后不再修改。
#[derive(Debug, Clone)]
pub struct Drawing {
    name: String,
    path: PathBuf,
    document: Document,
}

impl Drawing {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, document: Document) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            document,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// 图纸与其外包矩形。
#[derive(Debug, Clone)]
pub struct SizedDrawing {
    drawing: Drawing,
    bbox: Bounds2D,
}

impl SizedDrawing {
    #[inline]
    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    #[inline]
    pub fn bbox(&self) -> Bounds2D {
        self.bbox
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.bbox.width()
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.bbox.height()
    }
}

/// 计算图纸全部实体的轴对齐外包矩形。
pub fn extract(drawing: &Drawing) -> Result<Bounds2D, ExtractError> {
    let bbox = drawing
        .document()
        .bounds()
        .ok_or_else(|| ExtractError::EmptyGeometry {
            name: drawing.name().to_string(),
        })?;
    info!(
        drawing = drawing.name(),
        width = bbox.width(),
        height = bbox.height(),
        "外包矩形"
    );
    Ok(bbox)
}

/// 批量提取。任一图纸为空即整体失败，不返回部分结果。
pub fn extract_all(drawings: Vec<Drawing>) -> Result<Vec<SizedDrawing>, ExtractError> {
    drawings
        .into_iter()
        .map(|drawing| {
            let bbox = extract(&drawing)?;
            Ok(SizedDrawing { drawing, bbox })
        })
        .collect()
}
