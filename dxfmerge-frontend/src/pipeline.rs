use std::path::PathBuf;

use dxfmerge_config::NestingConfig;
use dxfmerge_engine::{Container, SizedDrawing, extract_all, merge, pack_layout};
use dxfmerge_io::{DocumentLoader, DocumentSaver};
use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::loader::load_drawings;
use crate::report::NestReport;

/// 一次排样任务的输入。
#[derive(Debug, Clone)]
pub struct NestRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub container: Container,
    pub border: bool,
}

impl NestRequest {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>, nesting: &NestingConfig) -> Self {
        Self {
            inputs,
            output: output.into(),
            container: Container::new(
                nesting.container_width,
                nesting.container_height,
                nesting.gap,
            ),
            border: nesting.border,
        }
    }
}

/// 加载 → 外包矩形 → 排样 → 合并 → 写出。前四步任一失败都不会触及输出文件。
pub fn run<I>(request: &NestRequest, io: &I) -> Result<NestReport, PipelineError>
where
    I: DocumentLoader + DocumentSaver + ?Sized,
{
    if request.inputs.is_empty() {
        return Err(PipelineError::NoInputs);
    }

    info!(count = request.inputs.len(), "步骤1: 读取图纸");
    let drawings = load_drawings(io, &request.inputs)?;

    info!("步骤2: 计算外包矩形");
    let sized: Vec<SizedDrawing> = extract_all(drawings)?;

    info!(
        width = request.container.width,
        height = request.container.height,
        gap = request.container.gap,
        "步骤3: 排样布局"
    );
    let boxes: Vec<_> = sized.iter().map(SizedDrawing::bbox).collect();
    let layout = pack_layout(&boxes, &request.container);
    let placements = layout.placements(&sized);
    info!(cols = layout.grid.cols, rows = layout.grid.rows, "网格已确定");

    info!("步骤4: 合并图纸");
    let merged = merge(&placements, request.border.then_some(&request.container));
    if !merged.skipped().is_empty() {
        warn!(skipped = merged.skipped().len(), "部分实体未能合并");
    }

    info!(path = %request.output.display(), "步骤5: 写出合并结果");
    io.save(merged.document(), &request.output)
        .map_err(|source| PipelineError::Write {
            path: request.output.clone(),
            source,
        })?;

    Ok(NestReport::new(
        request.output.clone(),
        &request.container,
        request.border,
        &layout,
        &placements,
        &merged,
    ))
}
