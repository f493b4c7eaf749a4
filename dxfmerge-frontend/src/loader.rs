use std::path::PathBuf;

use dxfmerge_engine::Drawing;
use dxfmerge_io::{DocumentLoader, drawing_name};
use tracing::{info, warn};

use crate::errors::PipelineError;

/// 依次加载全部输入，任一文件失败即中止。
pub fn load_drawings<L>(loader: &L, paths: &[PathBuf]) -> Result<Vec<Drawing>, PipelineError>
where
    L: DocumentLoader + ?Sized,
{
    paths
        .iter()
        .map(|path| match loader.load(path) {
            Ok(document) => {
                info!(
                    path = %path.display(),
                    entities = document.entity_count(),
                    "成功读取图纸"
                );
                Ok(Drawing::new(drawing_name(path), path.clone(), document))
            }
            Err(source) => {
                warn!(path = %path.display(), error = %source, "读取图纸失败");
                Err(PipelineError::Load {
                    path: path.clone(),
                    source,
                })
            }
        })
        .collect()
}
