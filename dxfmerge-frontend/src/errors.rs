use std::path::PathBuf;

use dxfmerge_engine::errors::ExtractError;
use dxfmerge_io::IoError;
use thiserror::Error;

/// 流水线致命错误，均会中止本次排样且不写出结果文件。
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("未提供任何输入图纸")]
    NoInputs,
    #[error("加载图纸 {path:?} 失败: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("计算外包矩形失败: {0}")]
    Extract(#[from] ExtractError),
    #[error("写出合并结果 {path:?} 失败: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: IoError,
    },
}

impl PipelineError {
    /// 出错阶段名，供日志使用。
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::NoInputs => "input",
            PipelineError::Load { .. } => "load",
            PipelineError::Extract(_) => "extract",
            PipelineError::Write { .. } => "write",
        }
    }
}
