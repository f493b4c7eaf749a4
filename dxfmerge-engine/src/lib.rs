pub mod extract;
pub mod merge;
pub mod packer;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ExtractError {
        #[error("drawing {name} contains no geometry with defined extents")]
        EmptyGeometry { name: String },
    }

    /// 合并阶段的单实体问题，只记录不传播。
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum MergeIssue {
        #[error("{kind} cannot be translated")]
        TranslateUnsupported { kind: String },
        #[error("transformed {kind} has non-finite coordinates")]
        NonFiniteGeometry { kind: String },
    }
}

pub use extract::{Drawing, SizedDrawing, extract, extract_all};
pub use merge::{MergedDocument, SkippedEntity, add_border, merge, BORDER_LAYER};
pub use packer::{Container, Grid, PackLayout, Placement, Slot, pack, pack_layout};
