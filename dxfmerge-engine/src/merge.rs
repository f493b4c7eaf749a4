use std::collections::{HashMap, HashSet};

use dxfmerge_core::document::{Document, Entity, EntityId};
use dxfmerge_core::geometry::{Point2, Vector2};
use tracing::{debug, info, warn};

use crate::errors::MergeIssue;
use crate::packer::{Container, Placement};

/// 容器边框所在图层。
pub const BORDER_LAYER: &str = "BORDER";

/// 合并时被跳过的实体。
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntity {
    pub drawing: String,
    pub entity_kind: String,
    pub issue: MergeIssue,
}

/// 合并输出：变换后的实体副本、可选的容器边框以及跳过记录。
#[derive(Debug, Clone)]
pub struct MergedDocument {
    document: Document,
    border: Option<EntityId>,
    skipped: Vec<SkippedEntity>,
}

impl MergedDocument {
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    pub fn border(&self) -> Option<EntityId> {
        self.border
    }

    #[inline]
    pub fn skipped(&self) -> &[SkippedEntity] {
        &self.skipped
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// 添加 `(0,0)` 起点、尺寸为 `width × height` 的矩形边框，首尾点重合。
pub fn add_border(document: &mut Document, width: f64, height: f64) -> EntityId {
    document.add_polyline(
        [
            Point2::new(0.0, 0.0),
            Point2::new(width, 0.0),
            Point2::new(width, height),
            Point2::new(0.0, height),
            Point2::new(0.0, 0.0),
        ],
        false,
        BORDER_LAYER,
    )
}

/// 按放置结果把每张图纸的实体副本变换到目标位置并汇总到新文档。
///
/// 平移量为 `position - bbox.min`。旋转角非零时，副本先在原坐标系中绕原点旋转
/// （不支持旋转的实体保持原方向），再平移到目标位置。
/// 单个实体失败只记录并跳过，不影响其余实体和图纸。源图纸不会被修改。
///
/// 块定义保持块内坐标原样复制，只有块参照随图纸移动。不同图纸的同名块
/// 以 `名称_序号` 重命名，对应的块参照一并改名。
pub fn merge(placements: &[Placement<'_>], border: Option<&Container>) -> MergedDocument {
    let mut target = MergeTarget {
        document: Document::new(),
        skipped: Vec::new(),
    };
    let border = border.map(|container| {
        add_border(&mut target.document, container.width, container.height)
    });

    for placement in placements {
        let drawing = placement.sized.drawing();
        let name = drawing.name();
        let translation = placement.sized.bbox().min().vector_to(placement.position);
        let rotation = placement.rotation_degrees.to_radians();
        let skipped_before = target.skipped.len();

        let renames = target.import_blocks(drawing.document(), name);
        for (_, entity) in drawing.document().entities() {
            target.copy_placed(entity, rotation, translation, name, &renames);
        }

        info!(
            drawing = name,
            x = placement.position.x(),
            y = placement.position.y(),
            rotation = placement.rotation_degrees,
            skipped = target.skipped.len() - skipped_before,
            "图纸已合并"
        );
    }

    MergedDocument {
        document: target.document,
        border,
        skipped: target.skipped,
    }
}

struct MergeTarget {
    document: Document,
    skipped: Vec<SkippedEntity>,
}

impl MergeTarget {
    /// 返回本图纸块名到目标文档块名的改名表，未改名的块不在表中。
    fn import_blocks(&mut self, source: &Document, drawing: &str) -> HashMap<String, String> {
        let mut taken: HashSet<String> = self
            .document
            .blocks()
            .chain(source.blocks())
            .map(|block| block.name.clone())
            .collect();
        let mut blocks: Vec<_> = source.blocks().collect();
        blocks.sort_unstable_by(|a, b| a.name.cmp(&b.name));

        let mut renames = HashMap::new();
        for block in &blocks {
            if self.document.block(&block.name).is_none() {
                continue;
            }
            let mut suffix = 1;
            let mut renamed = format!("{}_{suffix}", block.name);
            while taken.contains(&renamed) {
                suffix += 1;
                renamed = format!("{}_{suffix}", block.name);
            }
            debug!(drawing, block = %block.name, renamed = %renamed, "块名冲突，已重命名");
            taken.insert(renamed.clone());
            renames.insert(block.name.clone(), renamed);
        }

        for block in blocks {
            let mut copy = block.clone();
            if let Some(renamed) = renames.get(&copy.name) {
                copy.name = renamed.clone();
            }
            for entity in &mut copy.entities {
                rename_reference(entity, &renames);
            }
            self.document.add_block(copy);
        }
        renames
    }

    fn copy_placed(
        &mut self,
        entity: &Entity,
        rotation: f64,
        translation: Vector2,
        drawing: &str,
        renames: &HashMap<String, String>,
    ) {
        let mut copy = entity.clone();
        rename_reference(&mut copy, renames);
        let kind = entity.kind_name().to_string();
        if rotation != 0.0 {
            if let Err(err) = copy.rotate_about_origin(rotation) {
                debug!(drawing, %err, "实体保持未旋转");
            }
        }
        let issue = match copy.translate(translation) {
            Err(_) => Some(MergeIssue::TranslateUnsupported { kind: kind.clone() }),
            Ok(()) if !copy.is_finite() => {
                Some(MergeIssue::NonFiniteGeometry { kind: kind.clone() })
            }
            Ok(()) => None,
        };

        match issue {
            Some(issue) => {
                warn!(drawing, kind = %kind, %issue, "实体复制失败，已跳过");
                self.skipped.push(SkippedEntity {
                    drawing: drawing.to_string(),
                    entity_kind: kind,
                    issue,
                });
            }
            None => {
                self.document.add_entity(copy);
            }
        }
    }
}

fn rename_reference(entity: &mut Entity, renames: &HashMap<String, String>) {
    if let Entity::BlockReference(reference) = entity {
        if let Some(renamed) = renames.get(&reference.name) {
            reference.name = renamed.clone();
        }
    }
}
