//! 网格排样：按面积降序逐行填入网格，宽度超出时增加列数，最后整体居中。

use dxfmerge_core::geometry::{Bounds2D, Point2};
use tracing::{debug, warn};

use crate::extract::SizedDrawing;

/// 排样容器尺寸与图形间距。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub width: f64,
    pub height: f64,
    pub gap: f64,
}

impl Container {
    pub fn new(width: f64, height: f64, gap: f64) -> Self {
        Self { width, height, gap }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            gap: 8.0,
        }
    }
}

/// 网格行列数及每列最大宽度、每行最大高度。
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    pub col_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
}

impl Grid {
    /// 按行优先把已排序的尺寸分配到 `cols × rows` 网格中。
    fn measure(sizes: &[(f64, f64)], cols: usize, rows: usize) -> Self {
        let mut col_widths = vec![0.0_f64; cols];
        let mut row_heights = vec![0.0_f64; rows];
        for (index, &(width, height)) in sizes.iter().enumerate() {
            let (row, col) = (index / cols, index % cols);
            if row < rows {
                col_widths[col] = col_widths[col].max(width);
                row_heights[row] = row_heights[row].max(height);
            }
        }
        Self {
            cols,
            rows,
            col_widths,
            row_heights,
        }
    }

    pub fn total_width(&self, gap: f64) -> f64 {
        self.col_widths.iter().sum::<f64>() + self.cols.saturating_sub(1) as f64 * gap
    }

    pub fn total_height(&self, gap: f64) -> f64 {
        self.row_heights.iter().sum::<f64>() + self.rows.saturating_sub(1) as f64 * gap
    }
}

/// 单个矩形的落位结果。`index` 指向输入序列中的位置。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub position: Point2,
    pub width: f64,
    pub height: f64,
}

/// 完整排样结果，槽位按行优先（即面积降序）排列。
#[derive(Debug, Clone, PartialEq)]
pub struct PackLayout {
    pub slots: Vec<Slot>,
    pub grid: Grid,
    pub total_width: f64,
    pub total_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// 整体占用范围是否落在容器内。
    pub fits: bool,
    /// 列数（初始估算或迭代增加后）超过图形数，被强制收敛为单行。
    pub clamped: bool,
}

impl PackLayout {
    fn empty() -> Self {
        Self {
            slots: Vec::new(),
            grid: Grid {
                cols: 0,
                rows: 0,
                col_widths: Vec::new(),
                row_heights: Vec::new(),
            },
            total_width: 0.0,
            total_height: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            fits: true,
            clamped: false,
        }
    }

    /// 将槽位映射回图纸。`drawings` 必须与生成布局时的输入一一对应。
    pub fn placements<'a>(&self, drawings: &'a [SizedDrawing]) -> Vec<Placement<'a>> {
        self.slots
            .iter()
            .filter_map(|slot| {
                drawings.get(slot.index).map(|sized| Placement {
                    sized,
                    position: slot.position,
                    rotation_degrees: 0.0,
                })
            })
            .collect()
    }
}

/// 图纸的目标位置：外包矩形最小角移动到 `position`，旋转先于平移、绕原点进行。
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub sized: &'a SizedDrawing,
    pub position: Point2,
    pub rotation_degrees: f64,
}

/// 对一组图纸排样，每张图纸对应一个放置结果。
pub fn pack<'a>(drawings: &'a [SizedDrawing], container: &Container) -> Vec<Placement<'a>> {
    let boxes: Vec<Bounds2D> = drawings.iter().map(SizedDrawing::bbox).collect();
    pack_layout(&boxes, container).placements(drawings)
}

pub fn pack_layout(boxes: &[Bounds2D], container: &Container) -> PackLayout {
    let count = boxes.len();
    if count == 0 {
        return PackLayout::empty();
    }

    // 面积降序，稳定排序保证等面积时保持输入顺序
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| boxes[b].area().total_cmp(&boxes[a].area()));
    let sizes: Vec<(f64, f64)> = order
        .iter()
        .map(|&index| (boxes[index].width(), boxes[index].height()))
        .collect();

    let avg_width = sizes.iter().map(|size| size.0).sum::<f64>() / count as f64;
    let avg_height = sizes.iter().map(|size| size.1).sum::<f64>() / count as f64;
    let (mut cols, mut clamped) = initial_columns(count, avg_width, avg_height, container);
    let mut rows = count.div_ceil(cols);

    for _ in 0..=count {
        let grid = Grid::measure(&sizes, cols, rows);
        let width_overflow = grid.total_width(container.gap) > container.width;
        let height_overflow = grid.total_height(container.gap) > container.height;
        if !width_overflow && !height_overflow {
            break;
        }
        if !width_overflow {
            // 行数只由列数决定，仅高度超出时再迭代也不会变化
            debug!(cols, rows, "仅高度超出容器，保留当前网格");
            break;
        }

        cols += 1;
        rows = count.div_ceil(cols);
        if cols > count {
            cols = count;
            rows = 1;
            clamped = true;
            break;
        }
    }

    let grid = Grid::measure(&sizes, cols, rows);
    let total_width = grid.total_width(container.gap);
    let total_height = grid.total_height(container.gap);
    let offset_x = (container.width - total_width) / 2.0;
    let offset_y = (container.height - total_height) / 2.0;
    let fits = total_width <= container.width && total_height <= container.height;

    let mut slots = Vec::with_capacity(count);
    let mut cursor_y = offset_y;
    for row in 0..grid.rows {
        let mut cursor_x = offset_x;
        for col in 0..grid.cols {
            let rank = row * grid.cols + col;
            if let Some(&(width, height)) = sizes.get(rank) {
                let x = cursor_x + (grid.col_widths[col] - width) / 2.0;
                let y = cursor_y + (grid.row_heights[row] - height) / 2.0;
                slots.push(Slot {
                    index: order[rank],
                    row,
                    col,
                    position: Point2::new(x, y),
                    width,
                    height,
                });
            }
            cursor_x += grid.col_widths[col] + container.gap;
        }
        if row + 1 < grid.rows {
            cursor_y += grid.row_heights[row] + container.gap;
        }
    }

    if !fits {
        warn!(
            cols = grid.cols,
            rows = grid.rows,
            total_width,
            total_height,
            container_width = container.width,
            container_height = container.height,
            clamped,
            "排样结果超出容器范围"
        );
    }
    debug!(cols = grid.cols, rows = grid.rows, offset_x, offset_y, "网格排样完成");

    PackLayout {
        slots,
        grid,
        total_width,
        total_height,
        offset_x,
        offset_y,
        fits,
        clamped,
    }
}

/// 按平均宽高比与容器比例估算初始列数，结果限制在 `[1, count]`。
/// 第二个返回值表示估算超过图形数（含非有限值）而被压到 `count`。
fn initial_columns(
    count: usize,
    avg_width: f64,
    avg_height: f64,
    container: &Container,
) -> (usize, bool) {
    let estimate =
        (count as f64 * avg_width / avg_height * container.height / container.width).sqrt();
    if !estimate.is_finite() {
        return (count, true);
    }
    let cols = estimate.floor() as usize;
    if cols > count {
        debug!(estimate, count, "初始列数超过图形数，压缩为单行");
        (count, true)
    } else {
        (cols.max(1), false)
    }
}
