/// 矩形选区
///
/// 把指针拖动转换为"行区间 × 列区间"的选区。坐标基于当前显示的行序列，
/// 第 0 列为键列，第 1..N 列为各语言。
use serde::{Deserialize, Serialize};

/// 单元格坐标（显示行号, 列号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// 闭区间矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl CellRange {
    pub fn between(a: CellPos, b: CellPos) -> Self {
        Self {
            min_row: a.row.min(b.row),
            max_row: a.row.max(b.row),
            min_col: a.col.min(b.col),
            max_col: a.col.max(b.col),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }

    /// 是否包含键列（包含时批量操作为删除整行）
    pub fn includes_key_column(&self) -> bool {
        self.min_col == 0
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.min_row..=self.max_row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<usize> {
        self.min_col..=self.max_col
    }
}

/// 选区追踪器
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    anchor: Option<CellPos>,
    current: Option<CellPos>,
    dragging: bool,
    /// 选区建立时行表的 generation
    generation: u64,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按下：以该单元格为锚点开始新选区
    pub fn pointer_down(&mut self, cell: CellPos) {
        self.anchor = Some(cell);
        self.current = Some(cell);
        self.dragging = true;
    }

    /// 拖动经过单元格；未按下时忽略
    pub fn pointer_enter(&mut self, cell: CellPos) {
        if self.dragging {
            self.current = Some(cell);
        }
    }

    /// 全局抬起：结束拖动，选区保留
    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// 一次性设置选区（键盘或命令行输入）
    pub fn select(&mut self, from: CellPos, to: CellPos) {
        self.pointer_down(from);
        self.pointer_enter(to);
        self.pointer_up();
    }

    pub fn range(&self) -> Option<CellRange> {
        match (self.anchor, self.current) {
            (Some(a), Some(c)) => Some(CellRange::between(a, c)),
            _ => None,
        }
    }

    pub fn is_selected(&self, row: usize, col: usize) -> bool {
        self.range().map_or(false, |r| r.contains(row, col))
    }

    pub fn is_empty(&self) -> bool {
        self.anchor.is_none()
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.current = None;
        self.dragging = false;
    }

    /// 与当前显示状态同步
    ///
    /// 行序列身份改变时清空；否则把坐标限制在显示范围内。
    pub fn sync(&mut self, generation: u64, row_count: usize, col_count: usize) {
        if generation != self.generation {
            self.generation = generation;
            self.clear();
            return;
        }
        if row_count == 0 || col_count == 0 {
            self.clear();
            return;
        }
        let clamp = |cell: CellPos| CellPos::new(cell.row.min(row_count - 1), cell.col.min(col_count - 1));
        self.anchor = self.anchor.map(clamp);
        self.current = self.current.map(clamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_builds_normalized_range() {
        let mut selection = SelectionTracker::new();
        selection.pointer_down(CellPos::new(5, 2));
        selection.pointer_enter(CellPos::new(3, 0));
        selection.pointer_up();

        let range = selection.range().unwrap();
        assert_eq!(range, CellRange { min_row: 3, max_row: 5, min_col: 0, max_col: 2 });
        assert!(range.includes_key_column());
        assert!(selection.is_selected(4, 1));
        assert!(!selection.is_selected(6, 1));
    }

    #[test]
    fn test_enter_without_button_is_ignored() {
        let mut selection = SelectionTracker::new();
        selection.pointer_enter(CellPos::new(1, 1));
        assert!(selection.range().is_none());

        selection.pointer_down(CellPos::new(0, 1));
        selection.pointer_up();
        selection.pointer_enter(CellPos::new(4, 2));
        assert_eq!(selection.range().unwrap().max_row, 0);
    }

    #[test]
    fn test_sync_clears_on_generation_change_and_clamps() {
        let mut selection = SelectionTracker::new();
        selection.select(CellPos::new(1, 1), CellPos::new(9, 3));
        selection.sync(0, 5, 3);
        assert_eq!(selection.range().unwrap(), CellRange { min_row: 1, max_row: 4, min_col: 1, max_col: 2 });

        selection.sync(1, 5, 3);
        assert!(selection.is_empty());
    }
}
