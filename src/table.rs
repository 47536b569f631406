/// 行表：资源组在内存中的投影
///
/// 每个键一行，行按 `locale_cmp` 排序。文件才是权威数据，这里只是快照；
/// 编辑时先乐观修改快照，失败后整体重新加载。
use serde::{Deserialize, Serialize};

use crate::io::ResourceStore;
use crate::resource_types::{Group, Row};
use crate::utils::{locale_cmp, ResxError};

/// 对单行的乐观修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPatch {
    /// 设置某语言的值
    SetValue { lang: String, value: String },
    /// 重命名（会重新排序）
    Rename { new_key: String },
    /// 删除整行
    Remove,
    /// 插入新行（行号被忽略，按排序位置插入）
    Insert(Row),
}

/// 视图过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    /// 在键和各语言值中做不区分大小写的子串匹配，空串匹配所有行
    pub query: String,
    /// 只显示至少有一个空单元格的行
    pub blanks_only: bool,
}

impl RowFilter {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            blanks_only: false,
        }
    }

    pub fn blanks() -> Self {
        Self {
            query: String::new(),
            blanks_only: true,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.blanks_only
    }

    /// 判断行是否可见
    ///
    /// # 参数
    /// * `languages` - 组内全部语言（缺失的值按空单元格计）
    pub fn matches(&self, row: &Row, languages: &[&str]) -> bool {
        if self.blanks_only
            && !languages
                .iter()
                .any(|lang| row.display_value(lang).trim().is_empty())
        {
            return false;
        }

        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        row.key.to_lowercase().contains(&needle)
            || row.values.values().any(|v| v.to_lowercase().contains(&needle))
    }
}

/// 行表
#[derive(Debug, Clone, Default)]
pub struct RowTable {
    rows: Vec<Row>,
    /// 行序列变化时递增，用于让依赖行号的状态失效
    generation: u64,
}

impl RowTable {
    /// 从存储加载组内全部文件
    pub fn load<S: ResourceStore + ?Sized>(store: &S, group: &Group) -> Result<Self, ResxError> {
        let rows = store.load_rows(&group.files)?;
        log::debug!("加载资源组 {}: {} 行", group.name, rows.len());
        Ok(Self { rows, generation: 0 })
    }

    /// 直接由行构建（行会被排序）
    pub fn from_rows(mut rows: Vec<Row>) -> Self {
        rows.sort_by(|a, b| locale_cmp(&a.key, &b.key));
        Self { rows, generation: 0 }
    }

    /// 丢弃快照并重新加载
    ///
    /// 加载失败时保留旧快照。
    pub fn reload<S: ResourceStore + ?Sized>(&mut self, store: &S, group: &Group) -> Result<(), ResxError> {
        let rows = store.load_rows(&group.files)?;
        self.rows = rows;
        self.generation += 1;
        log::debug!("重新加载资源组 {}: {} 行", group.name, self.rows.len());
        Ok(())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position_of(key).is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 立即修改快照
    ///
    /// # 返回
    /// 修改后该行所在的行号；删除或行号越界时返回 None
    pub fn apply_optimistic(&mut self, index: usize, patch: RowPatch) -> Option<usize> {
        match patch {
            RowPatch::SetValue { lang, value } => {
                let row = self.rows.get_mut(index)?;
                row.values.insert(lang, value);
                Some(index)
            }
            RowPatch::Rename { new_key } => {
                let mut row = self.take(index)?;
                row.key = new_key;
                Some(self.insert_sorted(row))
            }
            RowPatch::Remove => {
                self.take(index)?;
                None
            }
            RowPatch::Insert(row) => Some(self.insert_sorted(row)),
        }
    }

    /// 当前过滤条件下显示的行号序列
    pub fn display_indices(&self, filter: &RowFilter, languages: &[&str]) -> Vec<usize> {
        if !filter.is_active() {
            return (0..self.rows.len()).collect();
        }
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.matches(row, languages))
            .map(|(i, _)| i)
            .collect()
    }

    fn take(&mut self, index: usize) -> Option<Row> {
        if index >= self.rows.len() {
            return None;
        }
        self.generation += 1;
        Some(self.rows.remove(index))
    }

    fn insert_sorted(&mut self, row: Row) -> usize {
        let index = self
            .rows
            .partition_point(|r| locale_cmp(&r.key, &row.key).is_lt());
        self.rows.insert(index, row);
        self.generation += 1;
        index
    }
}
