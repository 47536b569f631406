/// 变更协调器
///
/// 把一次逻辑编辑扇出为对组内各文件的操作，遵循两阶段协议：
/// 先 `apply_optimistic` 修改行表，扇出完成后 `confirm`。全部成功则记入历史，
/// 否则重新加载行表，使其回到磁盘上的真实状态。
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use super::error::EditError;
use super::fanout::fan_out;
use super::history::{HistoryAction, HistoryLog};
use crate::io::{ConfirmPrompt, ResourceStore};
use crate::resource_types::{Group, LocalizedFile, RemovedKey, Row};
use crate::selection::CellRange;
use crate::table::{RowPatch, RowTable};
use crate::utils::is_valid_key;

/// 变更协调器
///
/// 借用会话中的各部分状态，生命周期只覆盖一次编辑。
pub struct MutationCoordinator<'a, S: ResourceStore + ?Sized> {
    store: &'a S,
    group: &'a Group,
    table: &'a mut RowTable,
    history: &'a mut HistoryLog,
}

impl<'a, S: ResourceStore + ?Sized> MutationCoordinator<'a, S> {
    pub fn new(store: &'a S, group: &'a Group, table: &'a mut RowTable, history: &'a mut HistoryLog) -> Self {
        Self {
            store,
            group,
            table,
            history,
        }
    }

    /// 修改单元格
    ///
    /// # 参数
    /// * `row` - 行表中的行号
    /// * `lang` - 语言
    /// * `value` - 新值
    ///
    /// # 返回
    /// 值未改变时返回 `Ok(false)` 且不调用存储
    pub fn update_cell(&mut self, row: usize, lang: &str, value: &str) -> Result<bool, EditError> {
        let group = self.group;
        let current = self.row(row)?;
        let file = group
            .file_for_lang(lang)
            .ok_or_else(|| EditError::Validation(format!("unknown language: {}", lang)))?;
        if current.display_value(lang) == value {
            return Ok(false);
        }
        let key = current.key.clone();
        let old_value = current.values.get(lang).cloned();

        self.table.apply_optimistic(
            row,
            RowPatch::SetValue {
                lang: lang.to_string(),
                value: value.to_string(),
            },
        );
        let outcome = self.store.set_value(file, &key, value).map_err(|e| EditError::StoreIo {
            operation: "update".to_string(),
            reason: e.to_string(),
        });

        self.confirm("update", outcome, |_| HistoryAction::Update {
            key,
            lang: lang.to_string(),
            old_value,
            new_value: value.to_string(),
        })?;
        Ok(true)
    }

    /// 重命名键
    ///
    /// 新键与现有键冲突时直接拒绝，不访问任何文件。
    pub fn rename_key(&mut self, row: usize, new_key: &str) -> Result<bool, EditError> {
        let new_key = new_key.trim();
        if !is_valid_key(new_key) {
            return Err(EditError::Validation("key must not be empty".to_string()));
        }
        let old_key = self.row(row)?.key.clone();
        if old_key == new_key {
            return Ok(false);
        }
        if self.table.contains_key(new_key) {
            return Err(EditError::Validation(format!("key already exists: {}", new_key)));
        }

        self.table.apply_optimistic(
            row,
            RowPatch::Rename {
                new_key: new_key.to_string(),
            },
        );
        let tasks: Vec<(&LocalizedFile, ())> = self.group.files.iter().map(|f| (f, ())).collect();
        let store = self.store;
        let outcome = fan_out(&tasks, |file, _| store.rename_key(file, &old_key, new_key))
            .map_err(|f| f.into_error("rename"));

        self.confirm("rename", outcome, |_| HistoryAction::Rename {
            old_key,
            new_key: new_key.to_string(),
        })?;
        Ok(true)
    }

    /// 新增键（各文件末尾追加空值）
    pub fn add_key(&mut self, key: &str) -> Result<(), EditError> {
        let key = key.trim();
        if !is_valid_key(key) {
            return Err(EditError::Validation("key must not be empty".to_string()));
        }
        if self.table.contains_key(key) {
            return Err(EditError::Validation(format!("key already exists: {}", key)));
        }

        let row = self
            .group
            .files
            .iter()
            .fold(Row::new(key), |row, file| row.with_value(file.lang.clone(), ""));
        self.table.apply_optimistic(0, RowPatch::Insert(row));

        let tasks: Vec<(&LocalizedFile, ())> = self.group.files.iter().map(|f| (f, ())).collect();
        let store = self.store;
        let outcome = fan_out(&tasks, |file, _| store.insert_key(file, key, None)).map_err(|f| f.into_error("add"));

        self.confirm("add", outcome, |_| HistoryAction::Add { key: key.to_string() })
    }

    /// 删除键，记录各文件中的原始位置
    pub fn delete_key(&mut self, row: usize) -> Result<(), EditError> {
        let removed = self.row(row)?.clone();
        let tasks: Vec<(&LocalizedFile, ())> = self
            .group
            .files
            .iter()
            .filter(|f| removed.has_value(&f.lang))
            .map(|f| (f, ()))
            .collect();

        self.table.apply_optimistic(row, RowPatch::Remove);
        let store = self.store;
        let key = removed.key.clone();
        let outcome = fan_out(&tasks, |file, _| store.remove_key(file, &key)).map_err(|f| f.into_error("delete"));

        self.confirm("delete", outcome, |per_file| {
            let mut indices = BTreeMap::new();
            let mut blocks = BTreeMap::new();
            for (path, result) in per_file {
                indices.insert(path.clone(), result.position);
                if let Some(block) = result.block {
                    blocks.insert(path, block);
                }
            }
            HistoryAction::Delete {
                key: removed.key.clone(),
                row: removed,
                indices,
                blocks,
            }
        })
    }

    /// 批量删除/清空选区
    ///
    /// 选区包含键列时删除所选的整行，否则只清空所选语言列中的非空单元格。
    /// 执行前必须得到确认。
    ///
    /// # 参数
    /// * `range` - 选区（行号基于显示序列）
    /// * `displayed` - 显示序列（显示行号 → 行表行号）
    /// * `prompt` - 确认回调
    ///
    /// # 返回
    /// 删除的行数或清空的单元格数
    pub fn batch_delete(
        &mut self,
        range: Option<CellRange>,
        displayed: &[usize],
        prompt: &dyn ConfirmPrompt,
    ) -> Result<usize, EditError> {
        let Some(range) = range else {
            return Ok(0);
        };
        let mut rows: Vec<usize> = range.rows().filter_map(|r| displayed.get(r).copied()).collect();
        rows.sort_unstable();
        rows.dedup();
        if rows.is_empty() {
            return Ok(0);
        }

        if range.includes_key_column() {
            self.delete_rows(&rows, prompt)
        } else {
            let langs: Vec<String> = range
                .cols()
                .filter_map(|c| self.group.lang_for_column(c).map(str::to_string))
                .collect();
            self.clear_cells(&rows, &langs, prompt)
        }
    }

    fn delete_rows(&mut self, rows: &[usize], prompt: &dyn ConfirmPrompt) -> Result<usize, EditError> {
        let removed: Vec<Row> = rows.iter().filter_map(|&r| self.table.get(r).cloned()).collect();
        let message = format!(
            "确定删除 {} 个键？将修改 {} 个文件。",
            removed.len(),
            self.group.files.len()
        );
        if !prompt.confirm(&message) {
            return Err(EditError::Cancelled);
        }

        let tasks: Vec<(&LocalizedFile, Vec<String>)> = self
            .group
            .files
            .iter()
            .map(|file| {
                let keys: Vec<String> = removed
                    .iter()
                    .filter(|row| row.has_value(&file.lang))
                    .map(|row| row.key.clone())
                    .collect();
                (file, keys)
            })
            .filter(|(_, keys)| !keys.is_empty())
            .collect();

        for &row in rows.iter().rev() {
            self.table.apply_optimistic(row, RowPatch::Remove);
        }
        let store = self.store;
        log::debug!("批量删除 {} 个键，涉及 {} 个文件", removed.len(), tasks.len());
        let outcome = fan_out(&tasks, |file, keys| store.batch_remove_keys(file, keys))
            .map_err(|f| f.into_error("batch delete"));

        let count = removed.len();
        self.confirm("batch delete", outcome, |per_file| {
            let mut per_file: Vec<(PathBuf, HashMap<String, RemovedKey>)> = per_file;
            let actions = removed
                .into_iter()
                .map(|row| {
                    let mut indices = BTreeMap::new();
                    let mut blocks = BTreeMap::new();
                    for (path, results) in per_file.iter_mut() {
                        if let Some(result) = results.remove(&row.key) {
                            indices.insert(path.clone(), result.position);
                            if let Some(block) = result.block {
                                blocks.insert(path.clone(), block);
                            }
                        }
                    }
                    HistoryAction::Delete {
                        key: row.key.clone(),
                        row,
                        indices,
                        blocks,
                    }
                })
                .collect();
            HistoryAction::Batch { actions }
        })?;
        Ok(count)
    }

    fn clear_cells(&mut self, rows: &[usize], langs: &[String], prompt: &dyn ConfirmPrompt) -> Result<usize, EditError> {
        // (行号, 键, 语言, 旧值)，已经为空的单元格不参与
        let mut cells: Vec<(usize, String, String, String)> = Vec::new();
        for &index in rows {
            let Some(row) = self.table.get(index) else {
                continue;
            };
            for lang in langs {
                let value = row.display_value(lang);
                if !value.is_empty() {
                    cells.push((index, row.key.clone(), lang.clone(), value.to_string()));
                }
            }
        }
        if cells.is_empty() {
            return Ok(0);
        }

        let message = format!("确定清空 {} 个单元格？", cells.len());
        if !prompt.confirm(&message) {
            return Err(EditError::Cancelled);
        }

        let mut per_lang: HashMap<&str, HashMap<String, String>> = HashMap::new();
        for (_, key, lang, _) in &cells {
            per_lang
                .entry(lang.as_str())
                .or_default()
                .insert(key.clone(), String::new());
        }
        let tasks: Vec<(&LocalizedFile, HashMap<String, String>)> = self
            .group
            .files
            .iter()
            .filter_map(|file| per_lang.remove(file.lang.as_str()).map(|updates| (file, updates)))
            .collect();

        for (index, _, lang, _) in &cells {
            self.table.apply_optimistic(
                *index,
                RowPatch::SetValue {
                    lang: lang.clone(),
                    value: String::new(),
                },
            );
        }
        let store = self.store;
        log::debug!("批量清空 {} 个单元格，涉及 {} 个文件", cells.len(), tasks.len());
        let outcome = fan_out(&tasks, |file, updates| store.batch_set_values(file, updates))
            .map_err(|f| f.into_error("batch clear"));

        let count = cells.len();
        self.confirm("batch clear", outcome, |_| HistoryAction::Batch {
            actions: cells
                .into_iter()
                .map(|(_, key, lang, old)| HistoryAction::Update {
                    key,
                    lang,
                    old_value: Some(old),
                    new_value: String::new(),
                })
                .collect(),
        })?;
        Ok(count)
    }

    /// 第二阶段：成功则记入历史，失败则重新加载
    pub fn confirm<T>(
        &mut self,
        operation: &str,
        outcome: Result<T, EditError>,
        record: impl FnOnce(T) -> HistoryAction,
    ) -> Result<(), EditError> {
        match outcome {
            Ok(value) => {
                let action = record(value);
                log::info!("{}: {}", operation, action);
                self.history.push(action);
                Ok(())
            }
            Err(e) => {
                log::warn!("{} 失败，重新加载: {}", operation, e);
                self.rollback();
                Err(e)
            }
        }
    }

    /// 丢弃乐观修改，回到磁盘状态
    fn rollback(&mut self) {
        if let Err(e) = self.table.reload(self.store, self.group) {
            log::error!("重新加载资源组 {} 失败: {}", self.group.name, e);
        }
    }

    fn row(&self, index: usize) -> Result<&Row, EditError> {
        self.table
            .get(index)
            .ok_or_else(|| EditError::Validation(format!("row {} out of range", index)))
    }
}
