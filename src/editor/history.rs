/// 编辑历史模块
///
/// 记录每次成功的逻辑编辑，保存足够的信息以精确撤销（包括键在各文件中的原始位置）。
/// 只支持撤销，不支持重做。
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::EditError;
use super::undo;
use crate::io::ResourceStore;
use crate::resource_types::{Group, Row};

/// 可撤销的编辑操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryAction {
    /// 修改单元格；`old_value` 为 None 表示修改前该文件中没有此键
    Update {
        key: String,
        lang: String,
        old_value: Option<String>,
        new_value: String,
    },
    /// 重命名键
    Rename { old_key: String, new_key: String },
    /// 新增键
    Add { key: String },
    /// 删除键
    Delete {
        key: String,
        /// 删除前的整行
        row: Row,
        /// 各文件中的原始存储位置（只包含实际删除过的文件）
        indices: BTreeMap<PathBuf, usize>,
        /// 各文件中被删除条目的原文，撤销时原样写回
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        blocks: BTreeMap<PathBuf, String>,
    },
    /// 一次批量操作
    Batch { actions: Vec<HistoryAction> },
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryAction::Update { key, lang, new_value, .. } => {
                write!(f, "update [{}] {} = \"{}\"", lang, key, new_value)
            }
            HistoryAction::Rename { old_key, new_key } => write!(f, "rename {} -> {}", old_key, new_key),
            HistoryAction::Add { key } => write!(f, "add {}", key),
            HistoryAction::Delete { key, indices, .. } => {
                write!(f, "delete {} ({} files)", key, indices.len())
            }
            HistoryAction::Batch { actions } => write!(f, "batch of {} actions", actions.len()),
        }
    }
}

/// 编辑历史
///
/// # 实现细节
/// - 只在尾部追加，撤销时从尾部弹出
/// - 撤销失败时操作留在顶部，可以再次尝试
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    actions: Vec<HistoryAction>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功的编辑
    pub fn push(&mut self, action: HistoryAction) {
        log::debug!("记录历史: {}", action);
        self.actions.push(action);
    }

    /// 可撤销的操作数量
    pub fn depth(&self) -> usize {
        self.actions.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn peek(&self) -> Option<&HistoryAction> {
        self.actions.last()
    }

    /// 按应用顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &HistoryAction> {
        self.actions.iter()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// 撤销最后一次操作
    ///
    /// # 返回
    /// 成功时返回被撤销的操作；失败时操作仍留在历史顶部
    pub fn undo<S: ResourceStore + ?Sized>(&mut self, store: &S, group: &Group) -> Result<HistoryAction, EditError> {
        let action = self.actions.last_mut().ok_or(EditError::NothingToUndo)?;
        undo::reverse(store, group, action)?;
        let action = self.actions.pop().ok_or(EditError::NothingToUndo)?;
        log::info!("已撤销: {}", action);
        Ok(action)
    }

    /// 生成历史摘要
    pub fn summary(&self) -> String {
        format!("历史记录: {}, 可撤销: {}", self.actions.len(), self.can_undo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_peek() {
        let mut log = HistoryLog::new();
        assert!(!log.can_undo());
        log.push(HistoryAction::Add { key: "a".into() });
        log.push(HistoryAction::Rename { old_key: "a".into(), new_key: "b".into() });
        assert_eq!(log.depth(), 2);
        assert_eq!(log.peek().unwrap().to_string(), "rename a -> b");
    }

    #[test]
    fn test_action_serializes_with_type_tag() {
        let action = HistoryAction::Update {
            key: "k".into(),
            lang: "de".into(),
            old_value: None,
            new_value: "v".into(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "Update");
        assert!(json["old_value"].is_null());
    }
}
