/// 编辑会话
///
/// 持有一个资源组的全部编辑状态：存储句柄、行表、选区、历史、过滤条件和
/// 外部变更去抖器。所有操作都需要 `&mut self`，因此编辑与撤销天然串行。
use std::time::{Duration, Instant};

use super::coordinator::MutationCoordinator;
use super::error::EditError;
use super::history::{HistoryAction, HistoryLog};
use crate::io::{ConfirmPrompt, ResourceStore};
use crate::resource_types::{Group, Row};
use crate::selection::{CellPos, SelectionTracker};
use crate::settings::EditorSettings;
use crate::table::{RowFilter, RowTable};
use crate::utils::ResxError;
use crate::watcher::ReloadDebouncer;

/// 编辑会话
///
/// # 使用示例
///
/// ```rust,ignore
/// let mut session = EditorSession::open(ResxFileStore::new(), group)?;
/// session.update_cell(0, "de", "Hallo")?;
/// session.undo()?;
/// ```
pub struct EditorSession<S: ResourceStore> {
    store: S,
    group: Group,
    table: RowTable,
    selection: SelectionTracker,
    history: HistoryLog,
    filter: RowFilter,
    debouncer: ReloadDebouncer,
    /// 新增键后需要滚动到的显示行号（一次性）
    scroll_target: Option<usize>,
    confirm_destructive: bool,
}

impl<S: ResourceStore> EditorSession<S> {
    /// 打开资源组并加载全部文件
    pub fn open(store: S, group: Group) -> Result<Self, ResxError> {
        Self::with_settings(store, group, &EditorSettings::default())
    }

    pub fn with_settings(store: S, group: Group, settings: &EditorSettings) -> Result<Self, ResxError> {
        let table = RowTable::load(&store, &group)?;
        log::info!(
            "打开资源组 {} ({} 个文件, {} 行)",
            group.name,
            group.files.len(),
            table.len()
        );
        Ok(Self {
            store,
            group,
            table,
            selection: SelectionTracker::new(),
            history: HistoryLog::new(),
            filter: RowFilter::default(),
            debouncer: ReloadDebouncer::new(settings.reload_debounce()),
            scroll_target: None,
            confirm_destructive: settings.confirm_destructive,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn table(&self) -> &RowTable {
        &self.table
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn history_depth(&self) -> usize {
        self.history.depth()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn filter(&self) -> &RowFilter {
        &self.filter
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    // === 显示序列 ===

    /// 当前显示的行（行表行号序列）
    pub fn displayed_indices(&self) -> Vec<usize> {
        self.table.display_indices(&self.filter, &self.group.languages())
    }

    pub fn displayed_rows(&self) -> Vec<&Row> {
        self.displayed_indices()
            .into_iter()
            .filter_map(|i| self.table.get(i))
            .collect()
    }

    /// 键在显示序列中的位置
    pub fn row_index(&self, key: &str) -> Option<usize> {
        let index = self.table.position_of(key)?;
        self.displayed_indices().iter().position(|&i| i == index)
    }

    /// 修改过滤条件（显示序列改变，选区清空）
    pub fn set_filter(&mut self, filter: RowFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.selection.clear();
        }
    }

    pub fn take_scroll_target(&mut self) -> Option<usize> {
        self.scroll_target.take()
    }

    // === 选区 ===

    pub fn pointer_down(&mut self, row: usize, col: usize) {
        self.sync_selection();
        self.selection.pointer_down(CellPos::new(row, col));
    }

    pub fn pointer_enter(&mut self, row: usize, col: usize) {
        self.sync_selection();
        self.selection.pointer_enter(CellPos::new(row, col));
    }

    pub fn pointer_up(&mut self) {
        self.selection.pointer_up();
    }

    /// 直接设置矩形选区
    pub fn select(&mut self, from: (usize, usize), to: (usize, usize)) {
        self.sync_selection();
        self.selection
            .select(CellPos::new(from.0, from.1), CellPos::new(to.0, to.1));
        self.sync_selection();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn sync_selection(&mut self) {
        let rows = self.displayed_indices().len();
        self.selection
            .sync(self.table.generation(), rows, self.group.column_count());
    }

    // === 编辑操作（行号均为显示行号） ===

    /// 修改单元格，返回值是否改变
    pub fn update_cell(&mut self, row: usize, lang: &str, value: &str) -> Result<bool, EditError> {
        let index = self.resolve(row)?;
        let result = self.coordinator().update_cell(index, lang, value);
        self.sync_selection();
        result
    }

    /// 重命名键，返回是否发生了重命名
    pub fn rename_key(&mut self, row: usize, new_key: &str) -> Result<bool, EditError> {
        let index = self.resolve(row)?;
        let result = self.coordinator().rename_key(index, new_key);
        self.sync_selection();
        result
    }

    /// 新增键
    ///
    /// 成功后重新加载，并把新键的显示行号设为滚动目标。
    pub fn add_key(&mut self, key: &str) -> Result<(), EditError> {
        let result = self.coordinator().add_key(key);
        if result.is_ok() {
            self.reload_logged();
            self.scroll_target = self.row_index(key.trim());
        }
        self.sync_selection();
        result
    }

    pub fn delete_key(&mut self, row: usize) -> Result<(), EditError> {
        let index = self.resolve(row)?;
        let result = self.coordinator().delete_key(index);
        self.selection.clear();
        result
    }

    /// 对当前选区执行批量删除/清空
    ///
    /// # 返回
    /// 删除的行数或清空的单元格数；选区为空时为 0
    pub fn batch_delete(&mut self, prompt: &dyn ConfirmPrompt) -> Result<usize, EditError> {
        self.sync_selection();
        let range = self.selection.range();
        let displayed = self.displayed_indices();
        let always = |_: &str| true;
        let prompt: &dyn ConfirmPrompt = if self.confirm_destructive { prompt } else { &always };

        let result = self.coordinator().batch_delete(range, &displayed, prompt);
        match &result {
            Err(EditError::Cancelled) | Ok(0) => {}
            _ => self.selection.clear(),
        }
        result
    }

    /// 撤销最后一次编辑
    ///
    /// 无论成功与否都会重新加载行表。
    pub fn undo(&mut self) -> Result<HistoryAction, EditError> {
        let result = self.history.undo(&self.store, &self.group);
        match &result {
            Err(EditError::NothingToUndo) => return result,
            Err(e) => log::warn!("撤销失败: {}", e),
            Ok(_) => {}
        }
        self.reload_logged();
        self.selection.clear();
        result
    }

    // === 外部变更 ===

    /// 丢弃快照并从存储重新加载
    pub fn reload(&mut self) -> Result<(), ResxError> {
        self.table.reload(&self.store, &self.group)?;
        self.selection.clear();
        Ok(())
    }

    /// 记录一次外部变更事件（重新开始去抖计时）
    pub fn notify_external_change(&mut self, at: Instant) {
        self.debouncer.record(at);
    }

    /// 去抖窗口到期时重新加载，返回是否执行了重新加载
    ///
    /// 重新加载失败（例如文件正被其它程序写到一半）时重新开始计时，
    /// 下一个窗口到期后会再试一次。
    pub fn poll_external_reload(&mut self, now: Instant) -> Result<bool, ResxError> {
        if !self.debouncer.poll(now) {
            return Ok(false);
        }
        log::info!("检测到外部修改，重新加载资源组 {}", self.group.name);
        if let Err(e) = self.reload() {
            log::warn!("重新加载失败，稍后重试: {}", e);
            self.debouncer.record(now);
            return Err(e);
        }
        Ok(true)
    }

    pub fn reload_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn debounce_window(&self) -> Duration {
        self.debouncer.window()
    }

    fn reload_logged(&mut self) {
        if let Err(e) = self.reload() {
            log::error!("重新加载资源组 {} 失败: {}", self.group.name, e);
        }
    }

    fn coordinator(&mut self) -> MutationCoordinator<'_, S> {
        MutationCoordinator::new(&self.store, &self.group, &mut self.table, &mut self.history)
    }

    /// 显示行号 → 行表行号
    fn resolve(&self, row: usize) -> Result<usize, EditError> {
        self.displayed_indices()
            .get(row)
            .copied()
            .ok_or_else(|| EditError::Validation(format!("row {} out of range", row)))
    }
}

impl<S: ResourceStore> std::fmt::Debug for EditorSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("group", &self.group.name)
            .field("rows", &self.table.len())
            .field("history", &self.history.depth())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStore;
    use crate::resource_types::LocalizedFile;

    fn session() -> EditorSession<MemoryStore> {
        let group = Group::new(
            "Strings",
            "/res",
            vec![
                LocalizedFile::new("/res/Strings.resx", "default"),
                LocalizedFile::new("/res/Strings.de.resx", "de"),
            ],
        );
        let store = MemoryStore::with_group(
            group.clone(),
            &[
                ("default", &[("b", "B"), ("a", "A"), ("c", "")]),
                ("de", &[("a", "Ä"), ("b", "")]),
            ],
        );
        EditorSession::open(store, group).unwrap()
    }

    #[test]
    fn test_filter_changes_display_and_clears_selection() {
        let mut session = session();
        session.select((0, 0), (1, 1));
        assert!(!session.selection().is_empty());

        session.set_filter(RowFilter::blanks());
        assert!(session.selection().is_empty());
        let keys: Vec<&str> = session.displayed_rows().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn test_add_sets_scroll_target() {
        let mut session = session();
        session.add_key("aa").unwrap();
        assert_eq!(session.take_scroll_target(), Some(1));
        assert_eq!(session.take_scroll_target(), None);
        assert_eq!(session.store().keys(std::path::Path::new("/res/Strings.de.resx")), vec!["a", "b", "aa"]);
    }

    #[test]
    fn test_empty_undo() {
        let mut session = session();
        assert!(matches!(session.undo(), Err(EditError::NothingToUndo)));
    }

    #[test]
    fn test_batch_delete_without_confirmation_setting() {
        let group = session().group().clone();
        let store = MemoryStore::with_group(group.clone(), &[("default", &[("a", "1"), ("b", "2")])]);
        let settings = EditorSettings {
            confirm_destructive: false,
            ..EditorSettings::default()
        };
        let mut session = EditorSession::with_settings(store, group, &settings).unwrap();
        session.select((0, 0), (0, 2));
        let deleted = session.batch_delete(&|_: &str| false).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(session.table().len(), 1);
    }
}
