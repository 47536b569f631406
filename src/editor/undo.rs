/// 撤销逆操作
///
/// 把一条历史记录转换为对各文件的逆向调用。逆操作部分失败时会修剪记录，
/// 使已经恢复的部分在重试时不会被再执行一次。
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use super::error::EditError;
use super::fanout::{fan_out, FanoutFailure};
use super::history::HistoryAction;
use crate::io::ResourceStore;
use crate::resource_types::{Group, KeyInsert, LocalizedFile, Row};
use crate::utils::ResxError;

/// 逆转一条历史记录
pub(crate) fn reverse<S: ResourceStore + ?Sized>(
    store: &S,
    group: &Group,
    action: &mut HistoryAction,
) -> Result<(), EditError> {
    let description = action.to_string();
    let HistoryAction::Batch { actions } = action else {
        return reverse_single(store, group, action).map_err(|e| reversal_error(1, 1, &description, e));
    };

    if actions.is_empty() {
        return Ok(());
    }
    if actions.iter().all(|a| matches!(a, HistoryAction::Delete { .. })) {
        return reverse_deletes(store, group, actions).map_err(|e| reversal_error(1, 1, &description, e));
    }
    if actions
        .iter()
        .all(|a| matches!(a, HistoryAction::Update { old_value: Some(_), .. }))
    {
        return reverse_updates(store, group, actions).map_err(|e| reversal_error(1, 1, &description, e));
    }

    // 混合批量：严格倒序逐个逆转，成功的子操作立即移出
    let total = actions.len();
    while !actions.is_empty() {
        let step = total - actions.len() + 1;
        let last = actions.len() - 1;
        let child = &mut actions[last];
        let child_description = child.to_string();
        reverse_single(store, group, child).map_err(|e| reversal_error(step, total, &child_description, e))?;
        actions.pop();
    }
    Ok(())
}

fn reversal_error(step: usize, total: usize, action: &str, source: EditError) -> EditError {
    EditError::UndoReversal {
        step,
        total,
        action: action.to_string(),
        reason: source.to_string(),
    }
}

fn file_for_lang<'g>(group: &'g Group, lang: &str) -> Result<&'g LocalizedFile, EditError> {
    group.file_for_lang(lang).ok_or_else(|| EditError::StoreIo {
        operation: "undo".to_string(),
        reason: format!("no file for language {}", lang),
    })
}

fn store_error(e: ResxError) -> EditError {
    EditError::StoreIo {
        operation: "undo".to_string(),
        reason: e.to_string(),
    }
}

/// 删除键，键已不存在视为成功
fn remove_if_present<S: ResourceStore + ?Sized>(store: &S, file: &LocalizedFile, key: &str) -> Result<(), ResxError> {
    match store.remove_key(file, key) {
        Ok(_) | Err(ResxError::KeyNotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

fn reverse_single<S: ResourceStore + ?Sized>(
    store: &S,
    group: &Group,
    action: &mut HistoryAction,
) -> Result<(), EditError> {
    match action {
        HistoryAction::Update { key, lang, old_value, .. } => {
            let file = file_for_lang(group, lang)?;
            match old_value {
                Some(old) => store.set_value(file, key, old),
                None => remove_if_present(store, file, key),
            }
            .map_err(store_error)
        }
        HistoryAction::Rename { old_key, new_key } => {
            let (old_key, new_key) = (old_key.as_str(), new_key.as_str());
            let tasks: Vec<(&LocalizedFile, ())> = group.files.iter().map(|f| (f, ())).collect();
            fan_out(&tasks, |file, _| store.rename_key(file, new_key, old_key))
                .map(|_| ())
                .map_err(|f| f.into_error("undo rename"))
        }
        HistoryAction::Add { key } => {
            let key = key.as_str();
            let tasks: Vec<(&LocalizedFile, ())> = group.files.iter().map(|f| (f, ())).collect();
            fan_out(&tasks, |file, _| remove_if_present(store, file, key))
                .map(|_| ())
                .map_err(|f| f.into_error("undo add"))
        }
        HistoryAction::Delete { key, row, indices, blocks } => {
            let (key, row, saved) = (key.as_str(), &*row, &*blocks);
            let tasks: Vec<(&LocalizedFile, KeyInsert)> = group
                .files
                .iter()
                .filter_map(|f| {
                    let &pos = indices.get(&f.path)?;
                    Some((f, restore_item(key, row, saved, f, pos)))
                })
                .collect();
            let result = fan_out(&tasks, |file, item| store.insert_key_at(file, item));
            if let Err(failure) = &result {
                prune_restored(indices, blocks, &tasks, failure);
            }
            result.map(|_| ()).map_err(|f| f.into_error("undo delete"))
        }
        HistoryAction::Batch { .. } => reverse(store, group, action),
    }
}

/// 恢复一个文件中被删除的键：有原文时写回原文，否则按删除时的值重建
fn restore_item(
    key: &str,
    row: &Row,
    blocks: &BTreeMap<PathBuf, String>,
    file: &LocalizedFile,
    position: usize,
) -> KeyInsert {
    KeyInsert::new(key, row.display_value(&file.lang), position).with_block(blocks.get(&file.path).cloned())
}

/// 从记录中移除已经恢复成功的文件
fn prune_restored<T>(
    indices: &mut BTreeMap<PathBuf, usize>,
    blocks: &mut BTreeMap<PathBuf, String>,
    tasks: &[(&LocalizedFile, T)],
    failure: &FanoutFailure,
) {
    for (file, _) in tasks {
        if !failure.failed.iter().any(|(path, _)| path == &file.path) {
            indices.remove(&file.path);
            blocks.remove(&file.path);
        }
    }
}

/// 批量删除的逆操作：每个文件一次批量插入
fn reverse_deletes<S: ResourceStore + ?Sized>(
    store: &S,
    group: &Group,
    actions: &mut [HistoryAction],
) -> Result<(), EditError> {
    let mut per_file: Vec<(&LocalizedFile, Vec<KeyInsert>)> = Vec::new();
    for file in &group.files {
        let mut items: Vec<KeyInsert> = actions
            .iter()
            .filter_map(|action| match action {
                HistoryAction::Delete {
                    key,
                    row,
                    indices,
                    blocks,
                } => indices
                    .get(&file.path)
                    .map(|&pos| restore_item(key, row, blocks, file, pos)),
                _ => None,
            })
            .collect();
        if items.is_empty() {
            continue;
        }
        items.sort_by_key(|item| item.position);
        per_file.push((file, items));
    }

    log::debug!("批量恢复 {} 个键到 {} 个文件", actions.len(), per_file.len());
    let result = fan_out(&per_file, |file, items| store.batch_insert_keys(file, items));
    if let Err(failure) = &result {
        for action in actions.iter_mut() {
            if let HistoryAction::Delete { indices, blocks, .. } = action {
                prune_restored(indices, blocks, &per_file, failure);
            }
        }
    }
    result.map(|_| ()).map_err(|f| f.into_error("undo batch delete"))
}

/// 批量清空的逆操作：每个文件一次批量写值
fn reverse_updates<S: ResourceStore + ?Sized>(
    store: &S,
    group: &Group,
    actions: &[HistoryAction],
) -> Result<(), EditError> {
    let mut per_lang: HashMap<&str, HashMap<String, String>> = HashMap::new();
    for action in actions {
        if let HistoryAction::Update {
            key,
            lang,
            old_value: Some(old),
            ..
        } = action
        {
            per_lang
                .entry(lang.as_str())
                .or_default()
                .insert(key.clone(), old.clone());
        }
    }

    let mut tasks: Vec<(&LocalizedFile, HashMap<String, String>)> = Vec::with_capacity(per_lang.len());
    for (lang, updates) in per_lang {
        tasks.push((file_for_lang(group, lang)?, updates));
    }

    fan_out(&tasks, |file, updates| store.batch_set_values(file, updates))
        .map(|_| ())
        .map_err(|f| f.into_error("undo batch clear"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStore;

    fn setup() -> (MemoryStore, Group) {
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
                ("default", &[("a", "A"), ("c", "C")]),
                ("de", &[("a", "Ä"), ("c", "Ç")]),
            ],
        );
        (store, group)
    }

    fn delete_b(group: &Group) -> HistoryAction {
        let indices: BTreeMap<_, _> = group.files.iter().map(|f| (f.path.clone(), 1)).collect();
        let blocks: BTreeMap<_, _> = group
            .files
            .iter()
            .map(|f| (f.path.clone(), "\n  <data name=\"b\"/>".to_string()))
            .collect();
        HistoryAction::Delete {
            key: "b".into(),
            row: Row::new("b").with_value("default", "B").with_value("de", "Bd"),
            indices,
            blocks,
        }
    }

    #[test]
    fn test_delete_reinserts_at_position() {
        let (store, group) = setup();
        let mut action = delete_b(&group);
        reverse(&store, &group, &mut action).unwrap();
        assert_eq!(store.keys(&group.files[0].path), vec!["a", "b", "c"]);
        assert_eq!(store.value(&group.files[1].path, "b").as_deref(), Some("Bd"));
    }

    #[test]
    fn test_partial_delete_reversal_prunes_restored_files() {
        let (store, group) = setup();
        store.fail_file(&group.files[1].path);
        let mut action = delete_b(&group);

        let err = reverse(&store, &group, &mut action).unwrap_err();
        assert!(matches!(err, EditError::UndoReversal { .. }));
        let HistoryAction::Delete { indices, blocks, .. } = &action else {
            panic!("unexpected action");
        };
        assert_eq!(indices.len(), 1);
        assert!(indices.contains_key(&group.files[1].path));
        assert_eq!(blocks.keys().collect::<Vec<_>>(), vec![&group.files[1].path]);

        // 重试只恢复剩下的文件
        store.heal();
        reverse(&store, &group, &mut action).unwrap();
        assert_eq!(store.keys(&group.files[0].path), vec!["a", "b", "c"]);
        assert_eq!(store.keys(&group.files[1].path), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_mixed_batch_keeps_unreversed_children() {
        let (store, group) = setup();
        let mut action = HistoryAction::Batch {
            actions: vec![
                HistoryAction::Rename { old_key: "x".into(), new_key: "a".into() },
                HistoryAction::Update {
                    key: "c".into(),
                    lang: "default".into(),
                    old_value: None,
                    new_value: "C".into(),
                },
            ],
        };
        store.fail_file(&group.files[1].path);

        let err = reverse(&store, &group, &mut action).unwrap_err();
        match err {
            EditError::UndoReversal { step, total, .. } => assert_eq!((step, total), (2, 2)),
            other => panic!("unexpected error {other:?}"),
        }
        // 第二个子操作已经逆转并移出
        let HistoryAction::Batch { actions } = &action else {
            panic!("unexpected action");
        };
        assert_eq!(actions.len(), 1);
        assert_eq!(store.keys(&group.files[0].path), vec!["x"]);
    }
}
