/// 内存资源存储
///
/// 以"路径 → 有序键值列表"的形式把资源文件保存在内存中，语义与 `ResxFileStore`
/// 一致。支持按文件注入失败和记录调用，便于测试扇出与回滚逻辑。
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::traits::ResourceStore;
use crate::resource_types::{Group, KeyInsert, LocalizedFile, RemovedKey};
use crate::utils::ResxError;

type Entries = Vec<(String, String)>;

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    groups: Vec<Group>,
    files: Mutex<HashMap<PathBuf, Entries>>,
    /// 这些文件上的所有调用都会失败
    failing: Mutex<HashSet<PathBuf>>,
    /// 调用记录（方法名, 文件路径）
    calls: Mutex<Vec<(&'static str, PathBuf)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按给定组与初始内容创建存储
    ///
    /// `contents` 的键为语言标识；没有内容的文件视为空文件。
    pub fn with_group(group: Group, contents: &[(&str, &[(&str, &str)])]) -> Self {
        let store = Self::new();
        {
            let mut files = lock(&store.files);
            for file in &group.files {
                let entries = contents
                    .iter()
                    .find(|(lang, _)| *lang == file.lang)
                    .map(|(_, entries)| {
                        entries
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                files.insert(file.path.clone(), entries);
            }
        }
        Self {
            groups: vec![group],
            ..store
        }
    }

    /// 使该文件上的后续调用全部失败
    pub fn fail_file(&self, path: impl Into<PathBuf>) {
        lock(&self.failing).insert(path.into());
    }

    /// 清除所有注入的失败
    pub fn heal(&self) {
        lock(&self.failing).clear();
    }

    /// 文件当前的键顺序
    pub fn keys(&self, path: &Path) -> Vec<String> {
        lock(&self.files)
            .get(path)
            .map(|entries| entries.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    /// 文件当前的键值
    pub fn value(&self, path: &Path, key: &str) -> Option<String> {
        lock(&self.files)
            .get(path)
            .and_then(|entries| entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    }

    /// 文件完整内容快照
    pub fn snapshot(&self, path: &Path) -> Entries {
        lock(&self.files).get(path).cloned().unwrap_or_default()
    }

    /// 外部修改（模拟其它程序写文件），不记录调用
    pub fn write_external(&self, path: &Path, entries: &[(&str, &str)]) {
        lock(&self.files).insert(
            path.to_path_buf(),
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        );
    }

    /// 某方法被调用的次数
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|(m, _)| *m == method).count()
    }

    /// 修改类调用的总次数
    pub fn mutation_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(m, _)| *m != "read_entries")
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// 记录调用、检查失败注入后在文件内容上执行操作
    fn with_file<T>(
        &self,
        method: &'static str,
        file: &LocalizedFile,
        op: impl FnOnce(&mut Entries) -> Result<T, ResxError>,
    ) -> Result<T, ResxError> {
        lock(&self.calls).push((method, file.path.clone()));
        if lock(&self.failing).contains(&file.path) {
            return Err(ResxError::Injected(format!("{} on {:?}", method, file.path)));
        }

        let mut files = lock(&self.files);
        let entries = files.get_mut(&file.path).ok_or_else(|| {
            ResxError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("文件不存在: {:?}", file.path),
            ))
        })?;

        // 失败的操作不能留下半修改的内容
        let mut working = entries.clone();
        let result = op(&mut working)?;
        *entries = working;
        Ok(result)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn position_of(entries: &Entries, key: &str) -> Option<usize> {
    entries.iter().position(|(k, _)| k == key)
}

fn upsert(entries: &mut Entries, key: &str, value: &str) {
    match position_of(entries, key) {
        Some(index) => entries[index].1 = value.to_string(),
        None => entries.push((key.to_string(), value.to_string())),
    }
}

fn insert_at(entries: &mut Entries, key: &str, value: &str, position: usize) -> Result<usize, ResxError> {
    if position_of(entries, key).is_some() {
        return Err(ResxError::KeyExists(key.to_string()));
    }
    let position = position.min(entries.len());
    entries.insert(position, (key.to_string(), value.to_string()));
    Ok(position)
}

impl ResourceStore for MemoryStore {
    fn scan(&self, directory: &Path) -> Result<Vec<Group>, ResxError> {
        Ok(self
            .groups
            .iter()
            .filter(|g| g.directory.starts_with(directory))
            .cloned()
            .collect())
    }

    fn read_entries(&self, file: &LocalizedFile) -> Result<Vec<(String, String)>, ResxError> {
        self.with_file("read_entries", file, |entries| Ok(entries.clone()))
    }

    fn set_value(&self, file: &LocalizedFile, key: &str, value: &str) -> Result<(), ResxError> {
        self.with_file("set_value", file, |entries| {
            upsert(entries, key, value);
            Ok(())
        })
    }

    fn insert_key(&self, file: &LocalizedFile, key: &str, value: Option<&str>) -> Result<usize, ResxError> {
        self.with_file("insert_key", file, |entries| {
            let end = entries.len();
            insert_at(entries, key, value.unwrap_or(""), end)
        })
    }

    fn insert_key_at(&self, file: &LocalizedFile, item: &KeyInsert) -> Result<usize, ResxError> {
        self.with_file("insert_key_at", file, |entries| {
            insert_at(entries, &item.key, &item.value, item.position)
        })
    }

    fn remove_key(&self, file: &LocalizedFile, key: &str) -> Result<RemovedKey, ResxError> {
        self.with_file("remove_key", file, |entries| {
            let index = position_of(entries, key).ok_or_else(|| ResxError::KeyNotFound(key.to_string()))?;
            entries.remove(index);
            Ok(RemovedKey::at(index))
        })
    }

    fn batch_remove_keys(
        &self,
        file: &LocalizedFile,
        keys: &[String],
    ) -> Result<HashMap<String, RemovedKey>, ResxError> {
        self.with_file("batch_remove_keys", file, |entries| {
            let mut positions = HashMap::with_capacity(keys.len());
            for key in keys {
                let index = position_of(entries, key).ok_or_else(|| ResxError::KeyNotFound(key.clone()))?;
                positions.insert(key.clone(), RemovedKey::at(index));
            }
            let targets: HashSet<&String> = keys.iter().collect();
            entries.retain(|(k, _)| !targets.contains(k));
            Ok(positions)
        })
    }

    fn batch_insert_keys(&self, file: &LocalizedFile, items: &[KeyInsert]) -> Result<(), ResxError> {
        self.with_file("batch_insert_keys", file, |entries| {
            let mut ordered: Vec<&KeyInsert> = items.iter().collect();
            ordered.sort_by_key(|item| item.position);
            for item in ordered {
                insert_at(entries, &item.key, &item.value, item.position)?;
            }
            Ok(())
        })
    }

    fn batch_set_values(
        &self,
        file: &LocalizedFile,
        updates: &HashMap<String, String>,
    ) -> Result<(), ResxError> {
        self.with_file("batch_set_values", file, |entries| {
            let mut keys: Vec<&String> = updates.keys().collect();
            keys.sort();
            for key in keys {
                upsert(entries, key, &updates[key]);
            }
            Ok(())
        })
    }

    fn rename_key(&self, file: &LocalizedFile, old_key: &str, new_key: &str) -> Result<(), ResxError> {
        self.with_file("rename_key", file, |entries| {
            if old_key == new_key {
                return Ok(());
            }
            let Some(index) = position_of(entries, old_key) else {
                return Ok(());
            };
            if position_of(entries, new_key).is_some() {
                return Err(ResxError::KeyExists(new_key.to_string()));
            }
            entries[index].0 = new_key.to_string();
            Ok(())
        })
    }
}
