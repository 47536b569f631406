/// ResX 文件 IO 实现
///
/// 提供基于文件系统的默认 `ResourceStore` 实现：每次调用都读取文件、
/// 在内存中修改文档、再整体写回。
use std::collections::HashMap;
use std::path::Path;

use super::traits::ResourceStore;
use crate::resource_types::{Group, KeyInsert, LocalizedFile, RemovedKey};
use crate::resx::{scan_directory, ResxDocument};
use crate::utils::{create_backup, ResxError};

/// 默认的 ResX 文件存储（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct ResxFileStore {
    /// 写入前是否为原文件创建带时间戳的备份
    backup_before_write: bool,
}

impl ResxFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启用/关闭写前备份
    pub fn with_backups(mut self, enabled: bool) -> Self {
        self.backup_before_write = enabled;
        self
    }

    /// 读取 → 修改 → 写回
    fn modify<T>(
        &self,
        file: &LocalizedFile,
        edit: impl FnOnce(&mut ResxDocument) -> Result<T, ResxError>,
    ) -> Result<T, ResxError> {
        let mut doc = ResxDocument::load(&file.path)?;
        let result = edit(&mut doc)?;
        if self.backup_before_write {
            let backup = create_backup(&file.path)?;
            log::debug!("已备份 {:?} -> {:?}", file.path, backup);
        }
        doc.save(&file.path)?;
        Ok(result)
    }
}

impl ResourceStore for ResxFileStore {
    fn scan(&self, directory: &Path) -> Result<Vec<Group>, ResxError> {
        scan_directory(directory)
    }

    fn read_entries(&self, file: &LocalizedFile) -> Result<Vec<(String, String)>, ResxError> {
        Ok(ResxDocument::load(&file.path)?.entries())
    }

    fn set_value(&self, file: &LocalizedFile, key: &str, value: &str) -> Result<(), ResxError> {
        self.modify(file, |doc| doc.set_value(key, value))
    }

    fn insert_key(&self, file: &LocalizedFile, key: &str, value: Option<&str>) -> Result<usize, ResxError> {
        self.modify(file, |doc| doc.append(key, value.unwrap_or("")))
    }

    fn insert_key_at(&self, file: &LocalizedFile, item: &KeyInsert) -> Result<usize, ResxError> {
        self.modify(file, |doc| {
            doc.insert_many(std::slice::from_ref(item))?;
            doc.position_of(&item.key)
                .ok_or_else(|| ResxError::KeyNotFound(item.key.clone()))
        })
    }

    fn remove_key(&self, file: &LocalizedFile, key: &str) -> Result<RemovedKey, ResxError> {
        self.modify(file, |doc| doc.remove_key(key))
    }

    fn batch_remove_keys(
        &self,
        file: &LocalizedFile,
        keys: &[String],
    ) -> Result<HashMap<String, RemovedKey>, ResxError> {
        self.modify(file, |doc| doc.remove_keys(keys))
    }

    fn batch_insert_keys(&self, file: &LocalizedFile, items: &[KeyInsert]) -> Result<(), ResxError> {
        self.modify(file, |doc| doc.insert_many(items))
    }

    fn batch_set_values(
        &self,
        file: &LocalizedFile,
        updates: &HashMap<String, String>,
    ) -> Result<(), ResxError> {
        self.modify(file, |doc| doc.set_values(updates))
    }

    fn rename_key(&self, file: &LocalizedFile, old_key: &str, new_key: &str) -> Result<(), ResxError> {
        self.modify(file, |doc| doc.rename_key(old_key, new_key))
    }
}
