/// IO 抽象层 - trait 定义
///
/// 该模块定义了资源文件存储的抽象接口，支持依赖注入和测试 mock。
/// 遵循依赖倒置原则（DIP），编辑核心只面向 `ResourceStore` 编程。

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;

use crate::resource_types::{Group, KeyInsert, LocalizedFile, RemovedKey, Row};
use crate::utils::{locale_cmp, ResxError};

/// 资源存储 trait
///
/// # 职责
/// - 以"文件 + 键"为单位提供有序的键值增删改
/// - 删除时返回键在文件中的存储位置（以及能提供时的条目原文），插入时接受存储位置
///
/// 实现必须是 `Send + Sync`：同一次编辑会在多个线程上并发调用不同文件。
///
/// # 语义约定
/// - `set_value` / `batch_set_values`：键不存在时追加
/// - `insert_key*` / `batch_insert_keys`：键已存在时返回 `KeyExists`；
///   `KeyInsert::block` 为删除时取得的原文，实现应原样写回
/// - `remove_key` / `batch_remove_keys`：键不存在时返回 `KeyNotFound`，批量时不做任何修改
/// - `rename_key`：旧键不存在时不做修改（重复执行是安全的）；否则新键已存在时返回 `KeyExists`
pub trait ResourceStore: Send + Sync {
    /// 扫描目录，返回资源组
    fn scan(&self, directory: &Path) -> Result<Vec<Group>, ResxError>;

    /// 按存储顺序读取单个文件的全部键值
    fn read_entries(&self, file: &LocalizedFile) -> Result<Vec<(String, String)>, ResxError>;

    /// 设置值
    fn set_value(&self, file: &LocalizedFile, key: &str, value: &str) -> Result<(), ResxError>;

    /// 追加新键，返回其存储位置
    ///
    /// # 参数
    /// * `value` - 初始值，`None` 时为空字符串
    fn insert_key(&self, file: &LocalizedFile, key: &str, value: Option<&str>) -> Result<usize, ResxError>;

    /// 在 `item.position` 处插入键，返回实际位置
    fn insert_key_at(&self, file: &LocalizedFile, item: &KeyInsert) -> Result<usize, ResxError>;

    /// 删除键，返回删除前的存储位置
    fn remove_key(&self, file: &LocalizedFile, key: &str) -> Result<RemovedKey, ResxError>;

    /// 批量删除键，返回每个键删除前的存储位置
    fn batch_remove_keys(
        &self,
        file: &LocalizedFile,
        keys: &[String],
    ) -> Result<HashMap<String, RemovedKey>, ResxError>;

    /// 批量插入（按位置升序应用）
    fn batch_insert_keys(&self, file: &LocalizedFile, items: &[KeyInsert]) -> Result<(), ResxError>;

    /// 批量设置值
    fn batch_set_values(
        &self,
        file: &LocalizedFile,
        updates: &HashMap<String, String>,
    ) -> Result<(), ResxError>;

    /// 重命名键
    fn rename_key(&self, file: &LocalizedFile, old_key: &str, new_key: &str) -> Result<(), ResxError>;

    /// 加载一组文件并合并为按键排序的行
    ///
    /// 各文件并行读取；任一文件读取失败则整体失败。
    fn load_rows(&self, files: &[LocalizedFile]) -> Result<Vec<Row>, ResxError> {
        let per_file: Vec<(&LocalizedFile, Vec<(String, String)>)> = files
            .par_iter()
            .map(|file| self.read_entries(file).map(|entries| (file, entries)))
            .collect::<Result<_, _>>()?;

        let mut merged: HashMap<String, Row> = HashMap::new();
        for (file, entries) in per_file {
            for (key, value) in entries {
                merged
                    .entry(key.clone())
                    .or_insert_with(|| Row::new(key))
                    .values
                    .insert(file.lang.clone(), value);
            }
        }

        let mut rows: Vec<Row> = merged.into_values().collect();
        rows.sort_by(|a, b| locale_cmp(&a.key, &b.key));
        Ok(rows)
    }
}

/// 破坏性操作确认 trait
///
/// 批量删除/清空执行前必须得到确认。闭包 `Fn(&str) -> bool` 自动实现此 trait。
pub trait ConfirmPrompt {
    /// 返回 true 表示用户同意执行
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
