use std::collections::HashMap;
use std::path::PathBuf;
use serde::{Serialize, Deserialize};

use crate::DEFAULT_LANG;

/// 单个语言资源文件
///
/// `lang` 在所属 Group 内唯一；无语言后缀的文件使用 `"default"`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalizedFile {
    /// 文件路径
    pub path: PathBuf,
    /// 语言标识（如 "default", "de", "zh-Hans"）
    pub lang: String,
}

impl LocalizedFile {
    /// 创建新的语言文件描述
    pub fn new(path: impl Into<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lang: lang.into(),
        }
    }

    /// 是否为默认语言文件
    pub fn is_default(&self) -> bool {
        self.lang == DEFAULT_LANG
    }
}

/// 共享同一键空间的一组资源文件
///
/// 文件顺序即表格的列顺序（第 0 列为键列，第 1..N 列依次对应 `files`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// 组名（文件名去掉语言后缀）
    pub name: String,
    /// 所在目录
    pub directory: PathBuf,
    /// 各语言文件（默认语言在前，其余按语言标识排序）
    pub files: Vec<LocalizedFile>,
}

impl Group {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>, files: Vec<LocalizedFile>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            files,
        }
    }

    /// 所有语言标识，按列顺序
    pub fn languages(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.lang.as_str()).collect()
    }

    /// 按语言查找文件
    pub fn file_for_lang(&self, lang: &str) -> Option<&LocalizedFile> {
        self.files.iter().find(|f| f.lang == lang)
    }

    /// 列号（1..N）对应的语言；0 为键列，返回 None
    pub fn lang_for_column(&self, col: usize) -> Option<&str> {
        if col == 0 {
            return None;
        }
        self.files.get(col - 1).map(|f| f.lang.as_str())
    }

    /// 列总数（含键列）
    pub fn column_count(&self) -> usize {
        self.files.len() + 1
    }
}

/// 表格中的一行：一个键在各语言中的值
///
/// `values` 中缺失某语言表示该文件中不存在此键，与空字符串不同。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: String,
    pub values: HashMap<String, String>,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: HashMap::new(),
        }
    }

    /// 链式设置某语言的值
    pub fn with_value(mut self, lang: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(lang.into(), value.into());
        self
    }

    /// 用于显示的值（缺失时为空字符串）
    pub fn display_value(&self, lang: &str) -> &str {
        self.values.get(lang).map(String::as_str).unwrap_or("")
    }

    /// 该语言文件中是否存在此键
    pub fn has_value(&self, lang: &str) -> bool {
        self.values.contains_key(lang)
    }
}

/// 带位置的插入项（用于批量插入与撤销删除）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInsert {
    pub key: String,
    pub value: String,
    /// 在文件键顺序中的目标位置
    pub position: usize,
    /// 删除时保存的原始条目文本；存在时原样写回，忽略 `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
}

impl KeyInsert {
    pub fn new(key: impl Into<String>, value: impl Into<String>, position: usize) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            position,
            block: None,
        }
    }

    /// 附带原始条目文本
    pub fn with_block(mut self, block: Option<String>) -> Self {
        self.block = block;
        self
    }
}

/// 删除结果：删除前的存储位置，以及存储能提供时的原始条目文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedKey {
    pub position: usize,
    /// 条目在文件中的原文（含前导空白）；内存存储等没有原文的实现为 None
    pub block: Option<String>,
}

impl RemovedKey {
    pub fn at(position: usize) -> Self {
        Self { position, block: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> Group {
        Group::new(
            "Strings",
            "/res",
            vec![
                LocalizedFile::new("/res/Strings.resx", "default"),
                LocalizedFile::new("/res/Strings.de.resx", "de"),
            ],
        )
    }

    #[test]
    fn test_group_columns() {
        let group = sample_group();
        assert_eq!(group.column_count(), 3);
        assert_eq!(group.lang_for_column(0), None);
        assert_eq!(group.lang_for_column(1), Some("default"));
        assert_eq!(group.lang_for_column(2), Some("de"));
        assert_eq!(group.lang_for_column(3), None);
        assert!(group.file_for_lang("de").is_some());
        assert!(group.files[0].is_default());
    }

    #[test]
    fn test_row_absent_vs_empty() {
        let row = Row::new("Hello").with_value("default", "");
        assert!(row.has_value("default"));
        assert!(!row.has_value("de"));
        assert_eq!(row.display_value("de"), "");
    }
}
