use thiserror::Error;
use std::path::{Path, PathBuf};
use std::cmp::Ordering;

/// 存储层错误类型
#[derive(Error, Debug)]
pub enum ResxError {
    #[error("XML error: {0}")]
    Xml(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Key already exists: {0}")]
    KeyExists(String),

    #[error("Not a resource file name: {0:?}")]
    InvalidFileName(PathBuf),

    #[error("Resource group not found: {0}")]
    GroupNotFound(String),

    #[error("Resource group {name} exists in several directories: {directories:?}")]
    AmbiguousGroup { name: String, directories: Vec<PathBuf> },

    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for ResxError {
    fn from(e: quick_xml::Error) -> Self {
        ResxError::Xml(e.to_string())
    }
}

impl From<notify::Error> for ResxError {
    fn from(e: notify::Error) -> Self {
        ResxError::Watch(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ResxError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ResxError::Xml(e.to_string())
    }
}

/// 键名比较（近似区域感知排序）
///
/// 先按忽略大小写的字符序比较，相同时再按原始字节序，保证排序稳定且全序。
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// 检查键名是否有效（非空且不全是空白）
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<PathBuf, ResxError> {
    if !file_path.exists() {
        return Err(ResxError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在"
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)
        .map_err(ResxError::IoError)?;

    Ok(backup_path)
}
