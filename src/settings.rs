/// 应用设置持久化
///
/// 设置保存在平台配置目录下，例如 Linux 上为 `~/.config/resx_editor/settings.json`。
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::ResxError;

/// 收藏的资源组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGroup {
    pub name: String,
    pub directory: PathBuf,
}

/// 编辑器设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub saved_groups: Vec<SavedGroup>,
    /// "light" 或 "dark"
    #[serde(default = "default_theme")]
    pub theme: String,
    /// 外部变更后重新加载的去抖窗口（毫秒）
    #[serde(default = "default_debounce_ms")]
    pub reload_debounce_ms: u64,
    /// 写文件前先备份
    #[serde(default)]
    pub backup_before_write: bool,
    /// 批量删除前是否要求确认
    #[serde(default = "default_true")]
    pub confirm_destructive: bool,
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            saved_groups: Vec::new(),
            theme: default_theme(),
            reload_debounce_ms: default_debounce_ms(),
            backup_before_write: false,
            confirm_destructive: true,
        }
    }
}

impl EditorSettings {
    /// 默认设置文件位置；无法确定配置目录时返回 None
    pub fn default_path() -> Option<PathBuf> {
        let config_dir = dirs::config_dir()?;
        Some(config_dir.join("resx_editor").join("settings.json"))
    }

    /// 读取设置，文件缺失或损坏时返回默认值
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("无法解析设置文件 {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// 保存设置（自动创建目录）
    pub fn save(&self, path: &Path) -> Result<(), ResxError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// 收藏资源组；同一目录下的同名组只保留一个。返回是否新增
    pub fn add_saved_group(&mut self, name: impl Into<String>, directory: impl Into<PathBuf>) -> bool {
        let group = SavedGroup {
            name: name.into(),
            directory: directory.into(),
        };
        if self.saved_groups.contains(&group) {
            return false;
        }
        self.saved_groups.push(group);
        true
    }

    /// 取消收藏，返回是否存在
    pub fn remove_saved_group(&mut self, name: &str, directory: &Path) -> bool {
        let before = self.saved_groups.len();
        self.saved_groups
            .retain(|g| !(g.name == name && g.directory == directory));
        self.saved_groups.len() != before
    }

    pub fn reload_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_corrupt_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(EditorSettings::load_or_default(&path), EditorSettings::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(EditorSettings::load_or_default(&path), EditorSettings::default());
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let settings = EditorSettings::load_or_default(&path);
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.reload_debounce(), Duration::from_millis(500));
        assert!(settings.confirm_destructive);
    }

    #[test]
    fn test_save_and_saved_groups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = EditorSettings::default();
        assert!(settings.add_saved_group("Strings", "/res"));
        assert!(!settings.add_saved_group("Strings", "/res"));
        settings.save(&path).unwrap();

        let mut loaded = EditorSettings::load_or_default(&path);
        assert_eq!(loaded.saved_groups.len(), 1);
        assert!(loaded.remove_saved_group("Strings", Path::new("/res")));
        assert!(loaded.saved_groups.is_empty());
    }
}
