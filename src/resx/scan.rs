use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::resource_types::{Group, LocalizedFile};
use crate::utils::ResxError;
use crate::{DEFAULT_LANG, SUPPORTED_EXTENSIONS};

/// 语言后缀的最大长度（如 "az-Latn-AZ"）
const MAX_LANG_LEN: usize = 10;

/// 检查路径是否为支持的资源文件
pub fn is_resource_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// 从文件名拆出组名和语言
///
/// - `Strings.resx` → ("Strings", "default")
/// - `Strings.de.resx` → ("Strings", "de")
/// - `App.Errors.zh-Hans.resx` → ("App.Errors", "zh-Hans")
/// - `Strings.1234.resx` → ("Strings.1234", "default")
pub fn split_file_name(path: &Path) -> Option<(String, String)> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }

    let parts: Vec<&str> = stem.split('.').collect();
    if parts.len() > 1 {
        let candidate = parts[parts.len() - 1];
        let looks_like_lang = !candidate.is_empty()
            && candidate.len() <= MAX_LANG_LEN
            && candidate.chars().next().map_or(false, |c| c.is_ascii_alphabetic());
        if looks_like_lang {
            return Some((parts[..parts.len() - 1].join("."), candidate.to_string()));
        }
    }
    Some((stem.to_string(), DEFAULT_LANG.to_string()))
}

/// 递归扫描目录，把同目录下同名的各语言资源文件归为一组
///
/// 组内文件默认语言在前、其余按语言标识排序；组按名称（再按目录）排序。
pub fn scan_directory(directory: &Path) -> Result<Vec<Group>, ResxError> {
    if !directory.is_dir() {
        return Err(ResxError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在: {:?}", directory),
        )));
    }

    let mut groups: HashMap<(PathBuf, String), Group> = HashMap::new();

    for entry in WalkDir::new(directory).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_resource_file(path) {
            continue;
        }
        let Some((name, lang)) = split_file_name(path) else {
            continue;
        };
        let parent = path.parent().unwrap_or(Path::new("")).to_path_buf();

        groups
            .entry((parent.clone(), name.clone()))
            .or_insert_with(|| Group::new(name, parent, Vec::new()))
            .files
            .push(LocalizedFile::new(path, lang));
    }

    let mut result: Vec<Group> = groups.into_values().collect();
    for group in &mut result {
        group.files.sort_by(|a, b| {
            b.is_default()
                .cmp(&a.is_default())
                .then_with(|| a.lang.cmp(&b.lang))
        });
    }
    result.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.directory.cmp(&b.directory)));

    log::debug!("扫描 {:?}: 找到 {} 个资源组", directory, result.len());
    Ok(result)
}

/// 从扫描结果中按名称选出资源组
///
/// 扫描是递归的，子目录里可能有同名资源组。名称唯一时直接返回；
/// 否则取目录正好是 `directory` 的那个，仍无法确定时返回 `AmbiguousGroup`。
pub fn select_group(groups: Vec<Group>, name: &str, directory: &Path) -> Result<Group, ResxError> {
    let mut matches: Vec<Group> = groups.into_iter().filter(|g| g.name == name).collect();
    match matches.len() {
        0 => return Err(ResxError::GroupNotFound(name.to_string())),
        1 => return Ok(matches.remove(0)),
        _ => {}
    }

    let wanted = directory.canonicalize().unwrap_or_else(|_| directory.to_path_buf());
    let same_dir = |g: &Group| {
        g.directory == directory || g.directory.canonicalize().map_or(false, |d| d == wanted)
    };
    match matches.iter().position(same_dir) {
        Some(index) => Ok(matches.swap_remove(index)),
        None => Err(ResxError::AmbiguousGroup {
            name: name.to_string(),
            directories: matches.into_iter().map(|g| g.directory).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_file_name() {
        let cases = [
            ("Strings.resx", ("Strings", "default")),
            ("Strings.de.resx", ("Strings", "de")),
            ("App.Errors.zh-Hans.resx", ("App.Errors", "zh-Hans")),
            ("Strings.1234.resx", ("Strings.1234", "default")),
            ("Strings.averyverylongsuffix.resx", ("Strings.averyverylongsuffix", "default")),
        ];
        for (file, (name, lang)) in cases {
            let (n, l) = split_file_name(Path::new(file)).unwrap();
            assert_eq!((n.as_str(), l.as_str()), (name, lang), "{}", file);
        }
    }

    #[test]
    fn test_is_resource_file() {
        assert!(is_resource_file(Path::new("a/Strings.resx")));
        assert!(is_resource_file(Path::new("a/Strings.RESX")));
        assert!(!is_resource_file(Path::new("a/Strings.xml")));
        assert!(!is_resource_file(Path::new("a/resx")));
    }

    #[test]
    fn test_scan_groups_and_orders_files() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        for name in ["Strings.fr.resx", "Strings.resx", "Strings.de.resx", "Errors.resx", "notes.txt"] {
            std::fs::write(dir.path().join(name), "<root></root>").unwrap();
        }
        std::fs::write(sub.join("Strings.resx"), "<root></root>").unwrap();

        let groups = scan_directory(dir.path()).unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Errors", "Strings", "Strings"]);

        let top = groups
            .iter()
            .find(|g| g.name == "Strings" && g.directory == dir.path())
            .unwrap();
        assert_eq!(top.languages(), vec!["default", "de", "fr"]);
    }

    #[test]
    fn test_select_group_prefers_exact_directory() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        let deeper = dir.path().join("deeper");
        std::fs::create_dir(&sub).unwrap();
        std::fs::create_dir(&deeper).unwrap();
        std::fs::write(dir.path().join("Strings.resx"), "<root></root>").unwrap();
        std::fs::write(sub.join("Strings.resx"), "<root></root>").unwrap();
        std::fs::write(deeper.join("Strings.resx"), "<root></root>").unwrap();
        std::fs::write(sub.join("Errors.resx"), "<root></root>").unwrap();

        let groups = scan_directory(dir.path()).unwrap();
        let top = select_group(groups.clone(), "Strings", dir.path()).unwrap();
        assert_eq!(top.directory, dir.path());

        // 名称唯一时与所在子目录无关
        let errors = select_group(groups.clone(), "Errors", dir.path()).unwrap();
        assert_eq!(errors.directory, sub);

        assert!(matches!(
            select_group(groups, "Missing", dir.path()),
            Err(ResxError::GroupNotFound(_))
        ));
    }

    #[test]
    fn test_select_group_reports_ambiguous_name() {
        let dir = TempDir::new().unwrap();
        for sub in ["a", "b"] {
            let path = dir.path().join(sub);
            std::fs::create_dir(&path).unwrap();
            std::fs::write(path.join("Strings.resx"), "<root></root>").unwrap();
        }

        let groups = scan_directory(dir.path()).unwrap();
        match select_group(groups, "Strings", dir.path()) {
            Err(ResxError::AmbiguousGroup { directories, .. }) => assert_eq!(directories.len(), 2),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_scan_missing_directory() {
        assert!(scan_directory(Path::new("does/not/exist")).is_err());
    }
}
