/// 多文件并发扇出
///
/// 一次逻辑编辑对应若干个独立的文件操作：在 rayon 线程池上并发执行并全部等待，
/// 只有全部成功才算成功。失败的文件不回滚，由调用方重新加载。
use std::path::PathBuf;

use rayon::prelude::*;

use super::error::EditError;
use crate::resource_types::LocalizedFile;
use crate::utils::ResxError;

/// 扇出失败详情
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutFailure {
    /// 失败的文件及原因
    pub failed: Vec<(PathBuf, String)>,
    /// 参与扇出的文件总数
    pub total: usize,
}

impl FanoutFailure {
    /// 是否所有文件都失败
    pub fn is_total(&self) -> bool {
        self.failed.len() == self.total
    }

    /// 转换为编辑错误
    pub fn into_error(self, operation: &str) -> EditError {
        if self.is_total() && self.total <= 1 {
            let reason = self
                .failed
                .into_iter()
                .next()
                .map(|(_, reason)| reason)
                .unwrap_or_default();
            return EditError::StoreIo {
                operation: operation.to_string(),
                reason,
            };
        }
        if self.is_total() {
            return EditError::StoreIo {
                operation: operation.to_string(),
                reason: format!("all {} files failed: {}", self.total, join_reasons(&self.failed)),
            };
        }
        EditError::PartialFanout {
            operation: operation.to_string(),
            failed: self.failed,
            total: self.total,
        }
    }
}

fn join_reasons(failed: &[(PathBuf, String)]) -> String {
    failed
        .iter()
        .map(|(path, reason)| format!("{}: {}", path.display(), reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 对每个 (文件, 参数) 并发执行操作
///
/// # 返回
/// 全部成功时按输入顺序返回 (路径, 结果)；否则返回失败详情
pub fn fan_out<P, T, F>(tasks: &[(&LocalizedFile, P)], op: F) -> Result<Vec<(PathBuf, T)>, FanoutFailure>
where
    P: Sync,
    T: Send,
    F: Fn(&LocalizedFile, &P) -> Result<T, ResxError> + Sync,
{
    let results: Vec<(PathBuf, Result<T, ResxError>)> = tasks
        .par_iter()
        .map(|(file, param)| (file.path.clone(), op(file, param)))
        .collect();

    let total = results.len();
    let mut succeeded = Vec::with_capacity(total);
    let mut failed = Vec::new();
    for (path, result) in results {
        match result {
            Ok(value) => succeeded.push((path, value)),
            Err(e) => {
                log::warn!("文件操作失败 {:?}: {}", path, e);
                failed.push((path, e.to_string()));
            }
        }
    }

    if failed.is_empty() {
        Ok(succeeded)
    } else {
        Err(FanoutFailure { failed, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<LocalizedFile> {
        vec![
            LocalizedFile::new("/res/a.resx", "default"),
            LocalizedFile::new("/res/a.de.resx", "de"),
            LocalizedFile::new("/res/a.fr.resx", "fr"),
        ]
    }

    #[test]
    fn test_all_succeed_in_input_order() {
        let files = files();
        let tasks: Vec<(&LocalizedFile, usize)> = files.iter().enumerate().map(|(i, f)| (f, i)).collect();
        let results = fan_out(&tasks, |_, i| Ok(*i * 10)).unwrap();
        let values: Vec<usize> = results.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![0, 10, 20]);
    }

    #[test]
    fn test_partial_failure() {
        let files = files();
        let tasks: Vec<(&LocalizedFile, ())> = files.iter().map(|f| (f, ())).collect();
        let failure = fan_out(&tasks, |file, _| {
            if file.lang == "de" {
                Err(ResxError::Injected("boom".into()))
            } else {
                Ok(())
            }
        })
        .unwrap_err();

        assert_eq!(failure.total, 3);
        assert!(!failure.is_total());
        assert!(matches!(failure.into_error("rename"), EditError::PartialFanout { .. }));
    }

    #[test]
    fn test_total_failure_maps_to_store_io() {
        let files = files();
        let tasks: Vec<(&LocalizedFile, ())> = files.iter().map(|f| (f, ())).collect();
        let failure = fan_out(&tasks, |_, _| -> Result<(), ResxError> { Err(ResxError::Injected("x".into())) })
            .unwrap_err();
        assert!(failure.is_total());
        assert!(matches!(failure.into_error("add"), EditError::StoreIo { .. }));
    }
}
