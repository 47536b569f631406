use std::path::PathBuf;

use thiserror::Error;

/// 编辑层错误类型
#[derive(Error, Debug)]
pub enum EditError {
    /// 单文件操作失败，或扇出中所有文件都失败
    #[error("{operation} failed: {reason}")]
    StoreIo { operation: String, reason: String },

    /// 扇出中部分文件失败；已成功的文件不回滚
    #[error("{operation} failed on {} of {total} files", .failed.len())]
    PartialFanout {
        operation: String,
        failed: Vec<(PathBuf, String)>,
        total: usize,
    },

    /// 撤销失败，操作仍留在历史记录顶部
    #[error("undo step {step}/{total} ({action}) failed: {reason}")]
    UndoReversal {
        step: usize,
        total: usize,
        action: String,
        reason: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Cancelled by user")]
    Cancelled,
}

impl EditError {
    /// 该错误发生后行表是否已与磁盘不一致（需要重新加载）
    pub fn requires_reload(&self) -> bool {
        matches!(
            self,
            EditError::StoreIo { .. } | EditError::PartialFanout { .. } | EditError::UndoReversal { .. }
        )
    }
}
