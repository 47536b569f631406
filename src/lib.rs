pub mod resource_types;
pub mod resx;
pub mod io;
pub mod table;
pub mod selection;
pub mod editor;
pub mod watcher;
pub mod settings;
pub mod utils;

// 重新导出主要结构
pub use resource_types::{Group, KeyInsert, LocalizedFile, RemovedKey, Row};
pub use resx::{select_group, ResxDocument};
pub use io::{ConfirmPrompt, MemoryStore, ResourceStore, ResxFileStore};
pub use table::{RowFilter, RowPatch, RowTable};
pub use selection::{CellPos, CellRange, SelectionTracker};
pub use editor::{EditError, EditorSession, HistoryAction, HistoryLog, MutationCoordinator};
pub use watcher::{ChangeEvent, DirectoryWatcher, ReloadDebouncer};
pub use settings::{EditorSettings, SavedGroup};
pub use utils::{locale_cmp, ResxError};

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["resx"];

/// 无语言后缀文件的语言标识
pub const DEFAULT_LANG: &str = "default";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
