/// 编辑器层模块
///
/// 该模块把对表格的一次逻辑编辑同步到组内的全部语言文件，并支持撤销。
/// 修改直接写入文件；行表只是快照，出现不一致时以文件为准重新加载。
///
/// # 架构设计
///
/// - **session**: 编辑会话，持有一个资源组的全部状态
/// - **coordinator**: 变更协调器，负责扇出、乐观更新和回滚
/// - **history**: 可撤销操作的历史记录
/// - **undo**: 历史记录的逆操作
/// - **fanout**: 多文件并发扇出
/// - **error**: 编辑层错误类型
///
/// # 使用示例
///
/// ```rust,ignore
/// use resx_editor::{EditorSession, ResxFileStore, ResourceStore};
///
/// let store = ResxFileStore::new();
/// let group = store.scan(Path::new("Resources"))?.remove(0);
/// let mut session = EditorSession::open(store, group)?;
///
/// session.rename_key(0, "Greeting")?;
/// println!("可撤销 {} 次", session.history_depth());
/// session.undo()?;
/// ```
pub mod error;
pub mod fanout;
pub mod history;
pub mod undo;
pub mod coordinator;
pub mod session;

// === 导出公共接口 ===
pub use coordinator::MutationCoordinator;
pub use error::EditError;
pub use fanout::{fan_out, FanoutFailure};
pub use history::{HistoryAction, HistoryLog};
pub use session::EditorSession;
