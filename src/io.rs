/// IO 抽象层模块
///
/// 该模块提供了资源文件存储的抽象接口，遵循依赖倒置原则。
/// 编辑核心只依赖 `ResourceStore`，可以替换为内存实现做测试。
///
/// # 架构设计
///
/// - **traits**: 定义 `ResourceStore` / `ConfirmPrompt` 接口
/// - **resx_io**: 基于文件系统的 ResX 实现
/// - **memory_io**: 内存实现，支持失败注入与调用记录
///
/// # 使用示例
///
/// ```rust,ignore
/// use resx_editor::io::{ResourceStore, ResxFileStore};
///
/// let store = ResxFileStore::new();
/// let groups = store.scan(Path::new("Resources"))?;
/// let rows = store.load_rows(&groups[0].files)?;
/// ```
pub mod traits;
pub mod resx_io;
pub mod memory_io;

// === 导出 trait 定义 ===
pub use traits::{ConfirmPrompt, ResourceStore};

// === 导出实现 ===
pub use resx_io::ResxFileStore;
pub use memory_io::MemoryStore;
