/// ResX 资源文件格式模块
///
/// 提供 `.resx` 文件的读写与目录扫描，是 `ResourceStore` 默认实现的基础。
/// 只处理 `<data name="…"><value>…</value></data>` 条目，其它内容原样保留。
///
/// # 架构设计
///
/// - **document**: 基于文本区间的 ResX 文档，支持按位置插入/删除
/// - **scan**: 目录扫描与语言后缀识别
pub mod document;
pub mod scan;

// === 导出公共接口 ===
pub use document::{ResxDocument, TextEncoding};
pub use scan::{is_resource_file, scan_directory, select_group, split_file_name};
