//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 持有资源并调度业务能力，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用上下文
//! - 管理应用生命周期（初始化、后台刷新、停止）
//! - 持有门户 / 云盘客户端和所有缓存
//! - 以命令的形式提供功能（登录、课程、教师）
//!
//! ### `refresh_loop` - 后台刷新
//! - 按固定间隔强制刷新课程缓存
//! - 失败不终止循环
//!
//! ## 层次关系
//!
//! ```text
//! cli (交互和展示)
//!     ↓
//! orchestrator::App (命令)
//!     ↓
//! services (能力层：lesson_cache / teacher_stats / credentials)
//!     ↓
//! parsers + clients (门户页面解析 / 门户与云盘 API)
//! ```

pub mod app;
pub mod refresh_loop;

// 重新导出主要类型
pub use app::{App, FolderReport, OpenedLesson};
pub use refresh_loop::{refresh_once, spawn_refresh_loop};
