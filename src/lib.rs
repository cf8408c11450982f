//! # iZUŠ Assistant
//!
//! 一个用于 iZUŠ 艺术学校门户的个人自动化工具
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 接入层（Clients / Parsers）
//! - `clients/` - 门户与云盘 API，只返回原始数据
//! - `PortalApi` / `DriveApi` - 访问能力的抽象，测试中可替换
//! - `parsers/` - 门户页面 HTML → 类型化的列表
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `LessonCache` - 待完成课程的缓存、照片匹配和变化检测
//! - `teacher_stats` - 教师课堂记录的相似度统计和排名
//! - `CredentialsManager` / `CredentialsHistory` - 登录信息和登录历史
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/app` - 应用上下文，持有所有资源，以命令形式提供功能
//! - `orchestrator/refresh_loop` - 后台定时刷新课程
//!
//! ### ④ 交互层（CLI）
//! - `cli/` - 逐行读取命令，展示表格
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod parsers;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{DriveApi, GoogleDriveClient, PortalApi, PortalClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::App;
pub use services::{LessonCache, LessonSettings, StatsSettings, TeacherCache};
