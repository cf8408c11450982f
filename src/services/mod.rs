//! 业务能力层（Services）
//!
//! 描述"我能做什么"：缓存课程、统计教师、管理登录信息。
//! 只依赖 `clients` 提供的能力，不关心命令行交互。

pub mod credentials;
pub mod lesson_cache;
pub mod teacher_stats;

pub use credentials::{fetch_whoami, CredentialsHistory, CredentialsManager, SchoolDirectory};
pub use lesson_cache::{LessonCache, LessonSettings};
pub use teacher_stats::{add_classes_to_teacher, add_percentiles, add_stats_to_teachers, teacher_stats, StatsSettings, TeacherCache};
