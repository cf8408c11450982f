//! 门户页面解析
//!
//! 纯函数：HTML 字符串 → 类型化的列表

pub mod html;

pub use html::{parse_classes, parse_pending_lessons, parse_records, parse_students, parse_teachers};
