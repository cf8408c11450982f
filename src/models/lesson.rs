use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::drive::DriveFile;
use crate::models::student::Student;

/// 待完成的课程（来自门户首页）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// 在当前快照中的序号（从0开始），"打开第 N 节课"以此寻址
    pub index: usize,
    pub date: NaiveDate,
    pub student: Student,
    /// 门户中填写课程记录的链接
    pub link: String,
    /// 与课程日期匹配的笔记本照片
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<DriveFile>,
}

impl Lesson {
    /// 已匹配到照片的课程可以打开
    pub fn is_openable(&self) -> bool {
        self.image.is_some()
    }
}

/// 只保留可以打开的课程
pub fn lessons_with_image(lessons: &[Lesson]) -> Vec<Lesson> {
    lessons.iter().filter(|l| l.is_openable()).cloned().collect()
}
