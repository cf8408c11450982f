use serde::{Deserialize, Serialize};

use crate::models::drive::DriveFile;
use crate::utils::Named;

/// 学生
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub first_name: String,
    pub last_name: String,
    /// 云盘中以学生全名命名的文件夹
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// 文件夹中的图片
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<DriveFile>>,
}

impl Student {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }
}

impl Named for Student {
    fn first_name(&self) -> &str {
        &self.first_name
    }

    fn last_name(&self) -> &str {
        &self.last_name
    }
}
