use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 云盘文件（或文件夹）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl DriveFile {
    pub const FOLDER_MIME_TYPE: &'static str = "application/vnd.google-apps.folder";

    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(Self::FOLDER_MIME_TYPE)
    }
}

/// 云盘文件列表响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// 新建文件夹的响应
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}
