/// 云盘 API 客户端
///
/// 学生上传的笔记本照片存放在云盘中，每个学生一个以全名命名的文件夹
use std::future::Future;

use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::drive::{CreatedFolder, DriveFileList};
use crate::models::DriveFile;

/// 云盘访问能力
pub trait DriveApi: Send + Sync + 'static {
    /// 列出文件夹中的文件（未删除的）；`None` 表示列出所有可见文件
    fn list_files(&self, folder_id: Option<&str>) -> impl Future<Output = AppResult<Vec<DriveFile>>> + Send;

    /// 下载文件内容
    fn download(&self, file_id: &str) -> impl Future<Output = AppResult<Vec<u8>>> + Send;

    /// 新建文件夹
    fn create_folder(&self, name: &str, parent_id: Option<&str>) -> impl Future<Output = AppResult<CreatedFolder>> + Send;
}

/// Google Drive v3 客户端
///
/// 使用预先获取的访问令牌，不处理 OAuth 授权流程
pub struct GoogleDriveClient {
    http: Client,
    api_base_url: String,
    access_token: String,
}

impl GoogleDriveClient {
    /// 每页文件数量
    const PAGE_SIZE: u32 = 100;

    /// 创建新的云盘客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            api_base_url: config.drive_api_base_url.trim_end_matches('/').to_string(),
            access_token: config.drive_access_token.clone(),
        }
    }

    async fn send(&self, endpoint: &str, builder: reqwest::RequestBuilder) -> AppResult<reqwest::Response> {
        let res = builder
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::request_failed(endpoint, e))?;
        if !res.status().is_success() {
            return Err(ApiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: res.status().as_u16(),
            }
            .into());
        }
        Ok(res)
    }
}

impl DriveApi for GoogleDriveClient {
    async fn list_files(&self, folder_id: Option<&str>) -> AppResult<Vec<DriveFile>> {
        let endpoint = format!("{}/files", self.api_base_url);
        let mut q = "trashed=false".to_string();
        if let Some(folder_id) = folder_id {
            q.push_str(&format!(" and '{}' in parents", folder_id));
        }

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("q", q.clone()),
                ("fields", "nextPageToken, files(id, name, createdTime, mimeType)".to_string()),
                ("pageSize", Self::PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let res = self.send(&endpoint, self.http.get(&endpoint).query(&query)).await?;
            let text = res.text().await.map_err(|e| AppError::request_failed(endpoint.clone(), e))?;
            let page: DriveFileList = serde_json::from_str(&text)?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("云盘文件夹 {:?} 中有 {} 个文件", folder_id, files.len());
        Ok(files)
    }

    async fn download(&self, file_id: &str) -> AppResult<Vec<u8>> {
        let endpoint = format!("{}/files/{}", self.api_base_url, file_id);
        let res = self
            .send(&endpoint, self.http.get(&endpoint).query(&[("alt", "media")]))
            .await?;
        let bytes = res.bytes().await.map_err(|e| AppError::request_failed(endpoint.clone(), e))?;
        Ok(bytes.to_vec())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<CreatedFolder> {
        let endpoint = format!("{}/files", self.api_base_url);
        let body = json!({
            "name": name,
            "mimeType": DriveFile::FOLDER_MIME_TYPE,
            "parents": parent_id.into_iter().collect::<Vec<_>>(),
        });
        let res = self
            .send(
                &endpoint,
                self.http
                    .post(&endpoint)
                    .query(&[("fields", "id, name, webViewLink")])
                    .json(&body),
            )
            .await?;
        let text = res.text().await.map_err(|e| AppError::request_failed(endpoint.clone(), e))?;
        Ok(serde_json::from_str(&text)?)
    }
}
