/// 门户 API 客户端
///
/// 封装所有与 iZUŠ 门户相关的调用逻辑：JSON 接口（登录、当前用户、学校）
/// 和需要解析的 HTML 页面
use std::future::Future;
use std::sync::RwLock;

use md5::Md5;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::auth::{LoginResponse, SchoolsResponse, WhoamiResponse};
use crate::models::Credentials;

/// 门户页面访问能力
///
/// 只返回原始 HTML，解析交给 `parsers`
pub trait PortalApi: Send + Sync + 'static {
    /// 是否已登录
    fn is_logged_in(&self) -> bool;

    /// 首页（待完成的课程，未登录时也可访问）
    fn index_page(&self) -> impl Future<Output = AppResult<String>> + Send;

    /// 学生列表
    fn students_page(&self) -> impl Future<Output = AppResult<String>> + Send;

    /// 教职工列表
    fn staff_page(&self) -> impl Future<Output = AppResult<String>> + Send;

    /// 教职工的文档页（包含班级列表）
    fn staff_documents_page(&self, teacher_id: u64) -> impl Future<Output = AppResult<String>> + Send;

    /// 班级的课堂记录页
    fn class_log_page(&self, student_id: u64, class_id: u64) -> impl Future<Output = AppResult<String>> + Send;
}

/// 计算登录用的密码哈希：`sha1(md5(password + username) + salt)`
pub fn password_hash(username: &str, password: &str, salt: &str) -> String {
    let part = format!("{:x}", Md5::digest(format!("{}{}", password, username).as_bytes()));
    format!("{:x}", Sha1::digest(format!("{}{}", part, salt).as_bytes()))
}

/// 门户客户端
pub struct PortalClient {
    http: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl PortalClient {
    /// 创建新的门户客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::User(format!("无效的门户地址 '{}': {}", config.base_url, e)))?;
        let http = Client::builder()
            .build()
            .map_err(|e| AppError::request_failed(config.base_url.clone(), e))?;
        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// 将门户内的相对链接转换为完整地址
    pub fn absolute_url(&self, link: &str) -> AppResult<Url> {
        self.base_url
            .join(link)
            .map_err(|e| AppError::User(format!("无效的链接 '{}': {}", link, e)))
    }

    /// 登录
    ///
    /// 成功后返回的令牌会用于之后的所有请求
    pub async fn login(&self, credentials: &Credentials) -> AppResult<LoginResponse> {
        let salt = chrono::Utc::now().timestamp().to_string();
        let body = json!({
            "username": credentials.username,
            "password": password_hash(&credentials.username, &credentials.password, &salt),
            "salt": salt,
        });

        debug!("正在登录: {}", credentials.username);
        let res = self
            .http
            .post(self.url("/ws/api/login")?)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::LoginFailed(e.to_string()))?;

        if !res.status().is_success() {
            return Err(ApiError::LoginFailed(format!("status={}", res.status().as_u16())).into());
        }

        let login: LoginResponse = res.json().await.map_err(|e| ApiError::LoginFailed(e.to_string()))?;
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(login.access_token.clone());
        info!("✓ 登录成功: {}", credentials.username);
        Ok(login)
    }

    /// 未登录时先登录
    pub async fn ensure_logged_in(&self, credentials: &Credentials) -> AppResult<()> {
        if !self.is_logged_in() {
            self.login(credentials).await?;
        }
        Ok(())
    }

    /// 退出登录
    pub async fn logout(&self) -> AppResult<()> {
        let result = self.get_json::<serde_json::Value>("/ws/api/logout", &[]).await;
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        result.map(|_| ())
    }

    /// 当前用户
    pub async fn whoami(&self) -> AppResult<WhoamiResponse> {
        self.get_json("/ws/whoami", &[]).await
    }

    /// 学校列表
    pub async fn schools(&self) -> AppResult<SchoolsResponse> {
        self.get_json("/ws/skoly", &[]).await
    }

    fn url(&self, path: &str) -> AppResult<Url> {
        self.absolute_url(path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read().unwrap_or_else(|e| e.into_inner()).as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> AppResult<reqwest::Response> {
        let builder = self
            .http
            .get(self.url(path)?)
            .query(query)
            .header("Accept", "application/json, text/html");
        let res = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| AppError::request_failed(path, e))?;

        if !res.status().is_success() {
            return Err(ApiError::BadStatus {
                endpoint: path.to_string(),
                status: res.status().as_u16(),
            }
            .into());
        }
        Ok(res)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        let text = self
            .get(path, query)
            .await?
            .text()
            .await
            .map_err(|e| AppError::request_failed(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_page(&self, path: &str, query: &[(&str, String)]) -> AppResult<String> {
        debug!("获取页面: {} {:?}", path, query);
        self.get(path, query)
            .await?
            .text()
            .await
            .map_err(|e| AppError::request_failed(path, e))
    }
}

impl PortalApi for PortalClient {
    fn is_logged_in(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    async fn index_page(&self) -> AppResult<String> {
        self.get_page("/", &[]).await
    }

    async fn students_page(&self) -> AppResult<String> {
        self.get_page("/zaci/", &[]).await
    }

    async fn staff_page(&self) -> AppResult<String> {
        let query = [
            ("pocet_zaznamu_na_jedne_strane", "vsechny".to_string()),
            ("zobrazit_sloupce", "ano".to_string()),
            ("zobrazit_prijmeni", "ano".to_string()),
            ("zobrazit_jmeno", "ano".to_string()),
        ];
        self.get_page("/zamestnanci/", &query).await
    }

    async fn staff_documents_page(&self, teacher_id: u64) -> AppResult<String> {
        self.get_page("/zamestnanci/dokumenty/", &[("id_zamestnance", teacher_id.to_string())])
            .await
    }

    async fn class_log_page(&self, student_id: u64, class_id: u64) -> AppResult<String> {
        let query = [
            ("id_zaka", student_id.to_string()),
            ("id_tridni_knihy", class_id.to_string()),
        ];
        self.get_page("/zaci/dokumenty/tridni_kniha/", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash() {
        let hash = password_hash("novak", "tajne", "1700000000");
        assert_eq!(hash, "9f9436d06c84849f9e3b406c446418efe0f7e743");
        assert_ne!(hash, password_hash("novak", "tajne", "1700000001"));
        assert_ne!(hash, password_hash("novakova", "tajne", "1700000000"));
    }

    #[test]
    fn test_absolute_url() {
        let client = PortalClient::new(&Config {
            base_url: "https://skola.izus.cz".to_string(),
            ..Config::default()
        })
        .unwrap();
        assert_eq!(
            client.absolute_url("/zapis/?id=5").unwrap().as_str(),
            "https://skola.izus.cz/zapis/?id=5"
        );
        assert!(!client.is_logged_in());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = PortalClient::new(&Config {
            base_url: "není adresa".to_string(),
            ..Config::default()
        });
        assert!(result.is_err());
    }
}
