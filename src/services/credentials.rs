//! 登录信息 - 业务能力层
//!
//! - `CredentialsManager`：当前的用户名/密码及已确认的当前用户
//! - `CredentialsHistory`：登录过的用户，保存在 JSON 文件中
//! - `SchoolDirectory`：学校列表（只有系统管理员需要）

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clients::PortalClient;
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::auth::WhoamiResponse;
use crate::models::{Credentials, CredentialsHistoryEntry, Role, School, SchoolInfo, Whoami};

/// 登录信息管理
#[derive(Debug, Default)]
pub struct CredentialsManager {
    username: Option<String>,
    password: Option<String>,
    whoami: Option<Whoami>,
}

impl CredentialsManager {
    pub fn from_config(config: &Config) -> Self {
        Self {
            username: config.username.clone().filter(|u| !u.is_empty()),
            password: config.password.clone().filter(|p| !p.is_empty()),
            whoami: None,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// 当前的登录信息，未设置时返回错误
    pub fn credentials(&self) -> AppResult<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(ConfigError::MissingCredentials.into()),
        }
    }

    pub fn set(&mut self, credentials: Credentials) {
        self.username = Some(credentials.username);
        self.password = Some(credentials.password);
        self.whoami = None;
    }

    pub fn forget(&mut self) {
        self.username = None;
        self.password = None;
        self.whoami = None;
    }

    pub fn whoami(&self) -> Option<&Whoami> {
        self.whoami.as_ref()
    }

    pub fn set_whoami(&mut self, whoami: Whoami) {
        self.whoami = Some(whoami);
    }
}

/// 登录历史
#[derive(Debug)]
pub struct CredentialsHistory {
    file: PathBuf,
    entries: Vec<CredentialsHistoryEntry>,
}

impl CredentialsHistory {
    /// 读取登录历史
    ///
    /// 文件不存在时为空历史；文件损坏时记录错误并从空历史开始
    pub async fn load(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let entries = match read_entries(&file).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️ 无法读取登录历史，将从空历史开始: {}", e);
                Vec::new()
            }
        };
        Self { file, entries }
    }

    pub fn entries(&self) -> &[CredentialsHistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按最近登录时间倒序排列的记录
    pub fn newest_first(&self) -> Vec<&CredentialsHistoryEntry> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.last_login.cmp(&a.last_login));
        entries
    }

    /// 记录一次登录并保存
    ///
    /// 同一用户只保留最近的一条记录
    pub async fn add(&mut self, whoami: Whoami) -> AppResult<()> {
        self.entries.retain(|e| e.whoami.id != whoami.id);
        self.entries.push(CredentialsHistoryEntry {
            whoami,
            last_login: Utc::now(),
        });
        self.save().await
    }

    async fn save(&self) -> AppResult<()> {
        let write_failed = |source| {
            AppError::from(FileError::WriteFailed {
                path: self.file.display().to_string(),
                source,
            })
        };

        if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        tokio::fs::write(&self.file, json).await.map_err(write_failed)?;
        debug!("登录历史已保存: {}", self.file.display());
        Ok(())
    }
}

async fn read_entries(file: &Path) -> AppResult<Vec<CredentialsHistoryEntry>> {
    let text = match tokio::fs::read_to_string(file).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(FileError::ReadFailed {
                path: file.display().to_string(),
                source,
            }
            .into())
        }
    };
    serde_json::from_str(&text).map_err(|_| {
        FileError::Corrupted {
            path: file.display().to_string(),
        }
        .into()
    })
}

/// 学校列表缓存
#[derive(Default)]
pub struct SchoolDirectory {
    schools: Mutex<Option<HashMap<u64, School>>>,
}

impl SchoolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找学校（首次调用时获取列表）
    pub async fn find(&self, portal: &PortalClient, school_id: u64) -> AppResult<Option<School>> {
        let mut schools = self.schools.lock().await;
        if schools.is_none() {
            let fetched = portal.schools().await?;
            *schools = Some(fetched.into_values().map(|s| (s.id_skoly, School::from(s))).collect());
        }
        Ok(schools.as_ref().and_then(|s| s.get(&school_id).cloned()))
    }
}

/// 获取当前登录用户
///
/// 只有系统管理员会查询学校的完整信息，其他角色只显示学校编号
pub async fn fetch_whoami(portal: &PortalClient, schools: &SchoolDirectory, user: &str) -> AppResult<Whoami> {
    let res = portal.whoami().await?;
    let school = if res.role == Role::FullAdmin {
        let school_id = parse_id(&res.school_id, "id_skoly")?;
        match schools.find(portal, school_id).await? {
            Some(school) => SchoolInfo::School(school),
            None => SchoolInfo::Label(format!("学校 {}", school_id)),
        }
    } else {
        SchoolInfo::Label(format!("学校 {}", res.school_id))
    };
    whoami_from_response(res, user, school)
}

fn whoami_from_response(res: WhoamiResponse, user: &str, school: SchoolInfo) -> AppResult<Whoami> {
    Ok(Whoami {
        id: parse_id(&res.id, "id")?,
        user: user.to_string(),
        user_name: res.user_name,
        school,
        admin: res.admin,
        role: res.role,
        role_name: res.role.name().to_string(),
    })
}

fn parse_id(value: &str, field: &str) -> AppResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::User(format!("门户返回了无效的 {}: '{}'", field, value)))
}
