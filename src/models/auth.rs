use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 登录信息
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Role {
    Student,
    LegalGuardian,
    Employee,
    Executive,
    SchoolAdmin,
    FullAdmin,
    Other(u8),
}

impl From<u8> for Role {
    fn from(code: u8) -> Self {
        match code {
            1 => Role::Student,
            3 => Role::LegalGuardian,
            5 => Role::Employee,
            7 => Role::Executive,
            8 => Role::SchoolAdmin,
            9 => Role::FullAdmin,
            other => Role::Other(other),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => 1,
            Role::LegalGuardian => 3,
            Role::Employee => 5,
            Role::Executive => 7,
            Role::SchoolAdmin => 8,
            Role::FullAdmin => 9,
            Role::Other(code) => code,
        }
    }
}

impl Role {
    /// 获取角色名称
    pub fn name(self) -> &'static str {
        match self {
            Role::Student => "学生",
            Role::LegalGuardian => "法定监护人",
            Role::Employee => "教职工",
            Role::Executive => "校领导",
            Role::SchoolAdmin => "学校管理员",
            Role::FullAdmin => "系统管理员",
            Role::Other(_) => "其他",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 门户版本（捷克 / 斯洛伐克）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    #[default]
    Cz,
    Sk,
}

/// 学校
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub school_id: u64,
    pub name: String,
    pub name_short: String,
    pub version: Version,
}

/// 当前用户所属学校：完整信息，或只有显示名称
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchoolInfo {
    School(School),
    Label(String),
}

impl SchoolInfo {
    pub fn display_name(&self) -> &str {
        match self {
            SchoolInfo::School(school) => &school.name_short,
            SchoolInfo::Label(label) => label,
        }
    }
}

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Whoami {
    pub id: u64,
    /// 登录用户名
    pub user: String,
    /// 显示名称
    pub user_name: String,
    pub school: SchoolInfo,
    pub admin: bool,
    pub role: Role,
    pub role_name: String,
}

/// 登录历史记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsHistoryEntry {
    #[serde(flatten)]
    pub whoami: Whoami,
    pub last_login: DateTime<Utc>,
}

// ========== 门户 JSON 接口响应 ==========

/// `POST /ws/api/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// `GET /ws/whoami`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoamiResponse {
    pub id: String,
    pub user_name: String,
    #[serde(rename = "id_skoly")]
    pub school_id: String,
    pub admin: bool,
    pub role: Role,
}

/// `GET /ws/skoly` 中的一所学校
#[derive(Debug, Clone, Deserialize)]
pub struct SchoolResponse {
    pub id_skoly: u64,
    pub nazev: String,
    pub nazev_zkracene: String,
    #[serde(default)]
    pub e_mail: String,
    pub verze: Version,
}

impl From<SchoolResponse> for School {
    fn from(res: SchoolResponse) -> Self {
        Self {
            school_id: res.id_skoly,
            name: res.nazev,
            name_short: res.nazev_zkracene,
            version: res.verze,
        }
    }
}

/// `GET /ws/skoly`：学校ID → 学校
pub type SchoolsResponse = HashMap<String, SchoolResponse>;
