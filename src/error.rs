use std::sync::Arc;

use thiserror::Error;

/// 应用程序错误类型
///
/// 除 `Internal` 外都属于"用户可见错误"：预期内的失败，格式化后展示给用户，
/// 不会终止程序。`Internal` 表示程序错误，展示时带有单独的标签。
#[derive(Debug, Error)]
pub enum AppError {
    /// 门户 / 云盘 API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// HTML 解析错误（门户页面结构变化）
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 用户输入无效（可重新输入）
    #[error("{0}")]
    Input(String),
    /// 其他用户可见错误
    #[error("{0}")]
    User(String),
    /// 未登录
    #[error("用户未登录")]
    NotLoggedIn,
    /// 多个调用方共享同一次请求时传递的错误
    #[error(transparent)]
    Shared(Arc<AppError>),
    /// 程序错误
    #[error("{0}")]
    Internal(String),
}

/// 门户 / 云盘 API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回错误状态码
    #[error("API返回错误响应 ({endpoint}): status={status}")]
    BadStatus { endpoint: String, status: u16 },
    /// 登录失败
    #[error("登录失败: {0}")]
    LoginFailed(String),
    /// JSON 解析失败
    #[error("JSON解析失败: {0}")]
    JsonParseFailed(#[from] serde_json::Error),
}

/// HTML 解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// 页面中找不到解析依赖的元素，通常意味着门户页面结构已变化
    #[error("页面结构已变化 ({page}): 找不到 `{selector}`")]
    FormatChanged { page: &'static str, selector: String },
    /// 日期格式无效
    #[error("无效的日期: '{0}'")]
    InvalidDate(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 文件内容已损坏
    #[error("文件内容已损坏: {path}")]
    Corrupted { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少登录信息
    #[error("缺少登录信息，请先设置用户名和密码")]
    MissingCredentials,
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

impl From<Arc<AppError>> for AppError {
    fn from(err: Arc<AppError>) -> Self {
        AppError::Shared(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建输入错误
    pub fn input(msg: impl Into<String>) -> Self {
        AppError::Input(msg.into())
    }

    /// 是否为输入错误（包括共享请求中传递的输入错误）
    pub fn is_input_error(&self) -> bool {
        match self {
            AppError::Input(_) => true,
            AppError::Shared(inner) => inner.is_input_error(),
            _ => false,
        }
    }

    /// 是否为用户可见错误
    pub fn is_user_facing(&self) -> bool {
        match self {
            AppError::Internal(_) => false,
            AppError::Shared(inner) => inner.is_user_facing(),
            _ => true,
        }
    }
}

/// 向用户展示错误
///
/// 用户可见错误直接显示，程序错误带有单独的标签，开发模式下还会输出完整结构
pub fn report_error(err: &AppError, dev_mode: bool) {
    if err.is_user_facing() {
        tracing::error!("❌ {}", err);
    } else {
        tracing::error!("💥 程序错误: {}", err);
        if dev_mode {
            tracing::error!("{:#?}", err);
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_error_keeps_kind() {
        let shared = AppError::from(Arc::new(AppError::input("bad number")));
        assert!(shared.is_input_error());
        assert!(shared.is_user_facing());
        assert_eq!(shared.to_string(), "bad number");

        let internal = AppError::from(Arc::new(AppError::Internal("boom".into())));
        assert!(!internal.is_user_facing());
    }

    #[test]
    fn test_format_changed_message() {
        let err = AppError::from(ParseError::FormatChanged {
            page: "index",
            selector: "table.tridni_kniha".into(),
        });
        assert!(err.to_string().contains("table.tridni_kniha"));
        assert!(!err.is_input_error());
    }
}
