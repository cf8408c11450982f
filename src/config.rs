use std::str::FromStr;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 门户地址
    pub base_url: String,
    /// 门户用户名
    pub username: Option<String>,
    /// 门户密码
    pub password: Option<String>,
    /// 云盘中存放学生文件夹的根目录ID
    pub drive_folder_id: Option<String>,
    /// 云盘 API 访问令牌
    pub drive_access_token: String,
    /// 云盘 API 地址
    pub drive_api_base_url: String,
    /// 开发模式
    pub dev_mode: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 课程刷新 ---
    /// 后台刷新间隔（秒）
    pub refresh_interval_secs: u64,
    /// 是否记录后台刷新结果
    pub log_refresh: bool,
    /// 图片创建时间的时区偏移（小时）
    pub image_offset_hours: i64,
    // --- 教师统计 ---
    /// 每批处理的教师数量
    pub stats_chunk: usize,
    /// 批次间隔（秒）
    pub stats_delay_secs: u64,
    /// 最多统计的教师数量
    pub stats_max_teachers: Option<usize>,
    /// 每位教师最多统计的班级数量
    pub stats_max_classes: Option<usize>,
    // --- 文件 ---
    /// 登录历史文件
    pub credentials_history_file: String,
    /// 下载图片存放目录
    pub images_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.izus.cz".to_string(),
            username: None,
            password: None,
            drive_folder_id: None,
            drive_access_token: String::new(),
            drive_api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            dev_mode: false,
            verbose_logging: false,
            refresh_interval_secs: 10,
            log_refresh: false,
            image_offset_hours: 1,
            stats_chunk: 20,
            stats_delay_secs: 5,
            stats_max_teachers: None,
            stats_max_classes: None,
            credentials_history_file: "auth/credentials-history.json".to_string(),
            images_dir: "images".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let dev_mode = std::env::var("APP_ENV")
            .map(|v| v == "development")
            .unwrap_or(default.dev_mode);
        // 开发模式下限制统计规模
        let (max_teachers, max_classes) = if dev_mode {
            (Some(6), Some(5))
        } else {
            (default.stats_max_teachers, default.stats_max_classes)
        };

        Self {
            base_url: std::env::var("BASE_URL").unwrap_or(default.base_url),
            username: std::env::var("IZUS_USERNAME").ok().or(default.username),
            password: std::env::var("IZUS_PASSWORD").ok().or(default.password),
            drive_folder_id: std::env::var("GOOGLE_FOLDER_ID").ok().or(default.drive_folder_id),
            drive_access_token: std::env::var("GOOGLE_ACCESS_TOKEN").unwrap_or(default.drive_access_token),
            drive_api_base_url: std::env::var("GOOGLE_DRIVE_API_URL").unwrap_or(default.drive_api_base_url),
            dev_mode,
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            refresh_interval_secs: env_parse("REFRESH_INTERVAL").unwrap_or(default.refresh_interval_secs),
            log_refresh: env_parse("LOG_REFRESH").unwrap_or(default.log_refresh),
            image_offset_hours: env_parse("IMAGE_OFFSET_HOURS").unwrap_or(default.image_offset_hours),
            stats_chunk: env_parse("STATS_CHUNK").unwrap_or(default.stats_chunk),
            stats_delay_secs: env_parse("STATS_DELAY").unwrap_or(default.stats_delay_secs),
            stats_max_teachers: env_parse("STATS_MAX_TEACHERS").or(max_teachers),
            stats_max_classes: env_parse("STATS_MAX_CLASSES").or(max_classes),
            credentials_history_file: std::env::var("CREDENTIALS_HISTORY_FILE")
                .unwrap_or(default.credentials_history_file),
            images_dir: std::env::var("IMAGES_DIR").unwrap_or(default.images_dir),
        }
    }
}

/// 读取并解析环境变量，不存在或无法解析时返回 `None`
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
