//! 应用上下文 - 编排层
//!
//! ## 职责
//!
//! 持有所有资源（客户端、缓存、登录信息、后台刷新任务），
//! 并以"命令"的形式对外提供功能。命令行只负责交互和展示。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建客户端、读取登录历史、检查登录、启动后台刷新
//! 2. **登录管理**：检查 / 切换 / 删除登录信息，切换时清空缓存
//! 3. **课程**：待完成的课程、打开课程、为学生创建云盘文件夹
//! 4. **教师**：教师列表、单个教师的相似度、所有教师的排名

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Url;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::clients::{DriveApi, GoogleDriveClient, PortalApi, PortalClient};
use crate::config::Config;
use crate::error::{report_error, AppError, AppResult, FileError};
use crate::models::{lessons_with_image, Credentials, CredentialsHistoryEntry, Lesson, Student, Teacher, Whoami};
use crate::orchestrator::refresh_loop::spawn_refresh_loop;
use crate::parsers::parse_students;
use crate::services::{
    add_classes_to_teacher, add_stats_to_teachers, fetch_whoami, teacher_stats, CredentialsHistory,
    CredentialsManager, LessonCache, LessonSettings, SchoolDirectory, StatsSettings, TeacherCache,
};
use crate::utils::get_name;
use crate::utils::logging::log_startup;

/// 创建云盘文件夹的结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FolderReport {
    pub created: usize,
    pub failed: usize,
    /// 已存在的文件夹
    pub skipped: usize,
}

/// 已打开的课程
#[derive(Debug, Clone)]
pub struct OpenedLesson {
    pub lesson: Lesson,
    pub url: Url,
    pub image_path: PathBuf,
}

/// 应用主结构
pub struct App {
    config: Config,
    portal: Arc<PortalClient>,
    drive: Arc<GoogleDriveClient>,
    lessons: Arc<LessonCache<PortalClient, GoogleDriveClient>>,
    teachers: TeacherCache,
    stats_settings: StatsSettings,
    credentials: Mutex<CredentialsManager>,
    history: Mutex<CredentialsHistory>,
    schools: SchoolDirectory,
    refresh: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// 初始化应用
    ///
    /// 登录失败不会阻止启动，错误会展示给用户
    pub async fn initialize(config: Config) -> AppResult<Arc<Self>> {
        log_startup(&config.base_url, config.refresh_interval_secs);

        let portal = Arc::new(PortalClient::new(&config)?);
        let drive = Arc::new(GoogleDriveClient::new(&config));
        let lessons = Arc::new(LessonCache::new(
            portal.clone(),
            drive.clone(),
            LessonSettings::from_config(&config),
        ));
        let history = CredentialsHistory::load(&config.credentials_history_file).await;

        let app = Arc::new(Self {
            stats_settings: StatsSettings::from_config(&config),
            credentials: Mutex::new(CredentialsManager::from_config(&config)),
            history: Mutex::new(history),
            teachers: TeacherCache::new(),
            schools: SchoolDirectory::new(),
            refresh: std::sync::Mutex::new(None),
            portal,
            drive,
            lessons,
            config,
        });

        let has_credentials = app.credentials.lock().await.has_credentials();
        if has_credentials {
            if let Err(e) = app.check_login().await {
                report_error(&e, app.config.dev_mode);
            }
        } else {
            warn!("⚠️ 尚未设置登录信息，请使用 login 命令登录");
        }

        app.start_refresh();
        Ok(app)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dev_mode(&self) -> bool {
        self.config.dev_mode
    }

    /// 启动后台刷新（已启动时先停止旧的）
    pub fn start_refresh(&self) {
        let handle = spawn_refresh_loop(
            self.lessons.clone(),
            Duration::from_secs(self.config.refresh_interval_secs.max(1)),
            self.config.log_refresh,
        );
        let mut refresh = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = refresh.replace(handle) {
            old.abort();
        }
    }

    /// 停止后台刷新
    pub fn shutdown(&self) {
        if let Some(handle) = self.refresh.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }

    // ========== 登录 ==========

    async fn ensure_login(&self) -> AppResult<()> {
        let credentials = self.credentials.lock().await.credentials()?;
        self.portal.ensure_logged_in(&credentials).await
    }

    /// 检查登录信息：登录并获取当前用户，记入登录历史
    pub async fn check_login(&self) -> AppResult<Whoami> {
        let credentials = self.credentials.lock().await.credentials()?;
        self.portal.ensure_logged_in(&credentials).await?;

        let whoami = fetch_whoami(&self.portal, &self.schools, &credentials.username).await?;
        self.credentials.lock().await.set_whoami(whoami.clone());
        if let Err(e) = self.history.lock().await.add(whoami.clone()).await {
            warn!("⚠️ 无法保存登录历史: {}", e);
        }

        info!(
            "✓ 当前用户: {} ({}, {})",
            whoami.user_name,
            whoami.role_name,
            whoami.school.display_name()
        );
        Ok(whoami)
    }

    /// 切换登录用户
    pub async fn change_login(&self, credentials: Credentials) -> AppResult<Whoami> {
        self.logout().await;
        self.credentials.lock().await.set(credentials);
        self.invalidate_caches().await;
        self.check_login().await
    }

    /// 删除登录信息
    pub async fn delete_login(&self) {
        self.logout().await;
        self.credentials.lock().await.forget();
        self.invalidate_caches().await;
        info!("✓ 登录信息已删除");
    }

    /// 当前用户（最近一次检查的结果）
    pub async fn whoami(&self) -> Option<Whoami> {
        self.credentials.lock().await.whoami().cloned()
    }

    /// 登录历史，最近登录的在前
    pub async fn credentials_history(&self) -> Vec<CredentialsHistoryEntry> {
        self.history.lock().await.newest_first().into_iter().cloned().collect()
    }

    async fn logout(&self) {
        if self.portal.is_logged_in() {
            if let Err(e) = self.portal.logout().await {
                warn!("⚠️ 退出登录失败: {}", e);
            }
        }
    }

    async fn invalidate_caches(&self) {
        self.lessons.invalidate();
        self.teachers.invalidate().await;
    }

    // ========== 课程 ==========

    /// 学生列表
    pub async fn students(&self) -> AppResult<Vec<Student>> {
        self.ensure_login().await?;
        let html = self.portal.students_page().await?;
        Ok(parse_students(&html)?)
    }

    /// 待完成的课程
    pub async fn lessons(&self) -> AppResult<Arc<Vec<Lesson>>> {
        self.ensure_login().await?;
        self.lessons.get_pending_lessons(false).await
    }

    /// 可以打开的课程
    pub async fn lessons_with_image(&self) -> AppResult<Vec<Lesson>> {
        Ok(lessons_with_image(&self.lessons().await?))
    }

    /// 后台刷新是否发现了新的照片（读取后清除）
    pub fn is_lesson_changed(&self) -> bool {
        self.lessons.is_lesson_changed()
    }

    /// 打开课程：在浏览器中打开填写链接，下载并打开照片
    pub async fn open_lesson(&self, index: usize) -> AppResult<OpenedLesson> {
        let lessons = self.lessons().await?;
        let (lesson, image) = lessons
            .iter()
            .find(|l| l.index == index)
            .and_then(|l| l.image.clone().map(|image| (l.clone(), image)))
            .ok_or_else(|| AppError::input(format!("第 {} 节课没有可打开的照片", index + 1)))?;

        let bytes = self.drive.download(&image.id).await?;
        let dir = PathBuf::from(&self.config.images_dir);
        let write_failed = |source| {
            AppError::from(FileError::WriteFailed {
                path: dir.display().to_string(),
                source,
            })
        };
        tokio::fs::create_dir_all(&dir).await.map_err(write_failed)?;
        let image_path = dir.join(image.name.replace(['/', '\\'], "_"));
        tokio::fs::write(&image_path, bytes).await.map_err(write_failed)?;

        let url = self.portal.absolute_url(&lesson.link)?;
        open::that_detached(url.as_str()).map_err(|e| AppError::User(format!("无法打开浏览器: {}", e)))?;
        open::that_detached(&image_path).map_err(|e| AppError::User(format!("无法打开照片: {}", e)))?;

        info!(
            "✓ 已打开课程: {} ({})",
            get_name(&lesson.student),
            lesson.date.format("%-d. %-m. %Y")
        );
        Ok(OpenedLesson { lesson, url, image_path })
    }

    /// 为每位学生在云盘中创建文件夹（已存在的跳过）
    pub async fn create_folders(&self) -> AppResult<FolderReport> {
        let students = self.students().await?;
        if students.is_empty() {
            return Err(AppError::User("没有找到学生".to_string()));
        }

        let root = self.config.drive_folder_id.as_deref();
        let mut existing: HashSet<String> = self.drive.list_files(root).await?.into_iter().map(|f| f.name).collect();
        let names: Vec<String> = students.iter().map(get_name).filter(|name| existing.insert(name.clone())).collect();

        let mut report = FolderReport {
            skipped: students.len() - names.len(),
            ..Default::default()
        };
        let results = join_all(names.iter().map(|name| async move { (name, self.drive.create_folder(name, root).await) })).await;
        for (name, result) in results {
            match result {
                Ok(folder) => {
                    info!("✓ 已创建文件夹: {}", folder.name);
                    report.created += 1;
                }
                Err(e) => {
                    warn!("❌ 创建文件夹失败 ({}): {}", name, e);
                    report.failed += 1;
                }
            }
        }

        info!("✓ 创建了 {} 个文件夹，跳过 {} 个", report.created, report.skipped);
        if report.failed > 0 {
            return Err(AppError::User(format!("{} 个文件夹创建失败", report.failed)));
        }
        Ok(report)
    }

    // ========== 教师 ==========

    /// 教师列表
    pub async fn teachers(&self) -> AppResult<Arc<Vec<Teacher>>> {
        self.ensure_login().await?;
        self.teachers.get_teachers(self.portal.as_ref()).await
    }

    /// 单个教师的统计（不含百分位）
    pub async fn teacher_similarity(&self, index: usize) -> AppResult<Teacher> {
        let teachers = self.teachers().await?;
        let teacher = teachers
            .iter()
            .find(|t| t.index == index)
            .ok_or_else(|| AppError::input(format!("没有第 {} 位教师", index + 1)))?;

        let mut filled = add_classes_to_teacher(self.portal.as_ref(), teacher, self.stats_settings.max_classes).await?;
        filled.stats = Some(teacher_stats(&filled));
        Ok(filled)
    }

    /// 所有教师的统计和排名
    pub async fn teachers_with_similarity(&self) -> AppResult<Vec<Teacher>> {
        let teachers = self.teachers().await?;
        add_stats_to_teachers(self.portal.as_ref(), &teachers, &self.stats_settings).await
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
