//! 课程缓存 - 业务能力层
//!
//! 维护"待完成课程"的快照：
//!
//! 1. 抓取首页 → 解析课程
//! 2. 为涉及的学生列出云盘中的照片
//! 3. 为每节课匹配拍摄日期相同的照片（可打开的课程）
//! 4. 与上一份快照比较，标记新出现的可打开课程
//!
//! 同一时间最多只有一次抓取；抓取进行中的其他调用方共享同一个 future。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, NaiveDate};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info};

use crate::clients::{DriveApi, PortalApi};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{DriveFile, Lesson};
use crate::parsers::parse_pending_lessons;
use crate::utils::get_name;

type LessonsFuture = Shared<BoxFuture<'static, Result<Arc<Vec<Lesson>>, Arc<AppError>>>>;

/// 课程抓取设置
#[derive(Debug, Clone, Default)]
pub struct LessonSettings {
    /// 云盘中学生文件夹所在的目录
    pub drive_folder_id: Option<String>,
    /// 照片创建时间加上的小时数
    pub image_offset_hours: i64,
    /// 替代页面中的课程日期
    pub date_override: Option<NaiveDate>,
}

impl LessonSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            drive_folder_id: config.drive_folder_id.clone(),
            image_offset_hours: config.image_offset_hours,
            // 开发模式下把课程日期改为今天，以便与刚上传的照片匹配
            date_override: config.dev_mode.then(|| chrono::Local::now().date_naive()),
        }
    }
}

#[derive(Default)]
struct LessonState {
    current: Option<Arc<Vec<Lesson>>>,
    changed: Option<Lesson>,
    pending: Option<LessonsFuture>,
    /// 每次失效加一，失效前发起的抓取结果不再写入缓存
    generation: u64,
}

impl LessonState {
    fn commit(&mut self, lessons: Arc<Vec<Lesson>>) {
        if self.changed.is_none() {
            if let Some(previous) = &self.current {
                self.changed = changed_lesson(&lessons, previous);
                if let Some(lesson) = &self.changed {
                    info!(
                        "📷 新的笔记本照片: {} ({})",
                        get_name(&lesson.student),
                        lesson.date.format("%-d. %-m. %Y")
                    );
                }
            }
        }
        self.current = Some(lessons);
    }
}

/// 课程缓存
pub struct LessonCache<P, D> {
    portal: Arc<P>,
    drive: Arc<D>,
    settings: Arc<LessonSettings>,
    state: Arc<Mutex<LessonState>>,
}

impl<P: PortalApi, D: DriveApi> LessonCache<P, D> {
    /// 创建新的课程缓存
    pub fn new(portal: Arc<P>, drive: Arc<D>, settings: LessonSettings) -> Self {
        Self {
            portal,
            drive,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(LessonState::default())),
        }
    }

    pub fn portal(&self) -> &Arc<P> {
        &self.portal
    }

    /// 获取待完成的课程
    ///
    /// 已有快照且不强制刷新时直接返回缓存的快照（同一个 `Arc`）。
    /// 抓取进行中时等待同一次抓取的结果。
    pub async fn get_pending_lessons(&self, force_refresh: bool) -> AppResult<Arc<Vec<Lesson>>> {
        let fetch = {
            let mut state = self.lock();
            if !force_refresh {
                if let Some(current) = &state.current {
                    return Ok(current.clone());
                }
            }
            match &state.pending {
                Some(pending) => pending.clone(),
                None => {
                    let fetch = self.start_fetch(state.generation);
                    state.pending = Some(fetch.clone());
                    fetch
                }
            }
        };
        Ok(fetch.await?)
    }

    /// 最近一次刷新是否发现了新的可打开课程
    ///
    /// 读取后清除标记，同一次变化只返回一次 `true`
    pub fn is_lesson_changed(&self) -> bool {
        self.lock().changed.take().is_some()
    }

    /// 清空缓存（切换登录用户时调用）
    pub fn invalidate(&self) {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = LessonState {
            generation,
            ..Default::default()
        };
        debug!("课程缓存已清空");
    }

    fn lock(&self) -> MutexGuard<'_, LessonState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start_fetch(&self, generation: u64) -> LessonsFuture {
        let portal = self.portal.clone();
        let drive = self.drive.clone();
        let settings = self.settings.clone();
        let state = self.state.clone();

        async move {
            let result = fetch_lessons(portal.as_ref(), drive.as_ref(), &settings).await;

            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            let is_current = state.generation == generation;
            if is_current {
                state.pending = None;
            }
            match result {
                Ok(lessons) => {
                    let lessons = Arc::new(lessons);
                    if is_current {
                        state.commit(lessons.clone());
                    }
                    Ok(lessons)
                }
                Err(e) => Err(Arc::new(e)),
            }
        }
        .boxed()
        .shared()
    }
}

/// 抓取并组装课程
async fn fetch_lessons<P: PortalApi, D: DriveApi>(
    portal: &P,
    drive: &D,
    settings: &LessonSettings,
) -> AppResult<Vec<Lesson>> {
    let html = portal.index_page().await?;
    let mut lessons = parse_pending_lessons(&html, settings.date_override)?;
    debug!("首页中有 {} 节待完成的课程", lessons.len());

    if !lessons.is_empty() {
        add_images_to_students(drive, settings.drive_folder_id.as_deref(), &mut lessons).await?;
        add_images_to_lessons(&mut lessons, settings.image_offset_hours);
    }
    Ok(lessons)
}

/// 为课程中的学生找到云盘文件夹并列出其中的照片
///
/// 每位学生只列出一次文件夹
async fn add_images_to_students<D: DriveApi>(
    drive: &D,
    root_folder_id: Option<&str>,
    lessons: &mut [Lesson],
) -> AppResult<()> {
    let folders = drive.list_files(root_folder_id).await?;

    let mut images_by_name: HashMap<String, (String, Vec<DriveFile>)> = HashMap::new();
    for lesson in lessons.iter() {
        let whole_name = get_name(&lesson.student);
        if images_by_name.contains_key(&whole_name) {
            continue;
        }
        if let Some(folder) = folders.iter().find(|f| f.name == whole_name) {
            let images = drive.list_files(Some(&folder.id)).await?;
            images_by_name.insert(whole_name, (folder.id.clone(), images));
        }
    }

    for lesson in lessons.iter_mut() {
        if let Some((folder_id, images)) = images_by_name.get(&get_name(&lesson.student)) {
            lesson.student.folder_id = Some(folder_id.clone());
            lesson.student.images = Some(images.clone());
        }
    }
    Ok(())
}

/// 为每节课匹配照片：创建时间加上偏移后的日期等于课程日期
pub fn add_images_to_lessons(lessons: &mut [Lesson], offset_hours: i64) {
    for lesson in lessons.iter_mut() {
        let image = lesson.student.images.as_ref().and_then(|images| {
            images.iter().find(|image| {
                image
                    .created_time
                    .map(|created| (created + Duration::hours(offset_hours)).date_naive() == lesson.date)
                    .unwrap_or(false)
            })
        });
        if let Some(image) = image {
            lesson.image = Some(image.clone());
        }
    }
}

/// 找到第一节新出现或新匹配到照片的可打开课程
pub fn changed_lesson(lessons: &[Lesson], previous: &[Lesson]) -> Option<Lesson> {
    lessons
        .iter()
        .filter(|lesson| lesson.is_openable())
        .find(|lesson| {
            let before = previous
                .iter()
                .find(|p| p.date == lesson.date && get_name(&p.student) == get_name(&lesson.student));
            !before.map(Lesson::is_openable).unwrap_or(false)
        })
        .cloned()
}
