//! 后台课程刷新 - 编排层
//!
//! 按固定间隔强制刷新课程缓存，使"新照片"的提示能及时出现。
//! 刷新失败不会终止循环，只在开启 `log_refresh` 时记录。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clients::{DriveApi, PortalApi};
use crate::error::{AppError, AppResult};
use crate::services::LessonCache;

/// 刷新一次课程，返回课程数量
pub async fn refresh_once<P: PortalApi, D: DriveApi>(cache: &LessonCache<P, D>) -> AppResult<usize> {
    if !cache.portal().is_logged_in() {
        return Err(AppError::NotLoggedIn);
    }
    let lessons = cache.get_pending_lessons(true).await?;
    Ok(lessons.len())
}

/// 启动后台刷新循环
///
/// 循环一直运行，直到返回的句柄被 `abort()`
pub fn spawn_refresh_loop<P: PortalApi, D: DriveApi>(
    cache: Arc<LessonCache<P, D>>,
    interval: Duration,
    log_refresh: bool,
) -> JoinHandle<()> {
    debug!("后台刷新已启动，间隔 {:?}", interval);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match refresh_once(&cache).await {
                Ok(count) if log_refresh => info!("🔄 课程已刷新: {} 节", count),
                Err(e) if log_refresh => warn!("⚠️ 课程刷新失败: {}", e),
                _ => {}
            }
        }
    })
}
