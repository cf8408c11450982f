//! 教师统计 - 业务能力层
//!
//! 根据课堂记录评估教师：
//! - 相似度：同一班级内记录两两之间的平均文本相似度（越高排名越靠前）
//! - 长度：记录的平均字符数（越短排名越靠前）
//!
//! 两项指标分别在所有教师中计算百分位，再取平均作为排名依据。

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clients::PortalApi;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Record, Stats, Teacher};
use crate::parsers::{parse_classes, parse_records, parse_teachers};
use crate::utils::logging::{log_batch_complete, log_batch_start, log_teachers_loaded};
use crate::utils::{average, cmp_optional, get_name, percentile_ranks};

/// 统计设置
#[derive(Debug, Clone)]
pub struct StatsSettings {
    /// 每批处理的教师数量
    pub chunk: usize,
    /// 批次间隔
    pub delay: Duration,
    pub max_teachers: Option<usize>,
    pub max_classes: Option<usize>,
}

impl StatsSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk: config.stats_chunk,
            delay: Duration::from_secs(config.stats_delay_secs),
            max_teachers: config.stats_max_teachers,
            max_classes: config.stats_max_classes,
        }
    }
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 教师列表缓存
///
/// 抓取期间持有锁，并发调用方等待同一次抓取
#[derive(Default)]
pub struct TeacherCache {
    teachers: Mutex<Option<Arc<Vec<Teacher>>>>,
}

impl TeacherCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取教师列表（首次调用时抓取）
    pub async fn get_teachers<P: PortalApi>(&self, portal: &P) -> AppResult<Arc<Vec<Teacher>>> {
        let mut teachers = self.teachers.lock().await;
        if let Some(cached) = teachers.as_ref() {
            return Ok(cached.clone());
        }

        let html = portal.staff_page().await?;
        let fetched = Arc::new(parse_teachers(&html)?);
        debug!("找到 {} 位教师", fetched.len());
        *teachers = Some(fetched.clone());
        Ok(fetched)
    }

    /// 清空缓存
    pub async fn invalidate(&self) {
        *self.teachers.lock().await = None;
    }
}

/// 获取教师的班级及每个班级的课堂记录
///
/// 班级记录并发获取，任意一个失败则整体失败
pub async fn add_classes_to_teacher<P: PortalApi>(
    portal: &P,
    teacher: &Teacher,
    max_classes: Option<usize>,
) -> AppResult<Teacher> {
    let html = portal.staff_documents_page(teacher.id).await?;
    let mut classes = parse_classes(&html, max_classes)?;

    let records = try_join_all(classes.iter().map(|class| async move {
        let html = portal.class_log_page(class.student.id, class.id).await?;
        Ok::<_, AppError>(parse_records(&html)?)
    }))
    .await?;

    for (class, records) in classes.iter_mut().zip(records) {
        class.records = Some(records);
    }

    let mut filled = teacher.clone();
    filled.classes = Some(classes);
    Ok(filled)
}

/// 两段文本的相似度（0..1，不区分大小写）
pub fn text_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// 记录两两之间的平均相似度，少于两条记录时无法计算
pub fn records_similarity(records: &[Record]) -> Option<f64> {
    if records.len() <= 1 {
        return None;
    }
    let mut similarities = Vec::with_capacity(records.len() * (records.len() - 1) / 2);
    for (i, a) in records.iter().enumerate() {
        for b in &records[i + 1..] {
            similarities.push(text_similarity(&a.text, &b.text));
        }
    }
    average(&similarities)
}

/// 记录的平均字符数
pub fn records_length(records: &[Record]) -> Option<f64> {
    let lengths: Vec<f64> = records.iter().map(|r| r.text.chars().count() as f64).collect();
    average(&lengths)
}

/// 计算教师的相似度和长度
///
/// 先按班级计算再取平均；任一班级无法计算时，该项为 `None`
pub fn teacher_stats(teacher: &Teacher) -> Stats {
    let per_class = |f: fn(&[Record]) -> Option<f64>| -> Option<f64> {
        let values: Option<Vec<f64>> = teacher.classes().iter().map(|c| f(c.records())).collect();
        values.and_then(|v| average(&v))
    };

    Stats {
        similarity: per_class(records_similarity),
        length: per_class(records_length),
        ..Default::default()
    }
}

/// 为所有教师计算百分位
///
/// 相似度越高百分位越高，长度越短百分位越高
pub fn add_percentiles(teachers: &mut [Teacher]) {
    let similarities: Vec<Option<f64>> = teachers
        .iter()
        .map(|t| t.stats.as_ref().and_then(|s| s.similarity))
        .collect();
    let lengths: Vec<Option<f64>> = teachers.iter().map(|t| t.stats.as_ref().and_then(|s| s.length)).collect();

    let similarity_percentiles = percentile_ranks(&similarities, false);
    let length_percentiles = percentile_ranks(&lengths, true);

    for (i, teacher) in teachers.iter_mut().enumerate() {
        let stats = teacher.stats.get_or_insert_with(Stats::default);
        stats.similarity_percentile = similarity_percentiles[i];
        stats.length_percentile = length_percentiles[i];
        stats.avg_percentile = match (stats.similarity_percentile, stats.length_percentile) {
            (Some(s), Some(l)) => Some((s + l) / 2.0),
            _ => None,
        };
    }
}

fn avg_percentile(teacher: &Teacher) -> Option<f64> {
    teacher.stats.as_ref().and_then(|s| s.avg_percentile)
}

/// 按平均百分位降序排列，没有百分位的教师排在最后
pub fn sort_by_avg_percentile(teachers: &mut [Teacher]) {
    teachers.sort_by(|a, b| cmp_optional(avg_percentile(a), avg_percentile(b)));
    teachers.reverse();
}

/// 为教师列表计算统计并排名
///
/// 分批并发获取，批次之间等待 `settings.delay`，避免给门户造成过大压力
pub async fn add_stats_to_teachers<P: PortalApi>(
    portal: &P,
    teachers: &[Teacher],
    settings: &StatsSettings,
) -> AppResult<Vec<Teacher>> {
    let teachers = match settings.max_teachers {
        Some(max) => &teachers[..max.min(teachers.len())],
        None => teachers,
    };
    let total = teachers.len();
    let chunk = settings.chunk.max(1);
    let total_batches = total.div_ceil(chunk);
    log_teachers_loaded(total, chunk);

    let mut result = Vec::with_capacity(total);
    for batch_start in (0..total).step_by(chunk) {
        let batch_end = (batch_start + chunk).min(total);
        let batch_num = batch_start / chunk + 1;
        log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);

        let filled = try_join_all(teachers[batch_start..batch_end].iter().map(|teacher| async move {
            let mut filled = add_classes_to_teacher(portal, teacher, settings.max_classes).await?;
            let stats = teacher_stats(&filled);
            if let Some(similarity) = stats.similarity {
                info!("  {} - 相似度 {:.1} %", get_name(&filled), similarity * 100.0);
            }
            filled.stats = Some(stats);
            Ok::<_, AppError>(filled)
        }))
        .await?;

        let with_stats = filled.iter().filter(|t| t.stats.as_ref().is_some_and(Stats::is_valid)).count();
        log_batch_complete(batch_num, with_stats, filled.len());
        result.extend(filled);

        if batch_end < total {
            tokio::time::sleep(settings.delay).await;
        }
    }

    add_percentiles(&mut result);
    sort_by_avg_percentile(&mut result);
    Ok(result)
}
