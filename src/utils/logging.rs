/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `base_url`: 门户地址
/// - `refresh_interval_secs`: 后台刷新间隔
pub fn log_startup(base_url: &str, refresh_interval_secs: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - iZUŠ 助手");
    info!("🌐 门户地址: {}", base_url);
    info!("🔄 课程刷新间隔: {} 秒", refresh_interval_secs);
    info!("{}", "=".repeat(60));
}

/// 记录教师加载信息
///
/// # 参数
/// - `total`: 教师总数
/// - `chunk`: 每批数量
pub fn log_teachers_loaded(total: usize, chunk: usize) {
    info!("✓ 找到 {} 位待统计的教师", total);
    info!("📋 将以每批 {} 位的方式处理", chunk);
    info!("💡 每批完成后等待片刻再开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始教师编号
/// - `end`: 结束教师编号
/// - `total`: 教师总数
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("👩‍🏫 本批教师: {}-{} / 共 {} 位", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `with_stats`: 有统计结果的数量
/// - `total`: 本批数量
pub fn log_batch_complete(batch_num: usize, with_stats: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 有效统计 {}/{}", batch_num, with_stats, total);
    info!("{}", "─".repeat(60));
}
