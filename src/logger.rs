use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则详细模式为 debug，普通模式为 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "izus_assistant=debug,info" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).without_time())
        .try_init();
}
