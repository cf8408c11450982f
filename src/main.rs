use anyhow::Result;
use izus_assistant::cli::Cli;
use izus_assistant::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logger::init(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    Cli::new(app).run().await?;

    Ok(())
}
