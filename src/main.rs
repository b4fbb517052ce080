use anyhow::Result;
use clap::Parser;
use grading_agent::utils::logging;
use grading_agent::{App, Cli, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 解析命令行参数
    let cli = Cli::parse();

    // 加载配置（默认值 ← 配置文件 ← 环境变量）
    let config = Config::load(cli.config.as_deref())?;

    // 初始化并运行应用
    App::initialize(config, cli.model)?.run(&cli.zip).await?;

    Ok(())
}
