use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use mln_study_hub::orchestrator::{App, Command};
use mln_study_hub::utils::logging;
use mln_study_hub::Config;

/// Trợ lý học tập MLN111: Giai cấp và Dân tộc
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Tệp cấu hình TOML
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hiển thị log chi tiết
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref()).context("加载配置失败")?;

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run(cli.command).await
}
