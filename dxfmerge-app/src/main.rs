use std::path::Path;

use clap::Parser;
use dxfmerge_config::{AppConfig, ConfigError};
use dxfmerge_frontend::{NestRequest, run};
use dxfmerge_io::DxfFacade;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let (mut config, discover_error) = match load_configuration(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            init_logging("info");
            error!(stage = "config", error = %err, "加载指定配置失败");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging.level);
    if let Some(err) = discover_error {
        warn!(error = %err, "加载默认配置失败，使用内建默认值");
    }

    cli.apply_overrides(&mut config);
    if let Err(err) = config.validate() {
        error!(stage = "config", error = %err, "配置无效");
        std::process::exit(1);
    }

    let Some((inputs, output)) = cli.resolve_files(&config) else {
        error!(stage = "input", "需要至少一个输入文件和一个输出文件");
        std::process::exit(1);
    };

    info!(inputs = inputs.len(), output = %output.display(), "启动 DXF 排样合并");
    let request = NestRequest::new(inputs, output, &config.nesting);
    let report = match run(&request, &DxfFacade::new()) {
        Ok(report) => report,
        Err(err) => {
            error!(stage = err.stage(), error = %err, "排样合并失败");
            std::process::exit(1);
        }
    };

    if cli.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => {
                error!(stage = "report", error = %err, "序列化报告失败");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", report.render_text());
    }
}

/// 显式路径失败视为致命；自动发现失败时回退到默认配置，错误留待日志初始化后输出。
fn load_configuration(
    override_path: Option<&Path>,
) -> Result<(AppConfig, Option<ConfigError>), ConfigError> {
    match override_path {
        Some(path) => AppConfig::from_file(path).map(|config| (config, None)),
        None => match AppConfig::discover() {
            Ok(config) => Ok((config, None)),
            Err(err) => Ok((AppConfig::default(), Some(err))),
        },
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    // 标准输出留给报告
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
