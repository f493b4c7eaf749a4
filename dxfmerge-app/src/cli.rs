use std::path::PathBuf;

use clap::Parser;
use dxfmerge_config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "dxfmerge", version, about = "将多张 DXF 图纸排样合并到一张图纸中")]
pub struct Cli {
    /// 输入图纸，最后一个参数为输出文件；省略时使用配置中的默认文件
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// 配置文件路径，默认读取 DXFMERGE_CONFIG 或 ./config/default.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 容器宽度
    #[arg(long, allow_negative_numbers = true)]
    pub width: Option<f64>,

    /// 容器高度
    #[arg(long, allow_negative_numbers = true)]
    pub height: Option<f64>,

    /// 图形之间的间距
    #[arg(long, allow_negative_numbers = true)]
    pub gap: Option<f64>,

    /// 不绘制容器边框
    #[arg(long)]
    pub no_border: bool,

    /// 以 JSON 输出排样报告
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// 将命令行覆盖项写入配置。
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(width) = self.width {
            config.nesting.container_width = width;
        }
        if let Some(height) = self.height {
            config.nesting.container_height = height;
        }
        if let Some(gap) = self.gap {
            config.nesting.gap = gap;
        }
        if self.no_border {
            config.nesting.border = false;
        }
    }

    /// 拆分输入与输出。单个位置参数无法同时表示输入和输出，返回 `None`。
    pub fn resolve_files(&self, config: &AppConfig) -> Option<(Vec<PathBuf>, PathBuf)> {
        match self.files.split_last() {
            None => Some((
                config.output.default_inputs.clone(),
                config.output.default_path.clone(),
            )),
            Some((_, [])) => None,
            Some((output, inputs)) => Some((inputs.to_vec(), output.clone())),
        }
    }
}
