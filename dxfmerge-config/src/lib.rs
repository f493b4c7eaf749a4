use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "DXFMERGE_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub nesting: NestingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置并校验。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `DXFMERGE_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        let cwd = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        match locate(env::var_os(CONFIG_ENV).map(PathBuf::from), &cwd) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 容器尺寸必须为有限正数，间距不能为负。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nesting = &self.nesting;
        for (field, value) in [
            ("nesting.container_width", nesting.container_width),
            ("nesting.container_height", nesting.container_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("必须为正数，实际为 {value}"),
                });
            }
        }
        if !nesting.gap.is_finite() || nesting.gap < 0.0 {
            return Err(ConfigError::Invalid {
                field: "nesting.gap",
                reason: format!("不能为负数，实际为 {}", nesting.gap),
            });
        }
        Ok(())
    }
}

/// 显式路径优先；否则仅在默认位置存在文件时返回。
fn locate(explicit: Option<PathBuf>, cwd: &Path) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let default_path = cwd.join("config").join("default.toml");
    default_path.exists().then_some(default_path)
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 排样容器与边框设置。
#[derive(Debug, Clone, Deserialize)]
pub struct NestingConfig {
    #[serde(default = "NestingConfig::default_extent")]
    pub container_width: f64,
    #[serde(default = "NestingConfig::default_extent")]
    pub container_height: f64,
    #[serde(default = "NestingConfig::default_gap")]
    pub gap: f64,
    #[serde(default = "NestingConfig::default_border")]
    pub border: bool,
}

impl NestingConfig {
    fn default_extent() -> f64 {
        100.0
    }

    fn default_gap() -> f64 {
        8.0
    }

    fn default_border() -> bool {
        true
    }
}

impl Default for NestingConfig {
    fn default() -> Self {
        Self {
            container_width: Self::default_extent(),
            container_height: Self::default_extent(),
            gap: Self::default_gap(),
            border: Self::default_border(),
        }
    }
}

/// 未在命令行给出文件时使用的默认输入与输出。
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_path")]
    pub default_path: PathBuf,
    #[serde(default = "OutputConfig::default_inputs")]
    pub default_inputs: Vec<PathBuf>,
}

impl OutputConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("merged_result.dxf")
    }

    fn default_inputs() -> Vec<PathBuf> {
        ["file1.dxf", "file2.dxf", "file3.dxf"]
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_path: Self::default_path(),
            default_inputs: Self::default_inputs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置项 {field} 无效: {reason}")]
    Invalid { field: &'static str, reason: String },
}
