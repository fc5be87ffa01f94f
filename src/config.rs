//! 应用配置模块
//!
//! 所有配置都保存在数据目录下的 `config.json` 中，各模块只读写自己的键。

use crate::items::ExtensionFilter;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const CONFIG_FILE: &str = "config.json";

/// 读取整个配置对象；文件不存在或无法解析时返回空对象
pub fn read_config(config_dir: &Path) -> serde_json::Value {
    fs::read_to_string(config_dir.join(CONFIG_FILE))
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .filter(serde_json::Value::is_object)
        .unwrap_or_else(|| serde_json::json!({}))
}

/// 读取一个配置键，缺失或格式不对时使用默认值
pub fn load_section<T>(config_dir: &Path, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    read_config(config_dir)
        .get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default()
}

/// 写入一个配置键，保留其他键
pub fn save_section<T: Serialize>(config_dir: &Path, key: &str, value: &T) -> anyhow::Result<()> {
    let mut config = read_config(config_dir);
    config[key] = serde_json::to_value(value)?;

    fs::create_dir_all(config_dir)?;
    let config_file = config_dir.join(CONFIG_FILE);
    fs::write(&config_file, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("写入配置失败: {:?}", config_file))
}

/// 目录对的标识：左右两个根路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub left: PathBuf,
    pub right: PathBuf,
}

impl PairKey {
    pub fn new(left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.left.display(), self.right.display())
    }
}

/// 一行目录对配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPairSettings {
    pub left_directory: PathBuf,
    pub right_directory: PathBuf,
    /// 未激活的行不会被跟踪
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    /// 不参与同步的文件扩展名，如 `["tmp", ".bak"]`
    #[serde(default)]
    pub excluded_extensions: Vec<String>,
}

fn default_is_active() -> bool {
    true
}

impl DirectoryPairSettings {
    pub fn new(left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> Self {
        Self {
            left_directory: left.into(),
            right_directory: right.into(),
            is_active: true,
            excluded_extensions: Vec::new(),
        }
    }

    pub fn with_excluded_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.left_directory, &self.right_directory)
    }

    pub fn extension_filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.excluded_extensions)
    }
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub directories: Vec<DirectoryPairSettings>,
    /// 定期重新扫描的间隔（秒），0 表示不自动扫描
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    300 // 默认 5 分钟
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl AppSettings {
    /// 从配置文件加载应用设置
    pub fn load(config_dir: &Path) -> Self {
        serde_json::from_value(read_config(config_dir)).unwrap_or_default()
    }

    /// 保存应用设置
    pub fn save(&self, config_dir: &Path) -> anyhow::Result<()> {
        save_section(config_dir, "directories", &self.directories)?;
        save_section(config_dir, "refreshIntervalSecs", &self.refresh_interval_secs)
    }
}

/// 目录对配置来源
pub trait SettingsSource: Send + Sync {
    /// 当前所有配置行（包括未激活的）
    fn directory_pairs(&self) -> Vec<DirectoryPairSettings>;
}

/// 从 `config.json` 读取；每次调用都重新读取文件
#[derive(Debug, Clone)]
pub struct JsonSettings {
    config_dir: PathBuf,
}

impl JsonSettings {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl SettingsSource for JsonSettings {
    fn directory_pairs(&self) -> Vec<DirectoryPairSettings> {
        load_section(&self.config_dir, "directories")
    }
}

/// 内存中的配置来源
#[derive(Debug, Default)]
pub struct MemorySettings {
    rows: RwLock<Vec<DirectoryPairSettings>>,
}

impl MemorySettings {
    pub fn new(rows: Vec<DirectoryPairSettings>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub fn set(&self, rows: Vec<DirectoryPairSettings>) {
        let mut guard = self.rows.write().unwrap_or_else(|e| e.into_inner());
        *guard = rows;
    }

    pub fn push(&self, row: DirectoryPairSettings) {
        self.rows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(row);
    }
}

impl SettingsSource for MemorySettings {
    fn directory_pairs(&self) -> Vec<DirectoryPairSettings> {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
