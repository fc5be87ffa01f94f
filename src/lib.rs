use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod items;
pub mod logging;

pub use crate::core::{
    Status, StatusKind, SyncCommand, SynchronizedDirectoriesManager, SynchronizedItem,
    SynchronizedItems,
};
pub use config::{DirectoryPairSettings, JsonSettings, MemorySettings, PairKey, SettingsSource};
pub use error::{CommandError, ItemError};
pub use events::{EventSender, ItemEvent, ManagerEvent};
pub use items::{Directory, File, Item, ItemFactory, ItemSlot, LocalItemFactory};

const APP_DIR: &str = "dirsync";

/// 默认配置目录下的应用目录
fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".dirsync"))
}

/// 数据目录：默认配置中 `data_path` 指向的已存在目录，否则为默认目录
pub fn data_dir() -> PathBuf {
    let default_dir = default_data_dir();
    config::read_config(&default_dir)
        .get("data_path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
        .inspect(|p| tracing::debug!("使用自定义数据路径: {:?}", p))
        .unwrap_or(default_dir)
}

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub config_dir: PathBuf,
    pub manager: Arc<Mutex<SynchronizedDirectoriesManager>>,
    pub item_events: Arc<Mutex<mpsc::UnboundedReceiver<ItemEvent>>>,
    pub pair_events: Arc<Mutex<mpsc::UnboundedReceiver<ManagerEvent>>>,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        std::fs::create_dir_all(default_data_dir())?;
        let config_dir = data_dir();
        std::fs::create_dir_all(&config_dir)?;

        Ok(Self::with_settings(
            config_dir.clone(),
            Arc::new(JsonSettings::new(config_dir)),
        ))
    }

    /// 使用指定的配置来源构建
    pub fn with_settings(config_dir: PathBuf, settings: Arc<dyn SettingsSource>) -> Self {
        let (item_tx, item_rx) = EventSender::channel();
        let (pair_tx, pair_rx) = EventSender::channel();
        let manager = SynchronizedDirectoriesManager::new(settings, Arc::new(LocalItemFactory))
            .with_events(item_tx, pair_tx);

        Self {
            config_dir,
            manager: Arc::new(Mutex::new(manager)),
            item_events: Arc::new(Mutex::new(item_rx)),
            pair_events: Arc::new(Mutex::new(pair_rx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_under_config_dir() {
        let dir = default_data_dir();
        match dirs::config_dir() {
            Some(base) => assert_eq!(dir, base.join(APP_DIR)),
            None => assert_eq!(dir, PathBuf::from(".dirsync")),
        }
        assert!(dir.ends_with(APP_DIR) || dir.ends_with(".dirsync"));
    }
}
