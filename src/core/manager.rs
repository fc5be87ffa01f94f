//! 目录对管理器
//!
//! 按配置维护当前跟踪的目录对，并把加载分发给各目录对并发执行。

use super::sync_command::SyncContext;
use super::synchronized_items::SynchronizedItems;
use crate::config::{DirectoryPairSettings, PairKey, SettingsSource};
use crate::events::{EventSender, ItemEvent, ManagerEvent};
use crate::items::ItemFactory;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SynchronizedDirectoriesManager {
    settings: Arc<dyn SettingsSource>,
    context: SyncContext,
    pairs: Vec<SynchronizedItems>,
}

impl SynchronizedDirectoriesManager {
    pub fn new(settings: Arc<dyn SettingsSource>, factory: Arc<dyn ItemFactory>) -> Self {
        Self {
            settings,
            context: SyncContext::new(factory),
            pairs: Vec::new(),
        }
    }

    /// 订阅条目通知和目录对通知
    pub fn with_events(
        mut self,
        item_events: EventSender<ItemEvent>,
        pair_events: EventSender<ManagerEvent>,
    ) -> Self {
        self.context = self.context.with_events(item_events, pair_events);
        self
    }

    pub fn pairs(&self) -> &[SynchronizedItems] {
        &self.pairs
    }

    pub fn pair(&self, key: &PairKey) -> Option<&SynchronizedItems> {
        self.pairs.iter().find(|p| &p.key() == key)
    }

    pub fn pair_mut(&mut self, key: &PairKey) -> Option<&mut SynchronizedItems> {
        self.pairs.iter_mut().find(|p| &p.key() == key)
    }

    /// 按当前配置增删目录对，然后并发加载尚未加载或需要重新加载的目录对
    ///
    /// 返回本次加载过的目录对。
    pub async fn load(&mut self) -> HashSet<PairKey> {
        let rows = self.active_rows();
        let wanted: HashSet<PairKey> = rows.iter().map(DirectoryPairSettings::key).collect();

        let events = &self.context.pair_events;
        self.pairs.retain(|pair| {
            let key = pair.key();
            let keep = wanted.contains(&key);
            if !keep {
                info!("移除目录对: {}", key);
                events.send(ManagerEvent::PairRemoved(key));
            }
            keep
        });

        let mut pending = HashSet::new();
        for row in &rows {
            let key = row.key();
            let filter = row.extension_filter();

            match self.pairs.iter().position(|p| p.key() == key) {
                Some(index) => {
                    let pair = &mut self.pairs[index];
                    if **pair.excluded_extensions() != filter {
                        debug!("排除规则已变化: {}", key);
                        pair.set_excluded_extensions(filter);
                        pending.insert(key);
                    } else if !pair.is_loaded() {
                        pending.insert(key);
                    }
                }
                None => {
                    info!("添加目录对: {}", key);
                    let pair = SynchronizedItems::new(row, self.context.clone()).await;
                    self.pairs.push(pair);
                    self.context
                        .pair_events
                        .send(ManagerEvent::PairAdded(key.clone()));
                    pending.insert(key);
                }
            }
        }

        if pending.is_empty() {
            return pending;
        }
        info!("加载 {} 个目录对", pending.len());
        join_all(
            self.pairs
                .iter_mut()
                .filter(|p| pending.contains(&p.key()))
                .map(|p| p.load()),
        )
        .await;
        pending
    }

    /// 并发重新加载所有目录对
    pub async fn refresh(&mut self) {
        self.refresh_except(&HashSet::new()).await;
    }

    /// 并发重新加载 `skip` 以外的目录对
    pub async fn refresh_except(&mut self, skip: &HashSet<PairKey>) {
        let stale: Vec<&mut SynchronizedItems> = self
            .pairs
            .iter_mut()
            .filter(|p| !skip.contains(&p.key()))
            .collect();
        if stale.is_empty() {
            return;
        }
        info!("重新扫描 {} 个目录对", stale.len());
        join_all(stale.into_iter().map(|p| p.load())).await;
    }

    /// 把复制 / 删除通知应用到对应的目录对
    pub fn apply_item_event(&mut self, event: &ItemEvent) -> bool {
        self.pairs
            .iter_mut()
            .any(|pair| pair.apply_item_event(event))
    }

    /// 已激活的配置行；同一对路径重复出现时只保留第一行
    fn active_rows(&self) -> Vec<DirectoryPairSettings> {
        let mut seen = HashSet::new();
        self.settings
            .directory_pairs()
            .into_iter()
            .filter(|row| row.is_active)
            .filter(|row| {
                let fresh = seen.insert(row.key());
                if !fresh {
                    warn!("重复的目录对配置，已忽略: {}", row.key());
                }
                fresh
            })
            .collect()
    }
}
