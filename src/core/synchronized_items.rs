//! 目录对树
//!
//! 每个节点按值拥有子节点，并以从根开始的索引路径（`position`）标识自己；
//! 父节点就是去掉最后一个索引的位置，不持有指向父节点的引用。

use super::aggregation::aggregate;
use super::status::StatusKind;
use super::sync_command::SyncContext;
use super::synchronized_item::SynchronizedItem;
use super::updater::SynchronizedItemsStatusAndCommandsUpdater;
use crate::config::{DirectoryPairSettings, PairKey};
use crate::events::{ItemEvent, ManagerEvent};
use crate::items::{Directory, ExtensionFilter, Item, ItemSlot};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 目录对的一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// 目录对树中的一个节点
#[derive(Debug)]
pub struct SynchronizedItems {
    left: SynchronizedItem,
    right: SynchronizedItem,
    child_items: Vec<SynchronizedItems>,
    position: Vec<usize>,
    is_loaded: bool,
    excluded_extensions: Arc<ExtensionFilter>,
    context: SyncContext,
}

impl SynchronizedItems {
    /// 根据一行配置创建根节点；不存在的根目录按缺失处理
    pub async fn new(settings: &DirectoryPairSettings, context: SyncContext) -> Self {
        let excluded = Arc::new(settings.extension_filter());
        let key = settings.key();

        let (left, right) = tokio::join!(
            context.factory.create_directory(&key.left, excluded.clone()),
            context.factory.create_directory(&key.right, excluded.clone()),
        );
        if left.is_none() {
            info!("左侧目录不存在: {:?}", key.left);
        }
        if right.is_none() {
            info!("右侧目录不存在: {:?}", key.right);
        }

        let left = ItemSlot::from_option(left.map(Item::Directory), key.left);
        let right = ItemSlot::from_option(right.map(Item::Directory), key.right);
        Self::node(left, right, true, Vec::new(), excluded, context)
    }

    fn node(
        left: ItemSlot,
        right: ItemSlot,
        is_directory: bool,
        position: Vec<usize>,
        excluded_extensions: Arc<ExtensionFilter>,
        context: SyncContext,
    ) -> Self {
        Self {
            left: SynchronizedItem::new(left, is_directory, context.item_events.clone()),
            right: SynchronizedItem::new(right, is_directory, context.item_events.clone()),
            child_items: Vec::new(),
            position,
            is_loaded: false,
            excluded_extensions,
            context,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.left.full_path(), self.right.full_path())
    }

    pub fn left(&self) -> &SynchronizedItem {
        &self.left
    }

    pub fn right(&self) -> &SynchronizedItem {
        &self.right
    }

    pub fn side(&self, side: Side) -> &SynchronizedItem {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut SynchronizedItem {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub(crate) fn sides_mut(&mut self) -> (&mut SynchronizedItem, &mut SynchronizedItem) {
        (&mut self.left, &mut self.right)
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    pub fn child_items(&self) -> &[SynchronizedItems] {
        &self.child_items
    }

    /// 从根开始的索引路径，根节点为空
    pub fn position(&self) -> &[usize] {
        &self.position
    }

    /// 父节点的位置；根节点没有父节点
    pub fn parent_position(&self) -> Option<&[usize]> {
        self.position.split_last().map(|(_, parent)| parent)
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn is_directory(&self) -> bool {
        self.left.is_directory()
    }

    pub fn excluded_extensions(&self) -> &Arc<ExtensionFilter> {
        &self.excluded_extensions
    }

    /// 更换排除规则，下一次加载生效
    pub fn set_excluded_extensions(&mut self, excluded: ExtensionFilter) {
        self.excluded_extensions = Arc::new(excluded);
    }

    /// 两侧都是加载成功的目录，节点状态由子节点汇总
    pub fn is_expanded(&self) -> bool {
        self.left.loaded_directory().is_some() && self.right.loaded_directory().is_some()
    }

    /// 并发加载两侧，重建子节点并汇总状态
    pub async fn load(&mut self) {
        debug!(
            "加载目录对: {:?} <-> {:?}",
            self.left.full_path(),
            self.right.full_path()
        );

        let (left, right) = tokio::join!(self.reload_slot(Side::Left), self.reload_slot(Side::Right));
        self.left.set_slot(left);
        self.right.set_slot(right);

        self.refresh_child_items();
        self.is_loaded = true;

        info!(
            "加载完成: {:?} <-> {:?} ({})",
            self.left.full_path(),
            self.right.full_path(),
            self.left.status().kind()
        );
        self.context
            .pair_events
            .send(ManagerEvent::DirectoriesLoaded(self.key()));
    }

    async fn reload_slot(&self, side: Side) -> ItemSlot {
        let item = self.side(side);
        let path = item.full_path().to_path_buf();
        let factory = &self.context.factory;

        let reloaded = if item.is_directory() {
            match factory
                .create_directory(&path, self.excluded_extensions.clone())
                .await
            {
                Some(mut dir) => {
                    dir.load().await;
                    Some(Item::Directory(dir))
                }
                None => None,
            }
        } else {
            factory.create_file(&path).await.map(Item::File)
        };

        ItemSlot::from_option(reloaded, path)
    }

    /// 重新加载位于 `position` 的节点，然后自下而上刷新它的所有祖先
    pub async fn load_at(&mut self, position: &[usize]) -> bool {
        let Some(node) = self.node_at_mut(position) else {
            return false;
        };
        node.load().await;
        SynchronizedItemsStatusAndCommandsUpdater::refresh_ancestors(self, position);
        true
    }

    pub fn node_at(&self, position: &[usize]) -> Option<&SynchronizedItems> {
        match position.split_first() {
            None => Some(self),
            Some((&index, rest)) => self.child_items.get(index)?.node_at(rest),
        }
    }

    pub fn node_at_mut(&mut self, position: &[usize]) -> Option<&mut SynchronizedItems> {
        match position.split_first() {
            None => Some(self),
            Some((&index, rest)) => self.child_items.get_mut(index)?.node_at_mut(rest),
        }
    }

    /// 比较两侧并重建子节点
    ///
    /// 两侧都是加载成功的目录时，先目录、后文件两轮归并子条目，递归处理每个子节点，
    /// 再汇总状态；否则节点是叶子，只做比较。
    pub fn refresh_child_items(&mut self) {
        SynchronizedItemsStatusAndCommandsUpdater::match_leaf(self);
        self.child_items.clear();

        if !self.is_expanded() {
            return;
        }
        let (Some(left), Some(right)) = (self.left.item().cloned(), self.right.item().cloned())
        else {
            return;
        };
        let (Some(left_dir), Some(right_dir)) = (left.as_directory(), right.as_directory()) else {
            return;
        };

        self.child_items = self.merge_join(left_dir, right_dir);
        for child in &mut self.child_items {
            child.refresh_child_items();
        }
        self.refresh_statuses_from_childs();
    }

    fn merge_join(&self, left: &Directory, right: &Directory) -> Vec<SynchronizedItems> {
        let mut children = Vec::new();

        for directories in [true, false] {
            let lefts: Vec<&Arc<Item>> = left
                .items()
                .iter()
                .filter(|i| i.is_directory() == directories)
                .collect();
            let rights: Vec<&Arc<Item>> = right
                .items()
                .iter()
                .filter(|i| i.is_directory() == directories)
                .collect();

            let (mut l, mut r) = (0, 0);
            loop {
                let (left_slot, right_slot) = match (lefts.get(l), rights.get(r)) {
                    (None, None) => break,
                    (Some(a), Some(b)) if a.name() == b.name() => {
                        l += 1;
                        r += 1;
                        (ItemSlot::Present((*a).clone()), ItemSlot::Present((*b).clone()))
                    }
                    (Some(a), Some(b)) if a.name() > b.name() => {
                        r += 1;
                        (
                            ItemSlot::Absent(left.full_path().join(b.name())),
                            ItemSlot::Present((*b).clone()),
                        )
                    }
                    (Some(a), _) => {
                        l += 1;
                        (
                            ItemSlot::Present((*a).clone()),
                            ItemSlot::Absent(right.full_path().join(a.name())),
                        )
                    }
                    (None, Some(b)) => {
                        r += 1;
                        (
                            ItemSlot::Absent(left.full_path().join(b.name())),
                            ItemSlot::Present((*b).clone()),
                        )
                    }
                };

                let mut position = self.position.clone();
                position.push(children.len());
                children.push(Self::node(
                    left_slot,
                    right_slot,
                    directories,
                    position,
                    self.excluded_extensions.clone(),
                    self.context.clone(),
                ));
            }
        }

        children
    }

    /// 由子节点汇总两侧的状态和命令；叶子节点保持比较结果
    pub fn refresh_statuses_from_childs(&mut self) {
        SynchronizedItemsStatusAndCommandsUpdater::refresh_from_childs(self);
    }

    pub(crate) fn refresh_side_from_childs(&mut self, side: Side) {
        let (status, action) = aggregate(self.child_items.iter().map(|child| {
            let item = child.side(side);
            (item.status(), item.command())
        }));

        let item = self.side_mut(side);
        item.set_status(status);
        item.set_command_action(action);
    }

    /// 应用复制 / 删除通知：更新受影响的一侧，重新比较该节点并刷新祖先
    ///
    /// 删除后两侧都不存在的子节点直接从父节点中移除。
    pub fn apply_item_event(&mut self, event: &ItemEvent) -> bool {
        let (path, is_directory, slot) = match event {
            ItemEvent::CopiedFromTo {
                dest_path,
                new_item: Some(new_item),
                ..
            } => (
                dest_path.as_path(),
                new_item.is_directory(),
                ItemSlot::Present(new_item.clone()),
            ),
            ItemEvent::Deleted { item } => (
                item.full_path(),
                item.is_directory(),
                ItemSlot::Absent(item.full_path().to_path_buf()),
            ),
            _ => return false,
        };

        let Some((position, side)) = self.find(path, is_directory) else {
            return false;
        };
        let Some(node) = self.node_at_mut(&position) else {
            return false;
        };

        debug!("更新条目: {:?}", path);
        node.side_mut(side).set_slot(slot);
        let vanished = !node.left.slot().is_present() && !node.right.slot().is_present();

        match position.split_last() {
            Some((&index, parent)) if vanished => {
                debug!("两侧都已不存在，移除节点: {:?}", path);
                if let Some(parent_node) = self.node_at_mut(parent) {
                    parent_node.remove_child(index);
                    parent_node.refresh_statuses_from_childs();
                }
                SynchronizedItemsStatusAndCommandsUpdater::refresh_ancestors(self, parent);
            }
            _ => {
                node.refresh_child_items();
                SynchronizedItemsStatusAndCommandsUpdater::refresh_ancestors(self, &position);
            }
        }
        true
    }

    /// 移除一个子节点，后面的兄弟子树整体前移一位
    fn remove_child(&mut self, index: usize) {
        if index >= self.child_items.len() {
            return;
        }
        self.child_items.remove(index);
        let depth = self.position.len();
        for child in &mut self.child_items[index..] {
            child.shift_position(depth);
        }
    }

    fn shift_position(&mut self, depth: usize) {
        self.position[depth] -= 1;
        for child in &mut self.child_items {
            child.shift_position(depth);
        }
    }

    /// 查找某一侧路径等于 `path` 的同类节点，返回相对本节点的位置
    ///
    /// 同名的文件和目录会落在不同的节点上，所以需要 `is_directory` 区分。
    pub fn find(&self, path: &Path, is_directory: bool) -> Option<(Vec<usize>, Side)> {
        if self.is_directory() == is_directory {
            if self.left.full_path() == path {
                return Some((Vec::new(), Side::Left));
            }
            if self.right.full_path() == path {
                return Some((Vec::new(), Side::Right));
            }
        }
        if !path.starts_with(self.left.full_path()) && !path.starts_with(self.right.full_path()) {
            return None;
        }

        self.child_items
            .iter()
            .enumerate()
            .find_map(|(index, child)| {
                child.find(path, is_directory).map(|(mut position, side)| {
                    position.insert(0, index);
                    (position, side)
                })
            })
    }

    /// 叶子节点按左侧状态计数
    pub fn summary(&self) -> BTreeMap<StatusKind, usize> {
        let mut counts = BTreeMap::new();
        self.collect_summary(&mut counts);
        counts
    }

    fn collect_summary(&self, counts: &mut BTreeMap<StatusKind, usize>) {
        if self.child_items.is_empty() {
            *counts.entry(self.left.status().kind()).or_insert(0) += 1;
        }
        for child in &self.child_items {
            child.collect_summary(counts);
        }
    }
}
