use super::matcher::SynchronizedItemMatcher;
use super::synchronized_items::{Side, SynchronizedItems};
use tracing::trace;

/// 状态与命令的刷新入口
///
/// 不持有状态：叶子比较交给 [`SynchronizedItemMatcher`]，目录汇总交给
/// [`super::aggregation::aggregate`]，这里只负责在树上定位和向上传播。
pub struct SynchronizedItemsStatusAndCommandsUpdater;

impl SynchronizedItemsStatusAndCommandsUpdater {
    pub fn refresh_left_item_statuses_and_commands_from_childs(node: &mut SynchronizedItems) {
        if node.is_expanded() {
            node.refresh_side_from_childs(Side::Left);
        }
    }

    pub fn refresh_right_item_statuses_and_commands_from_childs(node: &mut SynchronizedItems) {
        if node.is_expanded() {
            node.refresh_side_from_childs(Side::Right);
        }
    }

    /// 两侧都由子节点汇总
    pub fn refresh_from_childs(node: &mut SynchronizedItems) {
        Self::refresh_left_item_statuses_and_commands_from_childs(node);
        Self::refresh_right_item_statuses_and_commands_from_childs(node);
    }

    /// 只重新比较节点本身的两侧，不重建子节点
    pub fn match_leaf(node: &mut SynchronizedItems) {
        let context = node.context().clone();
        let (left, right) = node.sides_mut();
        SynchronizedItemMatcher::update_statuses_and_commands(left, right, &context);
    }

    /// 从 `position` 的父节点开始，逐级向上直到根重新汇总
    pub fn refresh_ancestors(root: &mut SynchronizedItems, position: &[usize]) {
        for depth in (0..position.len()).rev() {
            let ancestor = &position[..depth];
            match root.node_at_mut(ancestor) {
                Some(node) => {
                    trace!("刷新祖先节点: {:?}", ancestor);
                    Self::refresh_from_childs(node);
                }
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryPairSettings;
    use crate::core::status::{Status, StatusKind};
    use crate::core::sync_command::SyncContext;
    use crate::items::LocalItemFactory;
    use filetime::FileTime;
    use std::fs;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_refresh_ancestors_reaches_root() {
        let root = tempfile::tempdir().unwrap();
        let (left, right) = (root.path().join("left"), root.path().join("right"));
        for side in [&left, &right] {
            fs::create_dir_all(side.join("d")).unwrap();
            let file = side.join("d").join("f.txt");
            fs::write(&file, "x").unwrap();
            filetime::set_file_mtime(&file, FileTime::from_unix_time(1_546_300_800, 0)).unwrap();
        }

        let settings = DirectoryPairSettings::new(&left, &right);
        let mut pair =
            SynchronizedItems::new(&settings, SyncContext::new(Arc::new(LocalItemFactory))).await;
        pair.load().await;
        assert_eq!(pair.left().status().kind(), StatusKind::Equally);

        let leaf = pair.node_at_mut(&[0, 0]).unwrap();
        leaf.side_mut(Side::Left).set_status(Status::new(StatusKind::Older));
        leaf.side_mut(Side::Right).set_status(Status::new(StatusKind::Newer));

        SynchronizedItemsStatusAndCommandsUpdater::refresh_ancestors(&mut pair, &[0, 0]);

        assert_eq!(pair.left().status().kind(), StatusKind::Older);
        assert_eq!(pair.right().status().kind(), StatusKind::Newer);
        assert_eq!(
            pair.child_items()[0].left().status().kind(),
            StatusKind::Older
        );
    }

    #[tokio::test]
    async fn test_match_leaf_restores_comparison() {
        let root = tempfile::tempdir().unwrap();
        let (left, right) = (root.path().join("left"), root.path().join("right"));
        fs::create_dir_all(&left).unwrap();
        fs::create_dir_all(&right).unwrap();
        fs::write(left.join("only.txt"), "x").unwrap();

        let settings = DirectoryPairSettings::new(&left, &right);
        let mut pair =
            SynchronizedItems::new(&settings, SyncContext::new(Arc::new(LocalItemFactory))).await;
        pair.load().await;

        let leaf = pair.node_at_mut(&[0]).unwrap();
        leaf.side_mut(Side::Left).set_status(Status::default());
        SynchronizedItemsStatusAndCommandsUpdater::match_leaf(leaf);

        assert_eq!(leaf.left().status().kind(), StatusKind::ThereIs);
        assert_eq!(leaf.right().status().kind(), StatusKind::Missing);
    }
}
