use super::status::{Status, StatusKind};
use super::sync_command::SyncContext;
use super::synchronized_item::SynchronizedItem;
use std::cmp::Ordering;
use tracing::debug;

/// 叶子级比较：根据两侧条目的存在性、加载错误和修改时间分配状态与命令
pub struct SynchronizedItemMatcher;

impl SynchronizedItemMatcher {
    pub fn update_statuses_and_commands(
        left: &mut SynchronizedItem,
        right: &mut SynchronizedItem,
        context: &SyncContext,
    ) {
        match (left.item().cloned(), right.item().cloned()) {
            (None, None) => {
                debug!("两侧都不存在: {:?}", left.full_path());
                for side in [&mut *left, &mut *right] {
                    side.set_status(Status::with_comment(StatusKind::Unknown, "两侧都不存在"));
                    side.set_command_action(None);
                }
            }
            (None, Some(present)) => {
                left.set_status(Status::new(StatusKind::Missing));
                left.set_command_action(Some(context.delete_action(present.clone())));
                right.set_status(Status::new(StatusKind::ThereIs));
                right.set_command_action(Some(
                    context.copy_action(present, left.full_path().to_path_buf()),
                ));
            }
            (Some(present), None) => {
                right.set_status(Status::new(StatusKind::Missing));
                right.set_command_action(Some(context.delete_action(present.clone())));
                left.set_status(Status::new(StatusKind::ThereIs));
                left.set_command_action(Some(
                    context.copy_action(present, right.full_path().to_path_buf()),
                ));
            }
            (Some(left_item), Some(right_item)) => {
                if let Some(error) = left.load_error().or(right.load_error()).map(str::to_string) {
                    for side in [&mut *left, &mut *right] {
                        side.set_status(Status::with_comment(StatusKind::LoadError, error.clone()));
                        side.set_command_action(None);
                    }
                    return;
                }

                let (left_kind, right_kind) =
                    match left_item.last_update().cmp(&right_item.last_update()) {
                        Ordering::Greater => (StatusKind::Newer, StatusKind::Older),
                        Ordering::Less => (StatusKind::Older, StatusKind::Newer),
                        Ordering::Equal => (StatusKind::Equally, StatusKind::Equally),
                    };

                if left_kind == StatusKind::Equally {
                    left.set_command_action(None);
                    right.set_command_action(None);
                } else {
                    left.set_command_action(Some(
                        context.copy_action(left_item, right.full_path().to_path_buf()),
                    ));
                    right.set_command_action(Some(
                        context.copy_action(right_item, left.full_path().to_path_buf()),
                    ));
                }
                left.set_status(Status::new(left_kind));
                right.set_status(Status::new(right_kind));
            }
        }
    }
}
