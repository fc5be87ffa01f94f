use super::status::Status;
use super::sync_command::{CommandAction, SyncCommand};
use crate::events::{EventSender, ItemEvent};
use crate::items::{Directory, Item, ItemSlot};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 目录对中的一侧：树中的位置、可能缺失的条目、状态和同步命令
#[derive(Debug, Clone)]
pub struct SynchronizedItem {
    full_path: PathBuf,
    is_directory: bool,
    slot: ItemSlot,
    status: Status,
    command: SyncCommand,
}

impl SynchronizedItem {
    pub fn new(slot: ItemSlot, is_directory: bool, events: EventSender<ItemEvent>) -> Self {
        let full_path = slot.path().to_path_buf();
        Self {
            command: SyncCommand::new(full_path.clone(), events),
            full_path,
            is_directory,
            slot,
            status: Status::default(),
        }
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn slot(&self) -> &ItemSlot {
        &self.slot
    }

    pub fn item(&self) -> Option<&Arc<Item>> {
        self.slot.item()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn command(&self) -> &SyncCommand {
        &self.command
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// 替换同步动作，返回动作是否发生变化
    pub(crate) fn set_command_action(&mut self, action: Option<CommandAction>) -> bool {
        self.command.set_accepted(self.slot.item().cloned());
        self.command.set_command_action(action)
    }

    /// 替换底层条目（复制到本侧成功或本侧被删除之后）
    pub(crate) fn set_slot(&mut self, slot: ItemSlot) {
        self.command.set_accepted(slot.item().cloned());
        self.slot = slot;
    }

    /// 上一次加载失败的原因（仅目录）
    pub fn load_error(&self) -> Option<&str> {
        self.slot.directory().and_then(|d| d.last_load_error())
    }

    /// 已成功加载、可以展开子条目的目录
    pub fn loaded_directory(&self) -> Option<&Directory> {
        self.slot
            .directory()
            .filter(|d| d.is_loaded() && d.last_load_error().is_none())
    }
}
