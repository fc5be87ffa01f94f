use serde::Serialize;
use std::fmt;

/// 目录对一侧相对另一侧的状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    #[default]
    Unknown,
    /// 本侧存在，另一侧缺失
    ThereIs,
    /// 本侧缺失，另一侧存在
    Missing,
    Newer,
    Older,
    Equally,
    LoadError,
}

impl StatusKind {
    /// 目录由子条目汇总得到该状态时附带的说明
    pub const fn children_comment(self) -> Option<&'static str> {
        match self {
            StatusKind::Unknown => Some("子条目状态不一致"),
            StatusKind::ThereIs => Some("包含另一侧缺失的条目"),
            StatusKind::Missing => Some("缺少另一侧存在的条目"),
            StatusKind::Newer => Some("包含较新的条目"),
            StatusKind::Older => Some("包含较旧的条目"),
            StatusKind::Equally => None,
            StatusKind::LoadError => Some("部分子目录加载失败"),
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusKind::Unknown => "unknown",
            StatusKind::ThereIs => "thereIs",
            StatusKind::Missing => "missing",
            StatusKind::Newer => "newer",
            StatusKind::Older => "older",
            StatusKind::Equally => "equally",
            StatusKind::LoadError => "loadError",
        };
        f.write_str(s)
    }
}

/// 状态及可选说明
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    kind: StatusKind,
    comment: Option<String>,
}

impl Status {
    pub fn new(kind: StatusKind) -> Self {
        Self {
            kind,
            comment: None,
        }
    }

    pub fn with_comment(kind: StatusKind, comment: impl Into<String>) -> Self {
        Self {
            kind,
            comment: Some(comment.into()),
        }
    }

    /// 使用汇总说明表中的说明
    pub fn from_children(kind: StatusKind) -> Self {
        Self {
            kind,
            comment: kind.children_comment().map(str::to_string),
        }
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl From<StatusKind> for Status {
    fn from(kind: StatusKind) -> Self {
        Self::new(kind)
    }
}
