use serde::{Deserialize, Serialize};
use std::fmt;

/// 事件标签：决定事件的路由方式与操作初始状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 命令：期望一个处理器完成并给出结果
    Command,
    /// 领域事件：模块内广播，发出即视为已投递
    Domain,
    /// 集成事件：跨模块/跨系统广播
    Integration,
    /// 异常事件：携带一次失败的 `Exception`
    Exception,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Domain => "domain",
            Self::Integration => "integration",
            Self::Exception => "exception",
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
