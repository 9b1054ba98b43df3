//! Runtime 单元测试
//!
//! 测试任务状态机、等待组合器、所有者绑定、注册表和任务组

mod state;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::Runtime;
use crate::util::config::RuntimeConfig;

/// Fresh runtime per test so parallel tests never share a registry.
pub(super) fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default())
}

/// Shared event log for listener assertions.
#[derive(Clone, Default)]
pub(super) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(super) fn push(
        &self,
        entry: impl Into<String>,
    ) {
        self.0.lock().push(entry.into());
    }

    pub(super) fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}
