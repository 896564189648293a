use async_trait::async_trait;
use kube_sensor::detection::domain::EnforcementCommand;
use kube_sensor::prelude::*;
use parking_lot::Mutex;

/// Mock EnforcementExecutor for testing
#[derive(Default)]
pub struct MockActionExecutor {
    pub should_fail: bool,
    executed: Mutex<Vec<EnforcementCommand>>,
}

#[allow(dead_code)]
impl MockActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<EnforcementCommand> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl EnforcementExecutor for MockActionExecutor {
    async fn execute(&self, command: &EnforcementCommand) -> Result<()> {
        self.executed.lock().push(command.clone());
        if self.should_fail {
            anyhow::bail!("cluster rejected {:?}", command.action);
        }
        Ok(())
    }
}
