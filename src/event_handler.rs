#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::s3_event::InvocationResult;

#[cfg_attr(test, automock)]
pub trait EventHandler {
    async fn process_event(
        &self,
        event: &Value,
    ) -> anyhow::Result<InvocationResult>;
}
