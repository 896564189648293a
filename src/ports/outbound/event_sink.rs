use crate::application::dto::{SensorEnforcement, SensorEvent};
use crate::shared::Result;
use async_trait::async_trait;

/// EventSink port - the control-plane transport
///
/// Alerts and forwarded resources travel on the event stream; executed
/// enforcements are reported on a separate stream.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send_event(&self, event: SensorEvent) -> Result<()>;

    async fn send_enforcement(&self, enforcement: SensorEnforcement) -> Result<()>;
}
