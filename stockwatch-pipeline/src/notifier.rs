use async_trait::async_trait;
use serde::Serialize;

use crate::error::PipelineResult;
use crate::types::AlertType;
use crate::util;

/// A rendered message waiting to go out, tagged with where it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub transaction_id: String,
    /// `None` for messages that are not alerts (e.g. reorder summaries).
    pub alert_type: Option<AlertType>,
    pub text: String,
}

/// A notifier delivers one rendered message to an external messaging
/// endpoint. It runs off the decision path (see `dispatcher`) and its
/// failures never reach the event handler.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a single message. One network call per message.
    async fn send(&self, message: &OutboundMessage) -> PipelineResult<()>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
