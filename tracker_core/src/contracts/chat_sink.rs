//! Chat-platform contract (§4.6, §5.5): `Send(chat_id, text) -> error`.

use crate::error::TransportError;
use crate::ids::UserId;
use async_trait::async_trait;

#[async_trait]
pub trait ChatSink: Send + Sync {
  async fn send(&self, chat_id: UserId, text: &str) -> Result<(), TransportError>;
}
