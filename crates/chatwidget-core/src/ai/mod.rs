pub mod completion;

pub use completion::{extract_reply, CompletionClient, FALLBACK_REPLY};

use async_trait::async_trait;

use crate::error::Result;
use crate::state::ChatTurn;

/// Anything that can turn a transcript into one assistant reply.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, transcript: &[ChatTurn]) -> Result<String>;
}
