pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod state;

// Re-export main types for convenience
pub use ai::{Completer, CompletionClient, FALLBACK_REPLY};
pub use config::{Appearance, Position, Theme, WidgetConfig};
pub use controller::{SubmitOutcome, ViewModel, ViewSink, WidgetController, APOLOGY_TEXT};
pub use error::{ChatError, Result};
pub use state::{ChatRole, ChatTurn, ConversationStore, DisplayMessage, Sender};
