pub mod error;
pub mod message;
pub mod types;

pub use error::{Error, Result};
pub use message::{Author, HistoryMessage, InboundMessage};
pub use types::{ChannelId, MessageId, UserId};
