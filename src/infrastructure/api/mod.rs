mod chat;
mod notifications;

pub use chat::*;
pub use notifications::*;
