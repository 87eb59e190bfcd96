mod message_store;
mod notifications;
mod session_cache;
mod typing;
mod widget;

pub use message_store::*;
pub use notifications::*;
pub use session_cache::*;
pub use typing::*;
pub use widget::*;
