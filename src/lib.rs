#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

//! Support-chat synchronization engine for the Souk marketplace client.
//!
//! The crate owns everything between the UI widget and the support backend:
//! conversation bootstrap and resume, the persistent gateway channel,
//! optimistic message reconciliation, typing presence, and new-message
//! notifications. The host application renders `ChatWidget::messages()` and
//! feeds user input back in; all network traffic flows through here.

pub mod configuration;
pub mod domain;
pub mod infrastructure;

pub use configuration::Config;
pub use configuration::ConfigKey;
pub use domain::models::Event;
pub use domain::services::ChatWidget;
