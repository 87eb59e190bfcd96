pub mod desktop;
pub mod noop;

use anyhow::bail;
use anyhow::Result;

use crate::domain::models::Notifier;
use crate::domain::models::NotifierName;

pub type NotifierBox = Box<dyn Notifier + Send + Sync>;

pub struct NotifierManager {}

impl NotifierManager {
    pub fn get(name: NotifierName) -> Result<NotifierBox> {
        if name == NotifierName::Desktop {
            return Ok(Box::<desktop::DesktopNotifier>::default());
        }

        if name == NotifierName::None {
            return Ok(Box::<noop::NoopNotifier>::default());
        }

        bail!(format!("No notifier implemented for {name}"))
    }
}
