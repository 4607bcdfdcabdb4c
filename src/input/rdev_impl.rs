// Global pointer simulation through rdev
use super::PointerInput;
use crate::error::{TesterError, TesterResult};
use rdev::{Button, EventType, simulate};
use std::time::Duration;

/// Some platforms drop events sent back to back; rdev recommends a short gap.
const EVENT_GAP: Duration = Duration::from_millis(20);

pub struct RdevPointer {
    event_gap: Duration,
}

impl RdevPointer {
    pub fn new() -> Self {
        Self {
            event_gap: EVENT_GAP,
        }
    }

    fn send(&self, event: &EventType) -> TesterResult<()> {
        simulate(event).map_err(|e| TesterError::PointerFailed {
            description: format!("could not send {event:?}: {e:?}"),
        })?;
        std::thread::sleep(self.event_gap);
        Ok(())
    }
}

impl Default for RdevPointer {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerInput for RdevPointer {
    fn move_to(&mut self, x: f64, y: f64) -> TesterResult<()> {
        self.send(&EventType::MouseMove { x, y })
    }

    fn click(&mut self) -> TesterResult<()> {
        self.send(&EventType::ButtonPress(Button::Left))?;
        self.send(&EventType::ButtonRelease(Button::Left))
    }
}
