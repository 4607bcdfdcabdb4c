// Input module - simulated pointer clicks on matched elements

pub mod dispatcher;
pub mod rdev_impl;

pub use dispatcher::{ClickDispatcher, dispatch_point};
pub use rdev_impl::RdevPointer;

use crate::error::TesterResult;

// Trait for pointer backends (rdev, test recorders)
pub trait PointerInput {
    fn move_to(&mut self, x: f64, y: f64) -> TesterResult<()>;

    // Click at the current position
    fn click(&mut self) -> TesterResult<()>;

    fn click_at(&mut self, x: f64, y: f64) -> TesterResult<()> {
        self.move_to(x, y)?;
        self.click()
    }
}
