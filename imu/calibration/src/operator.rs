use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use imu_traits::{ImuError, ImuResult};

/// Person handling the fixture. Implemented by the console front end and by test scripts.
pub trait Operator {
    /// Returns the chosen index, `None` when the menu is dismissed.
    fn select_from_menu(&mut self, title: &str, options: &[&str]) -> Option<usize>;

    /// Blocks until the operator is ready. An error aborts the run.
    fn wait_for_confirmation(&mut self, message: &str) -> ImuResult<()>;

    fn show_progress(&mut self, label: &str, value: usize);

    fn beep(&mut self);
}

/// Abort flag shared between the run and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with `ImuError::Cancelled` once the flag is set.
    pub fn check(&self) -> ImuResult<()> {
        if self.is_cancelled() {
            Err(ImuError::Cancelled)
        } else {
            Ok(())
        }
    }
}
