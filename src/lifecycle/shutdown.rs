//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures_util::future::BoxFuture;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("a disposal action is already registered")]
    AlreadyRegistered,
}

/// Process-wide shutdown registry.
///
/// Holds exactly one disposal action and runs it at most once.
pub struct Shutdown {
    disposal: Mutex<Option<BoxFuture<'static, ()>>>,
    registered: AtomicBool,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            disposal: Mutex::new(None),
            registered: AtomicBool::new(false),
            triggered: AtomicBool::new(false),
        }
    }

    /// Register the action to run on shutdown. A second registration fails.
    pub fn register_disposal(&self, disposal: BoxFuture<'static, ()>) -> Result<(), ShutdownError> {
        if self.registered.swap(true, Ordering::SeqCst) {
            return Err(ShutdownError::AlreadyRegistered);
        }
        // A panic cannot leave the slot half-written.
        *self.disposal.lock().unwrap_or_else(PoisonError::into_inner) = Some(disposal);
        Ok(())
    }

    /// Start shutdown. Returns `false` when it had already been triggered.
    pub async fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already in progress");
            return false;
        }

        let disposal = self
            .disposal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match disposal {
            Some(disposal) => disposal.await,
            None => tracing::debug!("No disposal registered"),
        }
        true
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
