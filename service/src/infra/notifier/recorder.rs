//! [`Notifier`] recording notifications in tests.

use std::sync::{Arc, Mutex};

use common::operations::Notify;
use tracerr::Traced;

use crate::domain::{notification::Template, Notification};
#[cfg(doc)]
use crate::infra::Notifier;

use super::Error;

/// [`Notifier`] remembering every delivered [`Notification`].
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    /// Delivered [`Notification`]s.
    sent: Arc<Mutex<Vec<Notification>>>,

    /// Indicator whether every delivery fails.
    failing: bool,
}

impl Recorder {
    /// Creates a new [`Recorder`] failing every delivery.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Returns [`Template`]s of the delivered [`Notification`]s in order.
    pub fn templates(&self) -> Vec<Template> {
        self.sent.lock().unwrap().iter().map(|n| n.template).collect()
    }

    /// Returns the delivered [`Notification`]s.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl common::Handler<Notify<Notification>> for Recorder {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(n): Notify<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.failing {
            return Err(tracerr::new!(Error::Gateway("unreachable".into())));
        }
        self.sent.lock().unwrap().push(n);
        Ok(())
    }
}
