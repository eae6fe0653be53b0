//! [`Notifier`] emitting notifications into the application log.

use common::operations::Notify;
use tracerr::Traced;
use tracing as log;

use crate::domain::Notification;
#[cfg(doc)]
use crate::infra::Notifier;

use super::Error;

/// [`Notifier`] rendering notifications into the application log instead of
/// delivering them.
///
/// Real email/SMS providers plug into the same [`Notifier`] seam.
#[derive(Clone, Copy, Debug)]
pub struct Log {
    /// Indicator whether notifications are emitted at all.
    enabled: bool,
}

impl Log {
    /// Creates a new [`Log`] notifier.
    ///
    /// A disabled [`Log`] drops all the notifications.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl common::Handler<Notify<Notification>> for Log {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(n): Notify<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        if !self.enabled {
            log::debug!(
                template = %n.template,
                "notifications disabled, dropping",
            );
            return Ok(());
        }

        log::info!(
            template = %n.template,
            recipient = %n.recipient,
            subject = %n.subject,
            body = %n.render(),
            "notification sent",
        );
        Ok(())
    }
}
