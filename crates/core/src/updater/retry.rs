//! Bounded-retry application of enhancement text.

use tokio::time::Instant;
use tracing::{debug, warn};

use super::client::{TicketUpdate, TicketingClient, TicketingError};
use super::config::UpdaterConfig;

/// Why an update did not apply.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UpdateError {
    #[error(transparent)]
    Ticketing(#[from] TicketingError),

    /// The deadline ran out. `last` is the error from the final completed
    /// attempt, if any attempt completed.
    #[error("deadline_exceeded{}", last_error_suffix(.last))]
    DeadlineExceeded { last: Option<TicketingError> },
}

fn last_error_suffix(last: &Option<TicketingError>) -> String {
    match last {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

/// Outcome of [`Updater::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    Applied { attempts: u32 },
    Failed { attempts: u32, error: UpdateError },
}

impl UpdateResult {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Applied { attempts } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Applies text to a ticket with bounded retry.
///
/// Each call is bounded by the per-call timeout and by the overall deadline.
/// Only transient failures are retried, with exponential backoff between
/// calls. A backoff that would end past the deadline is not slept; the
/// update fails with [`UpdateError::DeadlineExceeded`] carrying the error
/// that would have been retried.
#[derive(Debug, Clone)]
pub struct Updater {
    config: UpdaterConfig,
}

impl Updater {
    pub fn new(config: UpdaterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Apply the update. Never fails; the outcome carries the last error.
    pub async fn update(
        &self,
        client: &dyn TicketingClient,
        update: TicketUpdate<'_>,
        deadline: Instant,
    ) -> UpdateResult {
        let per_call = self.config.per_call_timeout();
        let mut attempts = 0;
        let mut last: Option<TicketingError> = None;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return UpdateResult::Failed {
                    attempts,
                    error: UpdateError::DeadlineExceeded { last },
                };
            }

            attempts += 1;
            let call_deadline = deadline.min(now + per_call);

            debug!(
                correlation_id = %update.correlation_id,
                ticket_id = %update.ticket_id,
                attempt = attempts,
                "Calling ticketing client"
            );

            let error = match tokio::time::timeout_at(call_deadline, client.update_ticket(update)).await {
                Ok(Ok(())) => return UpdateResult::Applied { attempts },
                Ok(Err(e)) => e,
                // The abandoned call may still have been applied remotely.
                Err(_) if Instant::now() >= deadline => {
                    return UpdateResult::Failed {
                        attempts,
                        error: UpdateError::DeadlineExceeded { last },
                    };
                }
                Err(_) => TicketingError::Timeout(per_call),
            };

            if !error.is_transient() || attempts >= self.config.max_attempts {
                return UpdateResult::Failed {
                    attempts,
                    error: error.into(),
                };
            }

            let backoff = self.config.backoff_for(attempts);
            if Instant::now() + backoff >= deadline {
                warn!(
                    correlation_id = %update.correlation_id,
                    tenant_id = %update.tenant_id,
                    ticket_id = %update.ticket_id,
                    attempt = attempts,
                    error = %error,
                    "Ticket update failed and no time is left to retry"
                );
                return UpdateResult::Failed {
                    attempts,
                    error: UpdateError::DeadlineExceeded { last: Some(error) },
                };
            }

            warn!(
                correlation_id = %update.correlation_id,
                tenant_id = %update.tenant_id,
                ticket_id = %update.ticket_id,
                attempt = attempts,
                max_attempts = self.config.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Ticket update failed, retrying"
            );

            last = Some(error);
            tokio::time::sleep(backoff).await;
        }
    }
}
