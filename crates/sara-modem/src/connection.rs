//! Network attach
//!
//! `Disconnected -> Selecting -> AwaitingRegistration -> Registered`, with
//! `Failed` reachable from `AwaitingRegistration` when the budget runs out.

use sara_protocol::{AtCommand, RegistrationStatus};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ModemError;
use crate::modem::Modem;
use crate::variant::AwaitStrategy;

/// Why a connection attempt ended in [`ConnectionState::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Operator selection command in flight
    Selecting,
    AwaitingRegistration,
    Registered,
    Failed(ConnectionFailure),
}

impl ConnectionState {
    pub fn is_registered(&self) -> bool {
        matches!(self, ConnectionState::Registered)
    }
}

impl<T> Modem<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Select `operator` (numeric PLMN) and wait for network registration
    ///
    /// With `roaming` set the attach completes on status 5 (registered,
    /// roaming), otherwise on status 1 (registered, home network).
    pub async fn connect(&mut self, operator: &str, roaming: bool) -> Result<(), ModemError> {
        let expected = if roaming {
            RegistrationStatus::Roaming
        } else {
            RegistrationStatus::Home
        };
        let budget = self.config.connect_timeout();
        let started = Instant::now();
        let deadline = started + budget;

        info!("Trying to connect to operator {}", operator);
        self.connection = ConnectionState::Selecting;

        let select = AtCommand::SelectOperator {
            plmn: operator.to_string(),
        };
        if let Err(e) = self.execute(&select.to_string(), budget, false).await {
            self.connection = ConnectionState::Disconnected;
            return Err(e);
        }

        self.connection = ConnectionState::AwaitingRegistration;
        let result = match self.profile.await_strategy {
            AwaitStrategy::Notification => self.await_notification(expected, deadline).await,
            AwaitStrategy::Polling => self.await_polling(expected, deadline).await,
        };

        match result {
            Ok(()) => {
                self.connection = ConnectionState::Registered;
                info!("Connected to {}", operator);
            }
            Err(e) if e.is_timeout() => {
                self.connection = ConnectionState::Failed(ConnectionFailure::Timeout);
                warn!("Registration with {} timed out", operator);
                return Err(ModemError::ConnectionTimeout {
                    elapsed_secs: started.elapsed().as_secs(),
                });
            }
            Err(e) => {
                self.connection = ConnectionState::Disconnected;
                return Err(e);
            }
        }

        self.update_ip_address().await?;
        Ok(())
    }

    async fn await_notification(
        &mut self,
        expected: RegistrationStatus,
        deadline: Instant,
    ) -> Result<(), ModemError> {
        // The notification may already have arrived during operator selection
        while self.state.registration() != Some(expected) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ModemError::Timeout {
                    operation: "registration".into(),
                    timeout_ms: 0,
                });
            }
            self.read_until("+CEREG:", "registration", remaining).await?;
        }
        Ok(())
    }

    async fn await_polling(
        &mut self,
        expected: RegistrationStatus,
        deadline: Instant,
    ) -> Result<(), ModemError> {
        let interval = self.config.registration_poll_interval();

        while self.state.registration() != Some(expected) {
            if Instant::now() + interval > deadline {
                return Err(ModemError::Timeout {
                    operation: "registration".into(),
                    timeout_ms: 0,
                });
            }
            tokio::time::sleep(interval).await;

            let status = self.query_registration().await?;
            debug!("Registration poll returned {:?}", status);
        }
        Ok(())
    }
}
