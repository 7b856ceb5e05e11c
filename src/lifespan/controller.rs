//! Lifespan state machine.
//!
//! Drives the application's startup and shutdown hooks in response to
//! `lifespan.*` messages from the host.
//!
//! # State Machine
//!
//! ```text
//!            lifespan.startup                  hooks ok
//! Pending ──────────────────────► Starting ─────────────► Started
//!                                    │
//!                                    │ hook failed
//!                                    ▼
//!                              StartupFailed
//!
//!            lifespan.shutdown                 hooks ok
//! Started ──────────────────────► Stopping ─────────────► Stopped
//! (or Pending / StartupFailed)       │
//!                                    │ hook failed
//!                                    ▼
//!                              ShutdownFailed
//! ```
//!
//! Hook failures are reported once through the matching `.failed` message
//! and never escape [`Lifespan::run`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::protocol::Message;
use crate::transport::SharedChannel;

use super::hooks::{LifecycleHooks, ServerEvent};

// ============================================================================
// Constants
// ============================================================================

/// Notice for `before_server_start` listeners under ASGI.
pub const START_ORDERING_NOTICE: &str = "You have set a listener for \"before_server_start\" \
     in ASGI mode. It will be executed as early as possible, but not before the ASGI server \
     is started.";

/// Notice for `after_server_stop` listeners under ASGI.
pub const STOP_ORDERING_NOTICE: &str = "You have set a listener for \"after_server_stop\" \
     in ASGI mode. It will be executed as late as possible, but not after the ASGI server \
     is stopped.";

/// Warning for runtime options the host controls.
pub const IGNORED_RUNTIME_NOTICE: &str = "You have set the runtime_threads configuration \
     option, but the adapter cannot control the async runtime when running in ASGI mode. \
     This option will be ignored.";

// ============================================================================
// Phase
// ============================================================================

/// Lifespan phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Startup hooks.
    Startup,
    /// Shutdown hooks.
    Shutdown,
}

impl Phase {
    /// Message reporting success of this phase.
    #[must_use]
    pub fn complete_message(self) -> Message {
        match self {
            Self::Startup => Message::LifespanStartupComplete,
            Self::Shutdown => Message::LifespanShutdownComplete,
        }
    }

    /// Message reporting failure of this phase.
    #[must_use]
    pub fn failed_message(self, message: String) -> Message {
        match self {
            Self::Startup => Message::LifespanStartupFailed { message },
            Self::Shutdown => Message::LifespanShutdownFailed { message },
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

// ============================================================================
// LifespanState
// ============================================================================

/// Where the application is in its lifespan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifespanState {
    /// Nothing received yet.
    #[default]
    Pending,
    /// Startup hooks running.
    Starting,
    /// Startup succeeded.
    Started,
    /// Shutdown hooks running.
    Stopping,
    /// Shutdown succeeded.
    Stopped,
    /// A startup hook failed.
    StartupFailed,
    /// A shutdown hook failed.
    ShutdownFailed,
}

impl LifespanState {
    /// Returns `true` once no further lifespan message will be handled.
    #[inline]
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Stopped | Self::ShutdownFailed)
    }

    /// Returns `true` if a `lifespan.startup` would be acted on.
    #[inline]
    #[must_use]
    pub const fn accepts_startup(self) -> bool {
        matches!(self, Self::Pending)
    }
}

// ============================================================================
// Lifespan
// ============================================================================

/// Lifespan controller for one `lifespan` scope.
pub struct Lifespan {
    /// Hooks to run per phase.
    hooks: LifecycleHooks,
    /// Notice and warning switches.
    config: Arc<AdapterConfig>,
    /// Host channel.
    channel: SharedChannel,
    /// Current state.
    state: LifespanState,
    /// Most recent hook failure.
    failure: Option<Error>,
}

impl fmt::Debug for Lifespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifespan")
            .field("hooks", &self.hooks.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Lifespan {
    /// Creates a controller in the `Pending` state.
    #[must_use]
    pub fn new(hooks: LifecycleHooks, config: Arc<AdapterConfig>, channel: SharedChannel) -> Self {
        Self {
            hooks,
            config,
            channel,
            state: LifespanState::Pending,
            failure: None,
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LifespanState {
        self.state
    }

    /// Returns the most recent hook failure, if any.
    #[inline]
    #[must_use]
    pub const fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Ordering notice that applies to `phase`, if any.
    ///
    /// Only reported in debug mode at verbosity above 1, and only when a
    /// listener is registered for the event whose timing differs from a
    /// native server.
    #[must_use]
    pub fn ordering_notice(&self, phase: Phase) -> Option<&'static str> {
        if !self.config.wants_ordering_notices() {
            return None;
        }

        match phase {
            Phase::Startup if self.hooks.has(ServerEvent::BeforeServerStart) => {
                Some(START_ORDERING_NOTICE)
            }
            Phase::Shutdown if self.hooks.has(ServerEvent::AfterServerStop) => {
                Some(STOP_ORDERING_NOTICE)
            }
            _ => None,
        }
    }

    /// Processes lifespan messages until shutdown finishes or the host
    /// closes the channel.
    ///
    /// Unknown message types are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] only if a `.complete` / `.failed`
    /// reply could not be delivered. Hook failures are never returned.
    pub async fn run(&mut self) -> Result<()> {
        while !self.state.is_finished() {
            let message = match self.channel.receive().await {
                Ok(message) => message,
                Err(Error::ConnectionClosed) => {
                    debug!(state = ?self.state, "Lifespan channel closed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            match message {
                Message::LifespanStartup if self.state.accepts_startup() => {
                    self.startup().await?;
                }
                Message::LifespanStartup => {
                    warn!(state = ?self.state, "Ignoring repeated lifespan.startup");
                }
                Message::LifespanShutdown => {
                    self.shutdown().await?;
                }
                other => {
                    trace!(kind = other.kind(), "Ignoring non-lifespan message");
                }
            }
        }

        Ok(())
    }

    /// Runs the startup phase and reports its outcome.
    async fn startup(&mut self) -> Result<()> {
        self.state = LifespanState::Starting;

        if self.config.has_ignored_runtime_option() {
            warn!("{IGNORED_RUNTIME_NOTICE}");
        }

        match self.run_phase(Phase::Startup).await {
            Ok(()) => {
                self.state = LifespanState::Started;
                info!("Lifespan startup complete");
                self.channel.send(Phase::Startup.complete_message()).await
            }
            Err(message) => {
                self.state = LifespanState::StartupFailed;
                self.failure = Some(Error::hook(Phase::Startup, message.clone()));
                self.channel
                    .send(Phase::Startup.failed_message(message))
                    .await
            }
        }
    }

    /// Runs the shutdown phase and reports its outcome.
    async fn shutdown(&mut self) -> Result<()> {
        if self.state != LifespanState::Started {
            debug!(state = ?self.state, "Shutdown requested without a successful startup");
        }
        self.state = LifespanState::Stopping;

        match self.run_phase(Phase::Shutdown).await {
            Ok(()) => {
                self.state = LifespanState::Stopped;
                info!("Lifespan shutdown complete");
                self.channel.send(Phase::Shutdown.complete_message()).await
            }
            Err(message) => {
                self.state = LifespanState::ShutdownFailed;
                self.failure = Some(Error::hook(Phase::Shutdown, message.clone()));
                self.channel
                    .send(Phase::Shutdown.failed_message(message))
                    .await
            }
        }
    }

    /// Runs every hook of `phase` in order, stopping at the first failure.
    ///
    /// Returns the failure's text on error.
    async fn run_phase(&self, phase: Phase) -> std::result::Result<(), String> {
        if let Some(notice) = self.ordering_notice(phase) {
            debug!("{notice}");
        }

        for (event, hook) in self.hooks.phase(phase) {
            trace!(%phase, %event, hook = hook.name(), "Running lifecycle hook");

            if let Err(e) = hook.invoke().await {
                let message = e.to_string();
                error!(
                    %phase,
                    %event,
                    hook = hook.name(),
                    error = %message,
                    "Lifecycle hook failed"
                );
                return Err(message);
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
