//! Session lifecycle orchestration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::active::ActiveSessionRecord;
use super::config::SessionConfig;
use super::id::SessionId;
use crate::api::{Session as ApiSession, SessionController};
use crate::config::ClientConfig;
use crate::console;
use crate::error::{ApiStatus, Result, SparkConnectError};

/// Polling cadence for a lifecycle wait loop.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Delay between state probes.
    pub interval: Duration,
    /// Give up after this much elapsed time.
    pub timeout: Duration,
}

impl PollSettings {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Creation waits: the service provisions in minutes.
    pub const fn creation() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(600))
    }

    /// Termination waits: the state flips within seconds.
    pub const fn termination() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}

/// Probe used by the proxy to gate new connections on session liveness.
#[async_trait]
pub trait SessionProbe: Send + Sync {
    async fn is_active(&self) -> bool;
}

/// A session the manager created or attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    /// Session ID.
    pub id: SessionId,
    /// Fully-qualified resource name.
    pub name: String,
    /// Server-assigned UUID.
    pub uuid: String,
    /// Spark Connect endpoint host published by the runtime.
    pub endpoint: String,
}

/// Orchestrates session creation, reuse, and termination.
///
/// At most one session is tracked at a time, mirroring the one
/// driver / one session model of the service.
pub struct SessionManager {
    controller: Arc<dyn SessionController>,
    config: ClientConfig,
    active: Mutex<Option<ActiveSession>>,
    create_poll: PollSettings,
    terminate_poll: PollSettings,
}

impl SessionManager {
    pub fn new(controller: Arc<dyn SessionController>, config: ClientConfig) -> Self {
        Self {
            controller,
            config,
            active: Mutex::new(None),
            create_poll: PollSettings::creation(),
            terminate_poll: PollSettings::termination(),
        }
    }

    /// Override the polling cadence, mainly for tests.
    pub fn with_poll_settings(mut self, create: PollSettings, terminate: PollSettings) -> Self {
        self.create_poll = create;
        self.terminate_poll = terminate;
        self
    }

    /// The client configuration this manager was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The currently tracked session, if any.
    pub async fn active(&self) -> Option<ActiveSession> {
        self.active.lock().await.clone()
    }

    /// Create a new session, replacing any tracked one.
    pub async fn create(&self, spec: &SessionConfig) -> Result<ActiveSession> {
        let mut active = self.active.lock().await;
        let created = self.create_session(spec).await?;
        *active = Some(created.clone());
        Ok(created)
    }

    /// Reuse the tracked session when it is still usable, otherwise stop
    /// it and create a fresh one.
    pub async fn get_or_create(&self, spec: &SessionConfig) -> Result<ActiveSession> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.clone() {
            let usable = match self.controller.get_session(&current.name).await {
                Ok(session) => session.state().is_usable(),
                Err(e) => {
                    debug!("{} session lookup failed: {e}", current.id);
                    false
                }
            };

            if usable {
                if let (Some(project), Some(region)) =
                    (self.config.project_id.as_deref(), self.config.region.as_deref())
                {
                    info!(
                        "using existing session (configuration changes may not be applied): {}",
                        console::session_url(project, region, current.id.as_str())
                    );
                }
                return Ok(current);
            }

            info!(
                "{} session is not active, stopping and creating a new one",
                current.id
            );
            self.terminate_session(&mut active).await?;
        }

        let created = self.create_session(spec).await?;
        *active = Some(created.clone());
        Ok(created)
    }

    /// Terminate the tracked session, if any.
    pub async fn terminate(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        self.terminate_session(&mut active).await
    }

    async fn create_session(&self, spec: &SessionConfig) -> Result<ActiveSession> {
        let parent = self.config.parent()?;
        let project = self.config.project_id.as_deref().unwrap_or_default();
        let region = self.config.region.as_deref().unwrap_or_default();

        let config = spec.finalize(&self.config, &crate::config::process_env)?;

        let id = SessionId::generate();
        let name = id.resource_name(project, region);
        let body = ApiSession::from_config(name.as_str(), &config);

        info!(
            "creating session: {}",
            console::session_url(project, region, id.as_str())
        );
        let started = Instant::now();

        let operation = self
            .controller
            .create_session(&parent, id.as_str(), &body)
            .await
            .map_err(|e| match e {
                SparkConnectError::Api { status, message }
                    if matches!(
                        status,
                        ApiStatus::InvalidArgument | ApiStatus::PermissionDenied
                    ) =>
                {
                    SparkConnectError::SessionCreation(message)
                }
                other => other,
            })?;
        debug!("create operation started: {}", operation.name);

        let session = self.wait_until_active(&name, id.as_str()).await?;
        info!(
            "session was successfully created in {}s",
            started.elapsed().as_secs()
        );

        let endpoint = session
            .spark_connect_endpoint()
            .ok_or_else(|| SparkConnectError::EndpointMissing(name.clone()))?
            .to_string();

        let active = ActiveSession {
            id,
            name: name.clone(),
            uuid: session.uuid.clone(),
            endpoint,
        };

        if let Some(path) = self.config.active_session_file.as_deref() {
            let record = ActiveSessionRecord::new(active.name.as_str(), active.uuid.as_str());
            if let Err(e) = record.write(path) {
                error!(
                    "exception while writing active session to file {}: {e}",
                    path.display()
                );
            }
        }

        Ok(active)
    }

    async fn wait_until_active(&self, name: &str, id: &str) -> Result<ApiSession> {
        let started = Instant::now();
        loop {
            let session = self.controller.get_session(name).await?;
            match session.state() {
                super::SessionState::Active => return Ok(session),
                super::SessionState::Failed => {
                    return Err(SparkConnectError::SessionFailed(id.to_string()))
                }
                state => {
                    debug!("session {id} is {state}");
                    if started.elapsed() >= self.create_poll.timeout {
                        return Err(SparkConnectError::Timeout("session creation"));
                    }
                    tokio::time::sleep(self.create_poll.interval).await;
                }
            }
        }
    }

    /// Terminate `active` and clear the tracked state on success.
    ///
    /// Mirrors the service's termination semantics: NotFound means the
    /// session is already gone; Aborted and FailedPrecondition mean a
    /// concurrent create/terminate is still in flight and the TTL will
    /// clean up.
    async fn terminate_session(&self, active: &mut Option<ActiveSession>) -> Result<()> {
        let Some(current) = active.clone() else {
            return Ok(());
        };

        debug!("terminating session: {}", current.id);
        match self.controller.terminate_session(&current.name).await {
            Ok(()) => self.wait_until_terminated(&current).await?,
            Err(e) if e.is_api_status(ApiStatus::NotFound) => {
                debug!("{} session already deleted", current.id);
            }
            Err(e)
                if e.is_api_status(ApiStatus::FailedPrecondition)
                    || e.is_api_status(ApiStatus::Aborted) =>
            {
                debug!(
                    "{} session already terminated manually or automatically due to TTL",
                    current.id
                );
            }
            Err(e) => return Err(e),
        }

        if let Some(path) = self.config.active_session_file.as_deref() {
            if let Err(e) = ActiveSessionRecord::clear(path) {
                error!(
                    "exception while removing active session in file {}: {e}",
                    path.display()
                );
            }
        }
        *active = None;
        Ok(())
    }

    async fn wait_until_terminated(&self, current: &ActiveSession) -> Result<()> {
        let started = Instant::now();
        loop {
            let state = match self.controller.get_session(&current.name).await {
                Ok(session) => session.state(),
                Err(e) if e.is_api_status(ApiStatus::NotFound) => {
                    debug!("{} session already deleted", current.id);
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if state == super::SessionState::Failed {
                return Err(SparkConnectError::TerminationFailed(
                    current.id.to_string(),
                ));
            }
            if state.is_terminating_or_done() {
                return Ok(());
            }
            if started.elapsed() >= self.terminate_poll.timeout {
                return Err(SparkConnectError::Timeout("session termination"));
            }
            tokio::time::sleep(self.terminate_poll.interval).await;
        }
    }
}

#[async_trait]
impl SessionProbe for SessionManager {
    /// A tracked session counts as active while the service reports it
    /// usable; any lookup failure counts as inactive.
    async fn is_active(&self) -> bool {
        let Some(current) = self.active().await else {
            return false;
        };
        match self.controller.get_session(&current.name).await {
            Ok(session) => session.state().is_usable(),
            Err(e) => {
                warn!("{} session liveness check failed: {e}", current.id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_settings_defaults() {
        let create = PollSettings::creation();
        assert_eq!(create.interval, Duration::from_secs(5));
        assert_eq!(create.timeout, Duration::from_secs(600));

        let terminate = PollSettings::termination();
        assert_eq!(terminate.interval, Duration::from_secs(1));
    }
}
