//! HTTP client for the master's call endpoints.

use flotilla_core::ProcessId;
use flotilla_proto::{
    wire, DeactivateFrameworkMessage, Filters, FrameworkId, FrameworkInfo, KillTaskMessage,
    LaunchTasksMessage, OfferId, RegisterFrameworkMessage, TaskId, TaskInfo,
    UnregisterFrameworkMessage,
};
use prost::Message;
use reqwest::header::{CONNECTION, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};

/// Client for framework calls to the master.
///
/// Every call is an HTTP POST carrying a protobuf body; the master
/// acknowledges with `202 Accepted` and any other status is a
/// rejection.
#[derive(Debug, Clone)]
pub struct MasterClient {
    client: reqwest::Client,
    master: String,
}

impl MasterClient {
    /// Create a client for the master at `host:port`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(master: impl Into<String>, config: &DriverConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            master: master.into(),
        }
    }

    /// The master address this client talks to.
    #[must_use]
    pub fn master(&self) -> &str {
        &self.master
    }

    /// Announce `framework` to the master.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Transport`] if the call never reached the
    /// master and [`DriverError::Rejected`] if it answered with a
    /// status other than 202.
    pub async fn register_framework(
        &self,
        from: &ProcessId,
        framework: &FrameworkInfo,
    ) -> Result<()> {
        let message = RegisterFrameworkMessage {
            framework: framework.clone(),
        };
        self.send(from, wire::REGISTER_FRAMEWORK, message.encode_to_vec())
            .await
    }

    /// Remove the framework from the master.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Transport`] or [`DriverError::Rejected`]
    /// as for [`MasterClient::register_framework`].
    pub async fn unregister_framework(
        &self,
        from: &ProcessId,
        framework_id: &FrameworkId,
    ) -> Result<()> {
        let message = UnregisterFrameworkMessage {
            framework_id: framework_id.clone(),
        };
        self.send(from, wire::UNREGISTER_FRAMEWORK, message.encode_to_vec())
            .await
    }

    /// Tell the master to stop offering resources to the framework
    /// while leaving it registered.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Transport`] or [`DriverError::Rejected`]
    /// as for [`MasterClient::register_framework`].
    pub async fn deactivate_framework(
        &self,
        from: &ProcessId,
        framework_id: &FrameworkId,
    ) -> Result<()> {
        let message = DeactivateFrameworkMessage {
            framework_id: framework_id.clone(),
        };
        self.send(from, wire::DEACTIVATE_FRAMEWORK, message.encode_to_vec())
            .await
    }

    /// Ask the master to kill a running task.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Transport`] or [`DriverError::Rejected`]
    /// as for [`MasterClient::register_framework`].
    pub async fn kill_task(&self, from: &ProcessId, task_id: &TaskId) -> Result<()> {
        let message = KillTaskMessage {
            task_id: task_id.clone(),
        };
        self.send(from, wire::KILL_TASK, message.encode_to_vec())
            .await
    }

    /// Launch tasks on the resources of the given offers.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Transport`] or [`DriverError::Rejected`]
    /// as for [`MasterClient::register_framework`].
    pub async fn launch_tasks(
        &self,
        from: &ProcessId,
        framework_id: &FrameworkId,
        offer_ids: Vec<OfferId>,
        tasks: Vec<TaskInfo>,
        filters: Option<Filters>,
    ) -> Result<()> {
        let message = LaunchTasksMessage {
            framework_id: framework_id.clone(),
            offer_ids,
            tasks,
            filters,
        };
        self.send(from, wire::LAUNCH_TASKS, message.encode_to_vec())
            .await
    }

    async fn send(&self, from: &ProcessId, call: &'static str, body: Vec<u8>) -> Result<()> {
        let url = format!("http://{}{}", self.master, wire::master_call_path(call));

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, wire::CONTENT_TYPE_PROTOBUF)
            .header(CONNECTION, "Keep-Alive")
            .header(wire::LIBPROCESS_FROM, from.to_string())
            .body(body)
            .send()
            .await
            .map_err(|source| DriverError::Transport { call, source })?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            tracing::debug!(call, master = %self.master, "master accepted call");
            Ok(())
        } else {
            tracing::error!(call, %url, %status, "master rejected call");
            Err(DriverError::Rejected { url, status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::SequenceSource;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_pid() -> ProcessId {
        let source = SequenceSource::new();
        ProcessId::with_source(&source, wire::SCHEDULER_KIND, "127.0.0.1:9999")
    }

    #[tokio::test]
    async fn register_sends_protocol_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(wire::master_call_path(wire::REGISTER_FRAMEWORK)))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = MasterClient::new(server.address().to_string(), &DriverConfig::default());
        let framework = FrameworkInfo::new("test-user", "test-framework", None);
        client
            .register_framework(&test_pid(), &framework)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(
            request.headers.get(wire::LIBPROCESS_FROM).unwrap(),
            "scheduler(1)@127.0.0.1:9999"
        );
        assert_eq!(
            request.headers.get("Content-Type").unwrap(),
            wire::CONTENT_TYPE_PROTOBUF
        );

        let decoded = RegisterFrameworkMessage::decode(request.body.as_slice()).unwrap();
        assert_eq!(decoded.framework.name, "test-framework");
        assert_eq!(decoded.framework.user, "test-user");
    }

    #[tokio::test]
    async fn non_accepted_status_is_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = MasterClient::new(server.address().to_string(), &DriverConfig::default());
        let error = client
            .kill_task(&test_pid(), &TaskId::new("test-task-1"))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            DriverError::Rejected { status, .. } if status.as_u16() == 404
        ));
    }

    #[tokio::test]
    async fn unreachable_master_is_a_transport_error() {
        // Bind and drop a listener so the port is very likely closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = MasterClient::new(addr.to_string(), &DriverConfig::default());
        let error = client
            .kill_task(&test_pid(), &TaskId::new("test-task-1"))
            .await
            .unwrap_err();

        assert!(matches!(error, DriverError::Transport { call, .. } if call == wire::KILL_TASK));
    }
}
