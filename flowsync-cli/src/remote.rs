//! HTTP implementation of [`WorkspaceService`] on a blocking `ureq` agent.
//!
//! Calls run on tokio's blocking pool. Endpoints, relative to the base URL:
//!
//! ```text
//! GET  /api/version
//! GET  /api/w/{ws}/workspaces/tarball?archive_type=zip&...
//! POST /api/w/{ws}/scripts/create
//! POST /api/w/{ws}/scripts/delete/p/{path}
//! POST /api/w/{ws}/{kind}/update/{path}   (falls back to {kind}/create on 404)
//! DELETE /api/w/{ws}/{kind}/delete/{path}
//! ```

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use flowsync_core::{ArtifactKind, Skips, WorkspaceId};
use flowsync_sync::{Deletion, ServiceError, Upsert, WorkspaceService};

const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct HttpService {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

/// Route segment for a kind's object endpoints.
fn route(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Script => "scripts",
        ArtifactKind::Flow => "flows",
        ArtifactKind::App => "apps",
        ArtifactKind::Folder => "folders",
        ArtifactKind::Resource => "resources",
        ArtifactKind::ResourceType => "resources/type",
        ArtifactKind::Variable => "variables",
        ArtifactKind::Schedule => "schedules",
    }
}

fn service_err(endpoint: &str, err: ureq::Error) -> ServiceError {
    match err {
        ureq::Error::Status(404, _) => ServiceError::NotFound(endpoint.to_string()),
        ureq::Error::Status(code, response) => ServiceError::Request {
            endpoint: endpoint.to_string(),
            message: format!("HTTP {code}: {}", response.into_string().unwrap_or_default()),
        },
        ureq::Error::Transport(transport) => ServiceError::Request {
            endpoint: endpoint.to_string(),
            message: transport.to_string(),
        },
    }
}

fn io_failure(endpoint: &str, err: impl ToString) -> ServiceError {
    ServiceError::Request {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

impl HttpService {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(TIMEOUT).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: &str, endpoint: &str) -> ureq::Request {
        let request = self.agent.request(method, &format!("{}{endpoint}", self.base_url));
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    /// Run `call` on the blocking pool with a clone of this service.
    async fn blocking<T, F>(&self, endpoint: String, call: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&HttpService, &str) -> Result<T, ServiceError> + Send + 'static,
    {
        let service = self.clone();
        let label = endpoint.clone();
        tokio::task::spawn_blocking(move || call(&service, &endpoint))
            .await
            .map_err(|e| io_failure(&label, e))?
    }

    fn post_json(&self, endpoint: &str, payload: &JsonValue) -> Result<(), ServiceError> {
        debug!(%endpoint, "POST");
        self.request("POST", endpoint)
            .send_json(payload)
            .map(drop)
            .map_err(|e| service_err(endpoint, e))
    }
}

#[async_trait]
impl WorkspaceService for HttpService {
    async fn version(&self) -> Result<String, ServiceError> {
        self.blocking("/api/version".to_string(), |service, endpoint| {
            let response = service
                .request("GET", endpoint)
                .call()
                .map_err(|e| service_err(endpoint, e))?;
            let text = response.into_string().map_err(|e| io_failure(endpoint, e))?;
            Ok(text.trim().to_string())
        })
        .await
    }

    async fn download_archive(
        &self,
        workspace: &WorkspaceId,
        skips: &Skips,
    ) -> Result<Option<Vec<u8>>, ServiceError> {
        let endpoint = format!("/api/w/{workspace}/workspaces/tarball");
        let skips = *skips;
        self.blocking(endpoint, move |service, endpoint| {
            let flag = |on: bool| if on { "true" } else { "false" };
            let response = service
                .request("GET", endpoint)
                .query("archive_type", "zip")
                .query("plain_secret", "false")
                .query("skip_variables", flag(skips.skip_variables))
                .query("skip_secrets", flag(skips.skip_secrets))
                .query("skip_resources", flag(skips.skip_resources))
                .query("include_schedules", flag(skips.include_schedules))
                .call()
                .map_err(|e| service_err(endpoint, e))?;

            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| io_failure(endpoint, e))?;
            debug!(bytes = bytes.len(), "downloaded workspace archive");
            Ok((!bytes.is_empty()).then_some(bytes))
        })
        .await
    }

    async fn upsert(&self, workspace: &WorkspaceId, upsert: &Upsert) -> Result<(), ServiceError> {
        let prefix = format!("/api/w/{workspace}/{}", route(upsert.kind));
        let kind = upsert.kind;
        let path = upsert.path.clone();
        let payload = upsert.payload.clone();

        self.blocking(prefix.clone(), move |service, prefix| {
            if kind == ArtifactKind::Script {
                return service.post_json(&format!("{prefix}/create"), &payload);
            }
            match service.post_json(&format!("{prefix}/update/{path}"), &payload) {
                Err(ServiceError::NotFound(_)) => service.post_json(&format!("{prefix}/create"), &payload),
                other => other,
            }
        })
        .await
    }

    async fn delete(&self, workspace: &WorkspaceId, deletion: &Deletion) -> Result<(), ServiceError> {
        let (method, endpoint) = match deletion.kind {
            ArtifactKind::Script => ("POST", format!("/api/w/{workspace}/scripts/delete/p/{}", deletion.path)),
            kind => (
                "DELETE",
                format!("/api/w/{workspace}/{}/delete/{}", route(kind), deletion.path),
            ),
        };
        self.blocking(endpoint, move |service, endpoint| {
            debug!(%endpoint, method, "delete");
            service
                .request(method, endpoint)
                .call()
                .map(drop)
                .map_err(|e| service_err(endpoint, e))
        })
        .await
    }
}
