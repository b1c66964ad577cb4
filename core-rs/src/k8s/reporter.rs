//! Pod annotation reporter
//!
//! Publishes the exported port variables as annotations on the current pod
//! with a single strategic-merge PATCH:
//!
//! ```text
//! PATCH http://{server}/api/v1/namespaces/{namespace}/pods/{name}
//! Content-Type: application/strategic-merge-patch+json
//!
//! {"metadata":{"annotations":{"AUTO_PORT0":"20134"}}}
//! ```

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{info, warn};

use crate::env::{RuntimeEnv, K8S_API_SERVER_ADDR, MY_POD_NAME, MY_POD_NAMESPACE};
use crate::errors::{PodinitError, Result};
use crate::port::PortEnv;

pub const STRATEGIC_MERGE_PATCH: &str = "application/strategic-merge-patch+json";

/// Strategic merge patch body touching only pod annotations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodPatch<'a> {
    pub metadata: PatchMetadata<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchMetadata<'a> {
    pub annotations: &'a PortEnv,
}

impl<'a> PodPatch<'a> {
    pub fn annotations(port_env: &'a PortEnv) -> Self {
        PodPatch {
            metadata: PatchMetadata {
                annotations: port_env,
            },
        }
    }
}

/// Namespace and name of the pod being annotated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodIdentity {
    pub namespace: Option<String>,
    pub name: Option<String>,
}

impl PodIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        PodIdentity {
            namespace: Some(namespace.into()),
            name: Some(name.into()),
        }
    }

    pub fn from_runtime_env(env: &RuntimeEnv) -> Self {
        PodIdentity {
            namespace: env.pod_namespace.clone(),
            name: env.pod_name.clone(),
        }
    }
}

/// PATCH target for a pod, failing when any part of the identity is missing
pub fn patch_url(server: &str, identity: &PodIdentity) -> Result<String> {
    let namespace = identity.namespace.as_deref().unwrap_or_default();
    let name = identity.name.as_deref().unwrap_or_default();

    let mut missing = Vec::new();
    if namespace.is_empty() {
        missing.push(MY_POD_NAMESPACE);
    }
    if name.is_empty() {
        missing.push(MY_POD_NAME);
    }
    if server.is_empty() {
        missing.push(K8S_API_SERVER_ADDR);
    }
    if !missing.is_empty() {
        return Err(PodinitError::Configuration(format!(
            "failed to build pod url, missing {} (namespace: {:?}, pod name: {:?}, api server: {:?})",
            missing.join(", "),
            namespace,
            name,
            server
        )));
    }

    Ok(format!(
        "http://{}/api/v1/namespaces/{}/pods/{}",
        server, namespace, name
    ))
}

/// Annotates the current pod with allocated ports
#[derive(Debug, Clone)]
pub struct ClusterReporter {
    client: reqwest::Client,
    identity: PodIdentity,
}

impl ClusterReporter {
    pub fn new(identity: PodIdentity) -> Self {
        Self::with_client(reqwest::Client::new(), identity)
    }

    pub fn with_client(client: reqwest::Client, identity: PodIdentity) -> Self {
        ClusterReporter { client, identity }
    }

    pub fn identity(&self) -> &PodIdentity {
        &self.identity
    }

    /// Send one PATCH with `port_env` as annotations
    ///
    /// No retry is attempted here.
    ///
    /// # Errors
    ///
    /// - [`PodinitError::Configuration`] if namespace, pod name or server is empty
    ///   (no request is sent)
    /// - [`PodinitError::ReportRejected`] on any status other than 200
    /// - [`PodinitError::ReportTransport`] if the request could not be completed
    pub async fn report(&self, server: &str, port_env: &PortEnv) -> Result<()> {
        let url = patch_url(server, &self.identity)?;
        let body = serde_json::to_vec(&PodPatch::annotations(port_env))?;

        let response = self
            .client
            .patch(&url)
            .header(CONTENT_TYPE, STRATEGIC_MERGE_PATCH)
            .body(body)
            .send()
            .await
            .map_err(|e| PodinitError::ReportTransport(format!("PATCH {}: {}", url, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url = %url, status = status.as_u16(), "Report port not ok");
            return Err(PodinitError::ReportRejected {
                status: status.as_u16(),
            });
        }

        info!(url = %url, annotations = port_env.len(), "Reported ports to control plane");
        Ok(())
    }
}
