use super::SessionRequest;
use serde::{Deserialize, Serialize};

/// Forward of a local TCP port to a pod port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortForwardRequest {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    pub pod_name: String,
    pub pod_namespace: String,
    pub pod_port: u16,
    /// `0` lets the transport pick a free port.
    #[serde(default)]
    pub local_port: u16,
}

impl SessionRequest for PortForwardRequest {
    fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    fn validate(&self) -> Result<(), String> {
        if self.pod_name.is_empty() {
            return Err("podName is required".to_string());
        }
        if self.pod_port == 0 {
            return Err(format!("pod {}: podPort must not be 0", self.pod_name));
        }
        Ok(())
    }
}
