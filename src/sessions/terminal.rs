use super::SessionRequest;
use serde::{Deserialize, Serialize};

const DEFAULT_SHELL: &str = "sh";

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

/// Interactive shell in a pod container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalRequest {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    pub pod_name: String,
    pub pod_namespace: String,
    /// Empty selects the pod's default container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl TerminalRequest {
    pub fn new(cluster_id: &str, pod_namespace: &str, pod_name: &str) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            pod_name: pod_name.to_string(),
            pod_namespace: pod_namespace.to_string(),
            container: None,
            shell: default_shell(),
        }
    }
}

impl SessionRequest for TerminalRequest {
    fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    fn validate(&self) -> Result<(), String> {
        if self.pod_name.is_empty() {
            return Err("podName is required".to_string());
        }
        if self.shell.trim().is_empty() {
            return Err("shell must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_defaults_to_sh() {
        let request: TerminalRequest = serde_json::from_str(
            r#"{"clusterID":"dev","podName":"api-7d9","podNamespace":"default"}"#,
        )
        .unwrap();
        assert_eq!(request.shell, "sh");
        assert_eq!(request.container, None);
        assert_eq!(request, TerminalRequest::new("dev", "default", "api-7d9"));
    }
}
