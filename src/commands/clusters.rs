use super::open_registry;
use crate::cmd::{FormatCommonArgs, OutputFormat};
use cluster_auth::utils::formatters::json::JsonFormatter;
use cluster_auth::utils::formatters::text::TextFormatter;
use cluster_auth::utils::formatters::TabularFormatter;
use cluster_auth::ClusterRecord;
use std::path::Path;
use thiserror::Error;

const JSON_HEADERS: [&str; 6] = ["current", "id", "name", "server", "provider", "namespace"];
const TEXT_HEADERS: [&str; 6] = ["", "Id", "Name", "Server", "Provider", "Namespace"];

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] cluster_auth::Error),

    #[error("error formatting cluster list using json output: {0}")]
    JsonFormatter(#[from] serde_json::Error),
}

fn row(record: ClusterRecord, current: Option<&str>) -> [String; 6] {
    let marker = if current == Some(record.id.as_str()) { "*" } else { "" };
    [
        marker.to_string(),
        record.id,
        record.name,
        record.url,
        record.auth_provider.kind().to_string(),
        record.namespace,
    ]
}

pub fn exec_list(config_dir: &Path, formatting: FormatCommonArgs) -> Result<(), Error> {
    let registry = open_registry(config_dir)?;
    let current = registry.current_cluster().map(|c| c.id);
    let rows: Vec<[String; 6]> = registry
        .list()
        .into_iter()
        .map(|record| row(record, current.as_deref()))
        .collect();
    let omit_fields = formatting.omit_fields.iter().map(|v| v.as_str()).collect();

    let output = match formatting.output {
        OutputFormat::Json => JsonFormatter::new(omit_fields, formatting.no_headers)
            .format(&JSON_HEADERS, rows)?,
        OutputFormat::Text => {
            let formatter = TextFormatter::new(omit_fields, formatting.no_headers, " | ");
            match formatter.format(&TEXT_HEADERS, rows) {
                Ok(output) => output,
                Err(never) => match never {},
            }
        }
    };
    println!("{output}");
    Ok(())
}

pub fn exec_use(config_dir: &Path, id: &str) -> Result<(), Error> {
    open_registry(config_dir)?.change_cluster(id)?;
    Ok(())
}

pub fn exec_namespace(config_dir: &Path, namespace: &str) -> Result<(), Error> {
    open_registry(config_dir)?.set_namespace(namespace)?;
    Ok(())
}

pub fn exec_delete(config_dir: &Path, id: &str) -> Result<(), Error> {
    let removed = open_registry(config_dir)?.delete(id)?;
    eprintln!("INFO: Deleted cluster {} ({})", removed.id, removed.url);
    Ok(())
}
