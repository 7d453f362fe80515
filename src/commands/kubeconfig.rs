use super::open_registry;
use cluster_auth::kubeconfig::{self, KubeconfigDocument};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Kubeconfig(#[from] kubeconfig::Error),

    #[error(transparent)]
    Registry(#[from] cluster_auth::Error),

    #[error("no valid context found in {0:?}")]
    NothingImported(std::path::PathBuf),
}

pub fn exec_import(config_dir: &Path, path: &Path, select: bool) -> Result<(), Error> {
    let document = KubeconfigDocument::load(path)?;
    let outcome = kubeconfig::import(&document);
    for err in &outcome.errors {
        eprintln!("WARN: {err}");
    }
    if outcome.records.is_empty() {
        return Err(Error::NothingImported(path.to_path_buf()));
    }

    let registry = open_registry(config_dir)?;
    let first = outcome.records[0].id.clone();
    let ids: Vec<_> = outcome.records.iter().map(|r| r.id.clone()).collect();
    registry.add(outcome.records)?;
    if select {
        registry.change_cluster(&first)?;
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

pub fn exec_export(config_dir: &Path, ids: &[String]) -> Result<(), Error> {
    let registry = open_registry(config_dir)?;
    let records = if ids.is_empty() {
        registry.list()
    } else {
        ids.iter()
            .map(|id| registry.get(id))
            .collect::<Result<Vec<_>, _>>()?
    };
    print!("{}", kubeconfig::export(&records).to_yaml()?);
    Ok(())
}
