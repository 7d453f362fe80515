pub mod formatters;

use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".cluster-auth";

pub fn resolve_config_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir.map_or_else(
        || {
            let home_dir = home::home_dir().unwrap_or_else(env::temp_dir);
            home_dir.join(DEFAULT_CONFIG_DIR)
        },
        PathBuf::from,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = Path::new("/srv/cluster-auth");
        assert_eq!(resolve_config_dir(Some(dir)), dir);
        assert!(resolve_config_dir(None).ends_with(DEFAULT_CONFIG_DIR));
    }
}
