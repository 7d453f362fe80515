use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const ARG_SHORT_CONFIG_DIR: char = 'C';

/// Credential management for Kubernetes clusters behind kubeconfig, AWS,
/// Azure, Google and OIDC authentication
#[derive(Parser)]
#[command(about, version)]
pub struct Cli {
    /// Directory holding `config.json` and `settings.json`.
    /// If not provided, `$HOME/.cluster-auth` is used.
    #[arg(short = ARG_SHORT_CONFIG_DIR, long, global = true, env = "CLUSTER_AUTH_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log refresh and persistence activity to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// JSON formatted output
    Json,
    /// Plain text formatted output
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

#[derive(Args)]
pub struct FormatCommonArgs {
    /// Format for the output list
    #[arg(short = 'F', long, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
    /// Flag to omit headers in the output
    #[arg(short = 'H', long, default_value_t = false)]
    pub no_headers: bool,
    /// Fields to omit from the output
    #[arg(short = 'O', long, value_delimiter = ',')]
    pub omit_fields: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// The `Import` subcommand adds every context of a kubeconfig file as a cluster.
    /// Contexts referencing an undefined cluster or user are reported and skipped.
    /// A context whose name is already registered replaces that cluster.
    Import {
        /// Path to the kubeconfig file
        path: PathBuf,
        /// Make the first imported cluster the current one
        #[arg(short, long, default_value_t = false)]
        select: bool,
    },

    /// The `List` subcommand lists registered clusters. The current cluster is marked.
    List {
        /// Optional formatting arguments for the output
        #[clap(flatten)]
        formatting: FormatCommonArgs,
    },

    /// The `Use` subcommand selects the current cluster.
    Use {
        /// Id of the cluster to select
        id: String,
    },

    /// The `Namespace` subcommand sets the default namespace of the current cluster.
    Namespace {
        /// Namespace to use by default
        namespace: String,
    },

    /// The `Delete` subcommand removes a cluster.
    Delete {
        /// Id of the cluster to delete
        id: String,
    },

    /// The `Credentials` subcommand prints a Kubernetes `ExecCredential` for a cluster,
    /// refreshing it with its identity provider when needed.
    /// Suitable as a kubectl exec credential plugin.
    Credentials {
        /// Id of the cluster. Defaults to the current cluster.
        id: Option<String>,
    },

    /// The `Export` subcommand prints a kubeconfig for the given clusters,
    /// or for all clusters when none are given.
    Export {
        /// Ids of the clusters to export
        ids: Vec<String>,
    },
}
