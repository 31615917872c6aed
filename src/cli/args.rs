//! Command-line argument parsing

use crate::config::{DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS};
use crate::error::handlers::ValidationErrorHandler;
use crate::error::{Result, ToolkitError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "azure-toolkit")]
#[command(about = "Browse container registries and follow Spark batch jobs on HDInsight")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(long = "quiet", short = 'q', global = true, help = "Only print listings and job logs")]
    pub quiet: bool,

    /// Skip TLS verification
    #[arg(
        long = "skip-tls",
        short = 'k',
        global = true,
        help = "Skip TLS certificate verification (also SKIP_TLS=true)"
    )]
    pub skip_tls: bool,

    /// Timeout in seconds for network operations
    #[arg(
        long = "timeout",
        short = 't',
        global = true,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Timeout for each network request in seconds"
    )]
    pub timeout: u64,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Registry URL
    #[arg(
        long = "registry",
        short = 'r',
        help = "Registry URL, e.g. https://myacr.azurecr.io (or REGISTRY_ADDRESS)"
    )]
    pub registry: Option<String>,

    /// Registry username
    #[arg(
        long = "username",
        short = 'u',
        help = "Registry admin username (or REGISTRY_USERNAME)"
    )]
    pub username: Option<String>,

    /// Registry password
    #[arg(
        long = "password",
        short = 'p',
        help = "Registry admin password (or REGISTRY_PASSWORD)"
    )]
    pub password: Option<String>,

    /// Registry bearer token
    #[arg(
        long = "token",
        help = "Bearer token used when no username/password is given (or REGISTRY_TOKEN)"
    )]
    pub token: Option<String>,

    /// Page size
    #[arg(
        long = "page-size",
        short = 'n',
        default_value_t = DEFAULT_PAGE_SIZE,
        help = "Number of entries per page"
    )]
    pub page_size: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ClusterArgs {
    /// Cluster URL
    #[arg(
        long = "cluster",
        short = 'c',
        help = "Cluster URL, e.g. https://mycluster.azurehdinsight.net (or LIVY_URL)"
    )]
    pub cluster: Option<String>,

    /// Cluster username
    #[arg(
        long = "username",
        short = 'u',
        help = "Cluster login username (or LIVY_USERNAME)"
    )]
    pub username: Option<String>,

    /// Cluster password
    #[arg(
        long = "password",
        short = 'p',
        help = "Cluster login password (or LIVY_PASSWORD)"
    )]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List repositories in a registry
    Repos {
        #[command(flatten)]
        registry: RegistryArgs,

        #[arg(long = "pages", default_value_t = 1, help = "Number of pages to fetch")]
        pages: usize,
    },
    /// List tags of one repository
    Tags {
        #[command(flatten)]
        registry: RegistryArgs,

        #[arg(long = "repository", help = "Repository name, e.g. samples/nginx")]
        repository: String,

        #[arg(long = "pages", default_value_t = 1, help = "Number of pages to fetch")]
        pages: usize,
    },
    /// Page through repositories and tags interactively
    Browse {
        #[command(flatten)]
        registry: RegistryArgs,
    },
    /// Submit a Spark batch job and follow its log
    Submit {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[arg(long = "job", short = 'j', help = "JSON file with the Livy batch parameters")]
        job: PathBuf,

        #[arg(long = "no-tail", help = "Return right after submission")]
        no_tail: bool,
    },
    /// Follow the log of a running Spark batch job
    Tail {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[arg(long = "batch-id", short = 'b', help = "Livy batch id")]
        batch_id: i64,
    },
    /// Kill a Spark batch job
    Kill {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[arg(long = "batch-id", short = 'b', help = "Livy batch id")]
        batch_id: i64,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<()> {
        if self.verbose && self.quiet {
            return Err(ToolkitError::Validation(
                "--verbose and --quiet cannot be used together".to_string(),
            ));
        }

        ValidationErrorHandler::validate_timeout(self.timeout)?;

        match &self.command {
            Command::Repos { pages, .. } | Command::Tags { pages, .. } if *pages == 0 => Err(
                ToolkitError::Validation("--pages must be at least 1".to_string()),
            ),
            Command::Tags { repository, .. } if repository.trim().is_empty() => Err(
                ToolkitError::Validation("Repository name cannot be empty".to_string()),
            ),
            Command::Submit { job, .. } if !job.exists() => Err(ToolkitError::Validation(
                format!("Job file does not exist: {}", job.display()),
            )),
            Command::Tail { batch_id, .. } | Command::Kill { batch_id, .. } if *batch_id < 0 => {
                Err(ToolkitError::Validation(format!(
                    "Batch id must not be negative: {}",
                    batch_id
                )))
            }
            _ => Ok(()),
        }
    }
}
