use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "passvault", version, about = "Local encrypted password vault")]
pub struct Cli {
    #[command(flatten)]
    pub login: Login,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct Login {
    /// Vault owner.
    #[arg(long, short, env = "PASSVAULT_USER")]
    pub user: String,

    /// Master password.
    #[arg(long, short, env = "PASSVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct ServiceArgs {
    pub name: String,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub secret: String,
    #[arg(long, default_value = "")]
    pub note: String,
    /// Repeat for several tags.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the user given by --user / --password.
    Register,
    Add(ServiceArgs),
    Update {
        /// Current name of the service.
        original: String,
        #[command(flatten)]
        service: ServiceArgs,
    },
    Show {
        name: String,
    },
    /// Fuzzy search on service name and username. No pattern lists everything.
    Search {
        #[arg(default_value = "")]
        pattern: String,
        #[arg(long)]
        tag: Option<String>,
    },
    Delete {
        name: String,
    },
    Tags {
        /// Also drop tags no service uses.
        #[arg(long)]
        prune: bool,
    },
    History {
        name: Option<String>,
    },
}
