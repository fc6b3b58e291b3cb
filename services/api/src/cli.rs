use crate::commands::{create_admin, seed, CreateAdminArgs, SeedArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use iniastra::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "iniastra-api",
    about = "University catalog and application review API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Load universities from a CSV file into the configured database
    Seed(SeedArgs),
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve from a process-local store seeded with the bundled catalog instead of MongoDB
    #[arg(long)]
    pub(crate) in_memory: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed(args) => seed(args).await,
        Command::CreateAdmin(args) => create_admin(args).await,
    }
}
