use crate::demo::{run_demo, DemoArgs};
use crate::maintenance::{run_export, run_sync_backlog, ExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use member_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Membership Intake Service",
    about = "Run the membership application intake service and its maintenance commands",
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
    /// Walk a scripted intake and review session against in-memory infrastructure
    Demo(DemoArgs),
    /// Export every stored application as CSV
    Export(ExportArgs),
    /// Re-push approved applications that never reached the knowledge base
    SyncBacklog,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Export(args) => run_export(args),
        Command::SyncBacklog => run_sync_backlog().await,
    }
}
