use clap::{Parser, Subcommand};

mod commands;
use commands::check::CheckArgs;

#[derive(Parser)]
#[command(name = "upgradeguard")]
#[command(about = "Upgrade-safety analysis for EVM proxy contracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose engine logging (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze whether an implementation upgrade is safe to apply.
    Check(CheckArgs),

    /// List the analyzers the engine runs, in report order.
    Analyzers,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Check(args) => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    eprintln!("failed to start runtime: {e}");
                    std::process::exit(12);
                }
            };
            runtime.block_on(commands::check::execute(args))
        }
        Commands::Analyzers => commands::list_analyzers(),
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
