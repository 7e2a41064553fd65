use clap::Parser;
use lineage_designator::cli;
use lineage_designator::commands;
use lineage_designator::commands::designate::DesignateOptions;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let result = match args.command {
        cli::Commands::Designate {
            tree,
            alignment,
            ancestral,
            metadata,
            output_file,
            summary,
            json,
            config,
            min_support,
            min_tips,
            coverage,
            max_depth,
        } => commands::designate::run(DesignateOptions {
            tree,
            alignment,
            ancestral,
            metadata,
            output_file,
            summary,
            json,
            config,
            min_support,
            min_tips,
            coverage,
            max_depth,
            quiet_progress: args.verbose,
        }),
        cli::Commands::InitConfig { force } => commands::init_config::run(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
