//! qrvmc - inspect and run QRVMC virtual machine modules.

mod host;
mod info;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qrvmc_bridge::{LibraryResolver, ResolverConfig, ResourceDir};

#[derive(Parser)]
#[command(name = "qrvmc")]
#[command(about = "Inspect and run QRVMC virtual machine modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Logical name of the connector binding library
    #[arg(long, global = true)]
    library_name: Option<String>,

    /// Directory holding bundled connector binaries
    #[arg(long, global = true)]
    resource_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a VM and print its identity, ABI version and capabilities
    Info {
        /// VM configuration: <selector>[,<name>[=<value>]]*
        config: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute code once against an in-memory host
    Run {
        /// VM configuration: <selector>[,<name>[=<value>]]*
        config: String,

        /// Code to execute, hex encoded
        code: String,

        /// Call input, hex encoded
        #[arg(long, default_value = "")]
        input: String,

        /// Gas limit
        #[arg(long, default_value_t = run::DEFAULT_GAS)]
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        gas: i64,

        /// Revision number (defaults to the latest stable revision)
        #[arg(long)]
        rev: Option<i32>,

        /// Treat the code as init code and run the deployed code afterwards
        #[arg(long)]
        create: bool,

        /// Repeat the final execution and report the average time
        #[arg(long)]
        bench: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ResolverConfig::from_env();
    if let Some(name) = cli.library_name {
        config = config.with_library_name(name);
    }
    if let Some(dir) = cli.resource_dir {
        config = config.with_resources(ResourceDir::new(dir));
    }
    let resolver = LibraryResolver::with_config(config);

    match cli.command {
        Commands::Info { config, json } => info::execute(&resolver, &config, json)?,

        Commands::Run {
            config,
            code,
            input,
            gas,
            rev,
            create,
            bench,
        } => {
            let options = run::RunOptions {
                code: run::decode_hex("code", &code)?,
                input: run::decode_hex("input", &input)?,
                gas,
                revision: rev,
                create,
                bench,
            };
            run::execute(&resolver, &config, &options)?;
        }
    }

    Ok(())
}
