use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use appflow_core::DriverRegistry;
use appflow_driver_script::ScriptDriver;

mod meta;
mod styles;
mod ui;

use meta::Meta;

/// The command-line interface for Appflow.
#[derive(Debug, Parser)]
#[command(name = "appflow")]
#[command(version)]
#[command(styles = styles::get_clap_styles())]
#[command(about = "Application lifecycle automation")]
#[command(
    long_about = "Appflow drives applications through a uniform lifecycle: compile
materializes build templates, build runs the provisioning tool against
ready infrastructure, dev brings up an interactive development
environment, and dev-dep builds another application for use inside
this one's environment."
)]
struct Cli {
    /// Path to the Appfile, or a directory containing Appfile.toml.
    #[arg(long, default_value = ".")]
    appfile: String,
    /// Output directory (defaults to .appflow beside the Appfile).
    #[arg(long)]
    output: Option<String>,
    /// Root of the template asset trees.
    #[arg(long)]
    assets: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Materialize build and environment templates.
    Compile,
    /// Build the application against ready infrastructure.
    Build,
    /// Start an interactive development environment.
    Dev,
    /// Build a dependency application for this one's dev environment.
    DevDep {
        /// Path to the dependency application (file or directory).
        #[arg(long)]
        source: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    debug!("parsed cli arguments: {:?}", cli);

    let meta = Meta::load(&cli.appfile, cli.output.as_deref(), cli.assets.as_deref())?;

    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(ScriptDriver::new(meta.asset_root.clone())));

    let ctx = meta.app_context()?;

    match &cli.command {
        Commands::Compile => {
            let driver = registry.get_required(&ctx.appfile.application.kind)?;
            let result = driver.compile(&ctx)?;
            println!(
                "Compiled '{}' into {}",
                ctx.appfile.application.name,
                ctx.dir.display()
            );
            debug!("dev-dep fragment at {:?}", result.dev_dep_fragment_path);
            Ok(())
        }
        Commands::Build => {
            let driver = registry.get_required(&ctx.appfile.application.kind)?;
            driver.build(&ctx)?;
            println!("Build complete: {}", ctx.appfile.application.name);
            Ok(())
        }
        Commands::Dev => {
            let driver = registry.get_required(&ctx.appfile.application.kind)?;
            driver.dev(&ctx)?;
            Ok(())
        }
        Commands::DevDep { source } => {
            let src = meta.source_context(source)?;
            // The dependency is built by its own driver, not the
            // destination application's.
            let driver = registry.get_required(&src.appfile.application.kind)?;
            let dev_dep = driver.dev_dep(&ctx, &src)?;
            for file in &dev_dep.files {
                println!("{file}");
            }
            Ok(())
        }
    }
}
