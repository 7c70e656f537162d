use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relab_ast::Program;
use relab_instance::{ElaborationConfig, InstanceTree};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// relab - reactor program elaboration
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Elaborate a design and print or save the instance tree
    Elaborate {
        /// Design file (.toml or .json)
        design: PathBuf,

        /// Configuration file (defaults to a relab.toml near the design)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Elaborate a design and report only success or the first error
    Check {
        /// Design file (.toml or .json)
        design: PathBuf,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show one instance by qualified name
    Query {
        /// Design file (.toml or .json)
        design: PathBuf,

        /// Qualified instance name, e.g. Main.sensor
        name: String,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Elaborate {
            design,
            config,
            format,
            output,
        } => {
            let tree = elaborate_design(&design, config.as_deref())?;
            let rendered = match format.as_str() {
                "text" => tree.render(),
                "json" => serde_json::to_string_pretty(&tree)?,
                _ => anyhow::bail!("Unsupported format: {}. Use 'text' or 'json'", format),
            };
            match output {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("✅ Elaboration complete!");
                    println!("📄 Output: {:?}", path);
                }
                None => print!("{}", rendered),
            }
        }

        Commands::Check { design, config } => {
            let tree = elaborate_design(&design, config.as_deref())?;
            println!(
                "✅ {} elaborated: {} instances, {} timers",
                tree.root().reactor,
                tree.len(),
                tree.timers().count()
            );
        }

        Commands::Query {
            design,
            name,
            config,
        } => {
            let tree = elaborate_design(&design, config.as_deref())?;
            let instance = tree
                .find(&name)
                .with_context(|| format!("No instance named {}", name))?;
            println!("{}", serde_json::to_string_pretty(instance)?);
        }
    }

    Ok(())
}

fn elaborate_design(design: &Path, config: Option<&Path>) -> Result<InstanceTree> {
    info!("Loading design from {:?}", design);
    let program = Program::from_path(design)
        .with_context(|| format!("Failed to load design {:?}", design))?;

    let config = load_config(design, config)?;
    let tree = relab_instance::elaborate(&program, &config)
        .with_context(|| format!("Failed to elaborate {}", program.main))?;
    Ok(tree)
}

/// Explicit config wins; otherwise look for relab.toml near the design
fn load_config(design: &Path, explicit: Option<&Path>) -> Result<ElaborationConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(design),
    };

    match path {
        Some(path) => {
            info!("Using configuration {:?}", path);
            ElaborationConfig::from_path(&path)
                .with_context(|| format!("Failed to load configuration {:?}", path))
        }
        None => Ok(ElaborationConfig::default()),
    }
}

/// Search upward from the design for relab.toml, at most 3 levels
fn find_config(start_path: &Path) -> Option<PathBuf> {
    let mut current = start_path.to_path_buf();

    if current.is_file() {
        current = current.parent()?.to_path_buf();
    }

    for _ in 0..3 {
        let candidate = current.join("relab.toml");
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }

    None
}
