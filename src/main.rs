//! FOMOD Wizard - Main entry point
//!
//! Headless front end over the wizard engine: validate and convert
//! descriptors, print default selections and full evaluation reports.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use fomod_wizard::cli::{Cli, Commands};
use fomod_wizard::{InstallerDescriptor, InstalledFiles, Selections, WizardSession};

/// Initialize the logger; `RUST_LOG` overrides the `info` default
fn init_logger() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Main application entry point
fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { descriptor } => {
            info!("Validating descriptor: {:?}", descriptor);
            match InstallerDescriptor::load_from_file(&descriptor) {
                Ok(desc) => {
                    let groups: usize = desc.steps.iter().map(|s| s.groups.len()).sum();
                    let plugins: usize = desc
                        .steps
                        .iter()
                        .flat_map(|s| &s.groups)
                        .map(|g| g.plugins.len())
                        .sum();
                    println!(
                        "✓ Descriptor '{}' is valid: {} steps, {} groups, {} plugins, {} conditional installs",
                        desc.module_name,
                        desc.total_steps(),
                        groups,
                        plugins,
                        desc.conditional_file_installs.len()
                    );
                }
                Err(e) => {
                    error!("Descriptor validation failed: {:#}", e);
                    eprintln!("✗ Descriptor validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Convert {
            module_config,
            output,
        } => {
            info!("Converting module config: {:?}", module_config);
            let bytes = std::fs::read(&module_config)
                .with_context(|| format!("Failed to read module config from {:?}", module_config))?;
            match fomod_wizard::parse_module_config(&bytes) {
                Ok(desc) => write_or_print(&desc.to_json_pretty()?, output.as_deref())?,
                Err(e) => {
                    error!("Conversion failed: {}", e);
                    eprintln!("✗ Failed to convert {:?}: {}", module_config, e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Defaults { descriptor, output } => {
            let desc = load_or_exit(&descriptor);
            let selections = fomod_wizard::initialize_defaults(&desc);
            write_or_print(&selections.to_json_pretty()?, output.as_deref())?;
        }
        Commands::Inspect {
            descriptor,
            selections,
        } => {
            let desc = Arc::new(load_or_exit(&descriptor));
            let mut session = match selections {
                Some(path) => {
                    let saved = Selections::load_from_file(&path)?;
                    for entry in saved.stale_entries(&desc) {
                        warn!(
                            "Stale selection: step {} group {} plugin {}",
                            entry.step, entry.group, entry.plugin
                        );
                    }
                    WizardSession::with_selections(desc, saved)
                }
                None => WizardSession::new(desc),
            };
            if let Some(path) = &cli.installed_files {
                let files = InstalledFiles::load_from_file(path)?;
                info!("Loaded {} installed files from {:?}", files.len(), path);
                session = session.with_installed_files(files);
            }

            let report = session.report();
            info!(
                "Evaluated '{}': {} flags, {} visible steps, complete: {}",
                report.module_name,
                report.flags.len(),
                report.visible_steps.len(),
                report.complete
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Load a descriptor or exit with a message
fn load_or_exit(path: &Path) -> InstallerDescriptor {
    match InstallerDescriptor::load_from_file(path) {
        Ok(desc) => desc,
        Err(e) => {
            error!("Failed to load descriptor: {:#}", e);
            eprintln!("✗ Failed to load descriptor: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn write_or_print(json: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write output to {:?}", path))?;
            println!("✓ Wrote {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
