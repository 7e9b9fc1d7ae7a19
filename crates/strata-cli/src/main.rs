use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use strata_cache::{CacheStore, FileStore, MemoryStore};
use strata_config::Environment;
use strata_manifest::{Manifest, RebuildOptions};

#[derive(Parser)]
#[command(name = "strata", version, about = "Strata CLI (manifest build, type lookups, config)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the manifest for a module tree and print a summary
    Index(IndexArgs),
    /// Source path for a class or interface (case-insensitive)
    Lookup(QueryArgs),
    /// All transitive subtypes of a type
    Descendants(QueryArgs),
    /// Classes directly implementing an interface
    Implementors(QueryArgs),
    /// A resolved configuration value for the active environment
    Config(ConfigArgs),
    /// Manage the persistent cache
    Cache(CacheArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Module tree root (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
    /// Cache directory (defaults to `<path>/.strata-cache`)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Skip the persistent cache entirely
    #[arg(long)]
    no_cache: bool,
    /// Rebuild derived indexes even when cached
    #[arg(long)]
    force: bool,
    /// Also scan conventional test directories
    #[arg(long)]
    include_tests: bool,
}

#[derive(Args)]
struct IndexArgs {
    #[command(flatten)]
    build: BuildArgs,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// Qualified type name
    name: String,
    #[command(flatten)]
    build: BuildArgs,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ConfigArgs {
    /// Qualified type name
    name: String,
    /// Property to resolve
    property: String,
    #[command(flatten)]
    build: BuildArgs,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Drop every cached blob
    Clear,
}

#[derive(Serialize)]
struct IndexReport {
    root: PathBuf,
    modules: usize,
    classes: usize,
    interfaces: usize,
    fragments: usize,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Index(args) => {
            let manifest = open(&args.build)?;
            let report = IndexReport {
                root: args.build.path.clone(),
                modules: manifest.modules().len(),
                classes: manifest.type_index().classes.len(),
                interfaces: manifest.type_index().interfaces.len(),
                fragments: manifest.fragments().len(),
            };
            if args.json {
                print_json(&report)?;
            } else {
                println!(
                    "indexed {} modules: {} classes, {} interfaces, {} config fragments",
                    report.modules, report.classes, report.interfaces, report.fragments
                );
            }
            Ok(0)
        }
        Command::Lookup(args) => {
            let manifest = open(&args.build)?;
            match manifest.path_for_type(&args.name) {
                Some(path) => {
                    if args.json {
                        print_json(&serde_json::json!({ "path": path }))?;
                    } else {
                        println!("{}", path.display());
                    }
                    Ok(0)
                }
                None => {
                    not_found(&args.name, args.json)?;
                    Ok(1)
                }
            }
        }
        Command::Descendants(args) => {
            let manifest = open(&args.build)?;
            print_names(manifest.descendants_of(&args.name), args.json)?;
            Ok(0)
        }
        Command::Implementors(args) => {
            let manifest = open(&args.build)?;
            print_names(manifest.implementors_of(&args.name), args.json)?;
            Ok(0)
        }
        Command::Config(args) => {
            let mut manifest = open(&args.build)?;
            match manifest.config_value(&args.name, &args.property)? {
                Some(value) => {
                    if args.json {
                        print_json(&value)?;
                    } else {
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    Ok(0)
                }
                None => {
                    not_found(&format!("{}.{}", args.name, args.property), args.json)?;
                    Ok(1)
                }
            }
        }
        Command::Cache(args) => {
            match args.command {
                CacheCommand::Clear => {
                    let store = store_for(&args.build);
                    store.clear()?;
                    println!("cache: cleared");
                }
            }
            Ok(0)
        }
    }
}

fn store_for(args: &BuildArgs) -> Arc<dyn CacheStore> {
    if args.no_cache {
        return Arc::new(MemoryStore::new());
    }
    let dir = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| args.path.join(".strata-cache"));
    Arc::new(FileStore::new(dir))
}

fn open(args: &BuildArgs) -> Result<Manifest> {
    let manifest = Manifest::build(
        &args.path,
        store_for(args),
        Environment::from_process(),
        RebuildOptions {
            include_test_dirs: args.include_tests,
            force_regen: args.force,
            write_cache: !args.no_cache,
        },
    )?;
    Ok(manifest)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_names(names: &[String], json: bool) -> Result<()> {
    if json {
        print_json(&names)?;
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}

fn not_found(what: &str, json: bool) -> Result<()> {
    if json {
        print_json(&serde_json::json!({ "found": false }))?;
    } else {
        eprintln!("not found: {what}");
    }
    Ok(())
}
