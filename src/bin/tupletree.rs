//! Tuple-tree schema compiler CLI
//!
//! Validates schema descriptions, generates code for the configured targets
//! and checks generated files for drift.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tupletree_codegen::codegen::{generate, GeneratedOutput, Language};
use tupletree_codegen::config::TupleTreeConfig;
use tupletree_codegen::model::TypeDefinition;
use tupletree_codegen::output::{check_output, write_output, Drift, Manifest};
use tupletree_codegen::Schema;

#[derive(Parser)]
#[command(name = "tupletree")]
#[command(about = "Compile tuple-tree schemas into typed data models")]
struct Cli {
    /// Configuration file (in addition to the default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a schema and report what it contains
    Validate {
        /// Schema description (YAML, or JSON with a .json extension)
        schema: PathBuf,
    },

    /// Generate code and write it to the output directory
    Generate {
        schema: PathBuf,
        /// Target language (repeatable; defaults to the configured targets)
        #[arg(short, long = "target", value_enum)]
        targets: Vec<Language>,
        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Compare generated code with the files on disk
    Check {
        schema: PathBuf,
        #[arg(short, long = "target", value_enum)]
        targets: Vec<Language>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the normalised schema description as JSON
    Dump { schema: PathBuf },

    /// Inspect or create the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default tupletree.toml
    Init {
        #[arg(default_value = "tupletree.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "tupletree_codegen=debug,tupletree=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found a problem
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = TupleTreeConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Validate { schema } => {
            let schema = load_schema(&schema)?;
            let stats = schema.stats();
            println!("✅ {} is valid", schema.namespace());
            println!("   {} struct(s) ({} abstract)", stats.structs, stats.abstract_structs);
            println!("   {} field(s)", stats.fields);
            println!("   {} enum(s), {} member(s)", stats.enums, stats.enum_members);
            if let Some(root) = schema.root_type() {
                println!("   root type: {}", schema[root].name());
            }
            Ok(true)
        }

        Commands::Generate { schema, targets, out } => {
            let schema = load_schema(&schema)?;
            let dir = out.unwrap_or_else(|| config.codegen.output_dir.clone());
            let outputs = generate_targets(&schema, &config, &targets)?;

            let manifest = write_output(&dir, &outputs, config.codegen.write_manifest)
                .with_context(|| format!("writing output to {}", dir.display()))?;

            for output in &outputs {
                for file in &output.files {
                    println!(
                        "✅ {} ({} types) -> {}",
                        output.language,
                        output.type_count,
                        dir.join(&file.path).display()
                    );
                }
            }
            if config.codegen.write_manifest {
                println!("   manifest: {} file(s)", manifest.files.len());
            }
            Ok(true)
        }

        Commands::Check { schema, targets, out } => {
            let schema = load_schema(&schema)?;
            let dir = out.unwrap_or_else(|| config.codegen.output_dir.clone());
            let outputs = generate_targets(&schema, &config, &targets)?;

            let drifted = check_output(&dir, &outputs)
                .with_context(|| format!("reading output in {}", dir.display()))?;

            if let Some(manifest) = Manifest::load(&dir)? {
                for path in manifest.modified_files(&dir)? {
                    println!("⚠️  {} differs from its manifest checksum", path);
                }
            }

            if drifted.is_empty() {
                println!("✅ Generated code is up to date");
                return Ok(true);
            }

            for (path, drift) in &drifted {
                match drift {
                    Drift::Missing => println!("❌ {} is missing", path.display()),
                    Drift::Changed { diff } => {
                        println!("❌ {} is out of date", path.display());
                        print!("{}", diff);
                    }
                }
            }
            println!();
            println!("❌ {} file(s) drifted; run `tupletree generate`", drifted.len());
            Ok(false)
        }

        Commands::Dump { schema } => {
            let schema = load_schema(&schema)?;
            println!("{}", serde_json::to_string_pretty(&schema.to_description())?);
            Ok(true)
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(true)
            }
            ConfigAction::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                TupleTreeConfig::default()
                    .save(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("✅ Wrote {}", path.display());
                Ok(true)
            }
        },
    }
}

fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    Schema::load(path).with_context(|| format!("loading schema {}", path.display()))
}

fn generate_targets(
    schema: &Schema,
    config: &TupleTreeConfig,
    targets: &[Language],
) -> anyhow::Result<Vec<GeneratedOutput>> {
    config
        .profiles(targets)
        .iter()
        .map(|profile| {
            generate(schema, profile).with_context(|| format!("generating {} code", profile.language))
        })
        .collect()
}
