//! modsource CLI - Resolve Go package sources and import paths from go.mod files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modsource::{ModFile, Resolver, ResolverConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "modsource")]
#[command(version)]
#[command(about = "Locate Go package sources using go.mod", long_about = None)]
struct Cli {
    /// Read the standard-library and module-cache roots from a TOML file
    /// instead of GOROOT, GOMODCACHE and GOPATH
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the source directory of a package
    Source {
        /// Import path of the package, e.g. "github.com/pkg/errors"
        import_path: String,

        /// Directory whose go.mod is consulted
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Apply replace directives (one hop)
        #[arg(long)]
        replace: bool,
    },

    /// Print the import path of a directory or file
    ImportPath {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Print the go.mod governing a directory
    ModFile {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Emit the parsed manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the module root directory governing a path
    ModDir {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Source {
            import_path,
            dir,
            replace,
        } => {
            let resolver = Resolver::new(load_config(cli.config.as_deref())?);
            let source = resolver
                .source_dir(&import_path, &dir, replace)
                .with_context(|| format!("Failed to resolve {import_path}"))?;
            println!("{}", source.display());
        }

        Commands::ImportPath { path } => {
            let import_path = modsource::import_path(&path).with_context(|| {
                format!("Failed to compute import path of {}", path.display())
            })?;
            println!("{import_path}");
        }

        Commands::ModFile { path, json } => {
            let (manifest, file) =
                modsource::mod_file(&path).context("Failed to load go.mod")?;
            if json {
                let out = serde_json::json!({
                    "path": manifest.display().to_string(),
                    "file": file,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&out).context("Failed to serialize manifest")?
                );
            } else {
                println!("{}", manifest.display());
                print_summary(&file);
            }
        }

        Commands::ModDir { path } => {
            let dir = modsource::mod_dir(&path).context("Failed to locate go.mod")?;
            println!("{}", dir.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig> {
    match path {
        Some(path) => ResolverConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => ResolverConfig::from_env().context("Failed to configure from environment"),
    }
}

fn print_summary(file: &ModFile) {
    if let Some(module) = &file.module {
        println!("module {}", module.path);
        if let Some(message) = &module.deprecated {
            println!("  deprecated: {message}");
        }
    }
    if let Some(go) = &file.go {
        println!("go {go}");
    }
    if let Some(toolchain) = &file.toolchain {
        println!("toolchain {toolchain}");
    }
    for require in &file.require {
        let indirect = if require.indirect { " (indirect)" } else { "" };
        println!("require {} {}{indirect}", require.path, require.version);
    }
    for replace in &file.replace {
        let old = match &replace.old.version {
            Some(v) => format!("{} {v}", replace.old.path),
            None => replace.old.path.clone(),
        };
        let new = match &replace.new.version {
            Some(v) => format!("{} {v}", replace.new.path),
            None => replace.new.path.clone(),
        };
        println!("replace {old} => {new}");
    }
}
