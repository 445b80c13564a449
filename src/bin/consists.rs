use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use railbrake::consist::{
    ContentFolders, PreferenceKey, all_consist_files, forward_list, lead_choices, load_consist,
    resolve_consist_file, reverse_list,
};
use railbrake::scenario::parse_preference;

/// Inspect consists in a content tree.
#[derive(Parser, Debug)]
#[command(author, version, about = "Consist listing and resolution")]
struct Cli {
    /// Content root holding `trains/consists` and `trains/trainset`
    #[arg(long)]
    content: PathBuf,

    /// Extra content folder as NAME=PATH (repeatable)
    #[arg(long = "folder", value_parser = parse_folder)]
    folders: Vec<(String, PathBuf)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every consist file, native files shadowing legacy ones
    List,
    /// Resolve a consist into its vehicles
    Resolve {
        /// Consist name without extension
        name: String,
        /// Preferred lead locomotive below `trains/trainset`, or `none`
        #[arg(long)]
        prefer: Option<String>,
        /// Resolve the consist tail first
        #[arg(long, default_value_t = false)]
        reverse: bool,
        /// Seed for random slots
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Print the locomotives a consist can be led by
    Choices {
        name: String,
        #[arg(long, default_value_t = false)]
        reverse: bool,
    },
}

fn parse_folder(value: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{value}'"))?;
    if name.is_empty() {
        return Err("folder name must not be empty".to_string());
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let folders: ContentFolders = cli.folders.into_iter().collect();

    match cli.command {
        Command::List => {
            let dir = cli.content.join("trains").join("consists");
            for path in all_consist_files(&dir)? {
                println!("{}", path.display());
            }
        }
        Command::Resolve {
            name,
            prefer,
            reverse,
            seed,
        } => {
            let path = resolve_consist_file(&cli.content, &name);
            let consist =
                load_consist(&path).with_context(|| format!("loading {}", path.display()))?;
            let preference = prefer
                .as_deref()
                .map(|value| parse_preference(&cli.content, value));
            let resolve = if reverse { reverse_list } else { forward_list };
            let vehicles = resolve(&consist, &cli.content, &folders, preference.as_ref(), seed)?;
            if vehicles.is_empty() && preference.is_some() {
                bail!(
                    "consist '{}' cannot be led by {}",
                    consist.display_name,
                    prefer.unwrap_or_default()
                );
            }
            for vehicle in vehicles {
                println!(
                    "{}\t{}\t{}",
                    vehicle.uid,
                    if vehicle.flipped { "flipped" } else { "forward" },
                    vehicle.path.display()
                );
            }
        }
        Command::Choices { name, reverse } => {
            let path = resolve_consist_file(&cli.content, &name);
            let consist =
                load_consist(&path).with_context(|| format!("loading {}", path.display()))?;
            for choice in lead_choices(&consist, &cli.content, &folders, reverse)? {
                match choice {
                    PreferenceKey::NoLocomotive => println!("none"),
                    PreferenceKey::Locomotive(path) => println!("{}", path.display()),
                }
            }
        }
    }
    Ok(())
}
