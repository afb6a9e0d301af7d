use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use mitsuba_scene::generate;
use mitsuba_scene::settings::Settings;

#[derive(Parser)]
#[command(
    name = "mitsuba_scene",
    about = "Typed Mitsuba 3 scene descriptions from the plugin reference"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the plugin reference and write one Rust module per category
    Generate {
        /// Plugin reference overview page
        #[arg(long)]
        overview: Option<String>,
        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List plugin categories linked from the overview page
    Categories {
        /// Plugin reference overview page
        #[arg(long)]
        overview: Option<String>,
    },
    /// Print the parameter schemas of one category page as JSON
    Inspect {
        /// Category page URL
        url: String,
        /// Category name (default: derived from the URL)
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Generate { overview, out } => {
            if let Some(overview) = overview {
                settings.overview_url = overview;
            }
            if let Some(out) = out {
                settings.out_dir = out;
            }
            println!("Generating from {}...", settings.overview_url);
            let generation = generate::run(&settings).await?;
            let manifest = generate::write_output(&settings.out_dir, &generation)?;

            let classes: usize = manifest.categories.iter().map(|c| c.classes.len()).sum();
            println!(
                "Wrote {} types in {} categories to {}",
                classes,
                manifest.categories.len(),
                settings.out_dir.display()
            );
            for c in &manifest.categories {
                println!("  {:<24} {:>3}  {}.rs", c.name, c.classes.len(), c.module);
            }
            Ok(())
        }
        Commands::Categories { overview } => {
            if let Some(overview) = overview {
                settings.overview_url = overview;
            }
            let categories = generate::list_categories(&settings).await?;
            if categories.is_empty() {
                println!("No plugin categories found at {}", settings.overview_url);
                return Ok(());
            }
            for (name, url) in &categories {
                println!("{:<24} {}", name, url);
            }
            println!("\n{} categories", categories.len());
            Ok(())
        }
        Commands::Inspect { url, category } => {
            let schemas = generate::inspect(&settings, &url, category.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&schemas)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
