use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use url::Url;

use crate::codegen;
use crate::discover;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::html::Element;
use crate::parser::{self, schema::PluginSchema};
use crate::runtime;
use crate::settings::Settings;

/// One fetched category page.
#[derive(Debug)]
pub struct CategoryPage {
    pub category: String,
    pub url: Url,
    pub document: Element,
}

/// Synthesized source for one category.
#[derive(Debug, Clone)]
pub struct GeneratedModule {
    pub category: String,
    pub module: String,
    pub url: String,
    pub schemas: Vec<PluginSchema>,
    pub classes: Vec<String>,
    pub source: String,
}

/// Result of a full generation run, ready to be written.
#[derive(Debug)]
pub struct Generation {
    pub overview_url: String,
    pub modules: BTreeMap<String, GeneratedModule>,
}

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub overview_url: String,
    pub generated_at: DateTime<Utc>,
    pub categories: Vec<ManifestCategory>,
}

#[derive(Debug, Serialize)]
pub struct ManifestCategory {
    pub name: String,
    pub url: String,
    pub module: String,
    pub classes: Vec<String>,
    pub plugins: Vec<String>,
}

/// Parse and synthesize one category page. No I/O.
pub fn synthesize_category(category: &str, url: &str, document: &Element) -> GeneratedModule {
    let schemas = parser::process_page(category, url, document);
    let rendered = codegen::render_module(category, url, &schemas);
    GeneratedModule {
        category: category.to_string(),
        module: codegen::module_name(category),
        url: url.to_string(),
        schemas,
        classes: rendered.classes,
        source: rendered.source,
    }
}

/// Synthesize every page in parallel, keyed by category name. Module names
/// that collide get a numeric suffix in category order.
pub fn synthesize_all(pages: &[CategoryPage]) -> BTreeMap<String, GeneratedModule> {
    let results: Vec<GeneratedModule> = pages
        .par_iter()
        .map(|p| synthesize_category(&p.category, p.url.as_str(), &p.document))
        .collect();

    let mut modules: BTreeMap<String, GeneratedModule> = results
        .into_iter()
        .map(|m| (m.category.clone(), m))
        .collect();

    let mut used = HashSet::new();
    for module in modules.values_mut() {
        if used.insert(module.module.clone()) {
            continue;
        }
        let base = module.module.clone();
        let mut n = 2;
        while used.contains(&format!("{}_{}", base, n)) {
            n += 1;
        }
        module.module = format!("{}_{}", base, n);
        warn!("{}: module name {} taken, using {}", module.category, base, module.module);
        used.insert(module.module.clone());
    }

    let classes: usize = modules.values().map(|m| m.classes.len()).sum();
    info!("Synthesized {} types across {} categories", classes, modules.len());
    modules
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))
}

/// Fetch the overview page and list the category pages it links to.
pub async fn list_categories(settings: &Settings) -> Result<BTreeMap<String, Url>> {
    let overview_url = parse_url(&settings.overview_url)?;
    let fetcher = Fetcher::new(settings)?;
    let overview = fetcher.fetch_document(&overview_url).await?;
    Ok(discover::discover_categories(&overview_url, &overview))
}

/// Fetch every category page concurrently. Any failure aborts the batch.
pub async fn fetch_categories(
    fetcher: &Fetcher,
    categories: BTreeMap<String, Url>,
    concurrency: usize,
) -> Result<Vec<CategoryPage>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = categories.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(String, Url, Result<Element, FetchError>)>(total.max(1));

    for (category, url) in categories {
        let fetcher = fetcher.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let result = fetcher.fetch_document(&url).await;
            let _ = tx.send((category, url, result)).await;
        });
    }

    // rx closes once every task has sent
    drop(tx);

    let mut pages = Vec::with_capacity(total);
    while let Some((category, url, result)) = rx.recv().await {
        pb.set_message(category.clone());
        pb.inc(1);
        let document = result.with_context(|| format!("Failed to fetch category {}", category))?;
        pages.push(CategoryPage {
            category,
            url,
            document,
        });
    }

    pb.finish_and_clear();
    if pages.len() != total {
        anyhow::bail!("Only {} of {} category fetches completed", pages.len(), total);
    }
    info!("Fetched {} category pages", pages.len());
    Ok(pages)
}

/// Discover, fetch and synthesize everything. Nothing is written here.
pub async fn run(settings: &Settings) -> Result<Generation> {
    let overview_url = parse_url(&settings.overview_url)?;
    let fetcher = Fetcher::new(settings)?;

    let overview = fetcher.fetch_document(&overview_url).await?;
    let categories = discover::discover_categories(&overview_url, &overview);
    if categories.is_empty() {
        warn!("No plugin categories linked from {}", overview_url);
    }

    let pages = fetch_categories(&fetcher, categories, settings.concurrency).await?;
    let modules = tokio::task::spawn_blocking(move || synthesize_all(&pages))
        .await
        .context("Synthesis task panicked")?;

    Ok(Generation {
        overview_url: overview_url.to_string(),
        modules,
    })
}

/// Fetch one category page and return its plugin schemas.
pub async fn inspect(
    settings: &Settings,
    category_url: &str,
    category: Option<&str>,
) -> Result<Vec<PluginSchema>> {
    let url = parse_url(category_url)?;
    let category = match category {
        Some(name) => name.to_string(),
        None => discover::category_name(url.path()),
    };
    let fetcher = Fetcher::new(settings)?;
    let document = fetcher.fetch_document(&url).await?;
    Ok(parser::process_page(&category, url.as_str(), &document))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write the runtime, one file per category, the aggregator and a manifest.
/// Files from earlier runs that no longer correspond to a category are left
/// in place.
pub fn write_output(out_dir: &Path, generation: &Generation) -> Result<Manifest> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    write_file(&out_dir.join("plugin.rs"), runtime::PLUGIN_SOURCE)?;
    write_file(&out_dir.join("scene.rs"), runtime::SCENE_SOURCE)?;
    write_file(&out_dir.join("transform.rs"), runtime::TRANSFORM_SOURCE)?;

    let mut index = BTreeMap::new();
    let mut categories = Vec::with_capacity(generation.modules.len());
    for module in generation.modules.values() {
        let path: PathBuf = out_dir.join(format!("{}.rs", module.module));
        write_file(&path, &module.source)?;
        index.insert(module.module.clone(), module.classes.clone());
        categories.push(ManifestCategory {
            name: module.category.clone(),
            url: module.url.clone(),
            module: module.module.clone(),
            classes: module.classes.clone(),
            plugins: module.schemas.iter().map(|s| s.slug.clone()).collect(),
        });
    }

    write_file(
        &out_dir.join("mod.rs"),
        &codegen::render_mod_rs(&generation.overview_url, &index),
    )?;

    let manifest = Manifest {
        overview_url: generation.overview_url.clone(),
        generated_at: Utc::now(),
        categories,
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    write_file(&out_dir.join("manifest.json"), &json)?;

    info!(
        "Wrote {} category modules to {}",
        generation.modules.len(),
        out_dir.display()
    );
    Ok(manifest)
}

// ── Tests ──
