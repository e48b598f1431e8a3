//! CLI commands implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use geojson::{FeatureCollection, Value};

use civicmap::boundaries::LoadState;
use civicmap::config::{load_settings, load_settings_with_options, LoadOptions, Settings};
use civicmap::layers::DistrictFormat;
use civicmap::{AppState, InitialState, LookupError};

use super::icons;

#[derive(Parser)]
#[command(name = "civicmap")]
#[command(about = "Civic boundary map state and officials lookup")]
#[command(version)]
pub struct Cli {
    /// Config file (overrides auto-discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Show the selection deep-linked by a page URL or query string
    Url {
        /// Page URL (https://host/?map=..&dist=..) or bare query string
        url: String,
    },

    /// Load the boundary topology and convert it to GeoJSON
    Boundaries {
        /// Topology location (URL or path), defaults to the configured one
        #[arg(short, long)]
        source: Option<String>,
        /// Topology object to convert
        #[arg(long)]
        object: Option<String>,
        /// Write the GeoJSON feature collection to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the official responsible for a district
    Lookup {
        /// Boundary layer id
        #[arg(short, long)]
        map: Option<String>,
        /// District id within the layer
        #[arg(short, long)]
        dist: Option<String>,
        /// Page URL to take the selection from (flags override it)
        #[arg(long)]
        url: Option<String>,
        /// Officials dataset (JSON), defaults to the configured one
        #[arg(long)]
        officials: Option<PathBuf>,
    },

    /// List boundary layers and how they label districts
    Layers,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match cli.config {
        Some(config_path) => load_settings_with_options(&LoadOptions {
            config_path: Some(config_path),
        })
        .await
        .map_err(|e| anyhow::anyhow!(e))?,
        None => load_settings().await,
    };

    match cli.command {
        Commands::Url { url } => cmd_url(&url),
        Commands::Boundaries {
            source,
            object,
            output,
        } => cmd_boundaries(settings, source, object, output).await,
        Commands::Lookup {
            map,
            dist,
            url,
            officials,
        } => cmd_lookup(settings, map, dist, url.as_deref(), officials).await,
        Commands::Layers => cmd_layers(&settings),
    }
}

fn parse_initial_state(input: &str) -> anyhow::Result<InitialState> {
    if input.contains("://") {
        Ok(InitialState::from_url(input)?)
    } else {
        Ok(InitialState::from_query(input))
    }
}

fn cmd_url(input: &str) -> anyhow::Result<()> {
    let initial = parse_initial_state(input)?;
    println!("{}", serde_json::to_string_pretty(&initial)?);
    Ok(())
}

async fn cmd_boundaries(
    mut settings: Settings,
    source: Option<String>,
    object: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(source) = source {
        settings.boundaries = source;
    }
    if let Some(object) = object {
        settings.boundaries_object = object;
    }

    let loader = settings.boundary_loader()?;
    let _progress = loader.subscribe_state(|state| {
        if matches!(state, LoadState::Loading) {
            tracing::info!("Fetching boundary topology");
        }
    });

    let Some(collection) = loader.load().await else {
        let reason = match loader.state() {
            LoadState::Failed(message) => message,
            _ => "no result".to_string(),
        };
        anyhow::bail!("Could not load boundaries: {}", reason);
    };

    println!(
        "{} Loaded {} feature(s) from '{}'",
        icons::success(),
        collection.features.len(),
        settings.boundaries_object
    );
    for (kind, count) in geometry_counts(&collection) {
        println!("  {} {:<18} {}", icons::dim_arrow(), kind, count);
    }

    if let Some(path) = output {
        tokio::fs::write(&path, serde_json::to_vec(&*collection)?).await?;
        println!("{} Wrote {}", icons::success(), path.display());
    }

    Ok(())
}

fn geometry_counts(collection: &FeatureCollection) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for feature in &collection.features {
        let kind = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(_)) => "Point",
            Some(Value::MultiPoint(_)) => "MultiPoint",
            Some(Value::LineString(_)) => "LineString",
            Some(Value::MultiLineString(_)) => "MultiLineString",
            Some(Value::Polygon(_)) => "Polygon",
            Some(Value::MultiPolygon(_)) => "MultiPolygon",
            Some(Value::GeometryCollection(_)) => "GeometryCollection",
            None => "(no geometry)",
        };
        *counts.entry(kind).or_insert(0) += 1;
    }
    counts
}

async fn cmd_lookup(
    mut settings: Settings,
    map: Option<String>,
    dist: Option<String>,
    url: Option<&str>,
    officials: Option<PathBuf>,
) -> anyhow::Result<()> {
    let initial = match url {
        Some(url) => parse_initial_state(url)?,
        None => InitialState::default(),
    };
    let state = AppState::new(initial);
    if map.is_some() {
        state.selected_boundary_map.set(map);
    }
    if dist.is_some() {
        state.selected_district.set(dist);
    }

    let (Some(layer), Some(district)) = (
        state.selected_boundary_map.get(),
        state.selected_district.get(),
    ) else {
        println!(
            "{} Select both a boundary layer (--map) and a district (--dist)",
            icons::warn()
        );
        return Ok(());
    };

    if let Some(path) = officials {
        settings.officials_path = Some(path);
    }
    let directory = settings.load_officials().await?;
    if directory.is_empty() {
        println!(
            "{} No officials dataset loaded. Pass --officials or set officials in config.",
            icons::warn()
        );
    }

    match state.official_details(&directory, &settings.layers) {
        Ok(Some(official)) => {
            println!(
                "{} {} / {}",
                icons::success(),
                style(&official.department).bold(),
                official.area
            );
            println!("{}", serde_json::to_string_pretty(official)?);
            Ok(())
        }
        Ok(None) => {
            println!(
                "{} No official found for {} district '{}'",
                icons::error(),
                layer,
                district
            );
            Ok(())
        }
        Err(LookupError::UnknownLayer(id)) => anyhow::bail!(
            "Unknown boundary layer '{}'. Run 'civicmap layers' to list layers.",
            id
        ),
    }
}

fn cmd_layers(settings: &Settings) -> anyhow::Result<()> {
    if settings.layers.is_empty() {
        println!("{} No boundary layers configured.", icons::warn());
        return Ok(());
    }

    println!("\n{}", style("Boundary Layers").bold());
    println!("{}", "-".repeat(72));
    println!("{:<20} {:<38} Format", "ID", "Name");
    println!("{}", "-".repeat(72));

    for layer in settings.layers.iter() {
        let format = match &layer.format {
            DistrictFormat::Verbatim => "verbatim".to_string(),
            DistrictFormat::Template { template } => format!("template \"{}\"", template),
            DistrictFormat::Uppercase => "uppercase".to_string(),
            DistrictFormat::TitleCase => "title case".to_string(),
        };
        println!("{:<20} {:<38} {}", layer.id, layer.name, format);
    }

    Ok(())
}
