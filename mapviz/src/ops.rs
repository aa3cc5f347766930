use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use log::{debug, info};
use mapdata::{AssetPaths, CountryRules, CountryTag, MapAssets};
use mapengine::borders::province_outline;
use mapengine::labels::{Anchor, PlacedLabel};
use mapengine::text::TextRenderer;
use mapengine::job::Progress;
use mapengine::{EngineConfig, EngineLoader, MapEngine, World};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::args::Cli;

pub fn load_config(cli: &Cli) -> Result<EngineConfig> {
    match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading engine config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

pub fn load_assets(root: &Path) -> Result<MapAssets> {
    let paths = AssetPaths::in_dir(root);
    MapAssets::load(&paths).with_context(|| format!("loading map assets from {}", root.display()))
}

pub fn load_world(root: &Path) -> Result<World> {
    let assets = load_assets(root)?;
    Ok(World::from_assets(&assets)?)
}

/// Loads the assets and builds every layer up front.
pub fn load_engine(cli: &Cli, viewport: Option<(u32, u32)>) -> Result<MapEngine> {
    let config = load_config(cli)?;
    let assets = load_assets(&cli.assets)?;
    let viewport = viewport.unwrap_or((assets.provinces.width(), assets.provinces.height()));
    let mut loader = EngineLoader::new(&assets, viewport, config)?;
    while let Progress::Pending { done, total } = loader.step() {
        debug!("Indexing provinces: {}/{} rows", done, total);
    }
    let mut engine = loader.finish();
    if let Some(font) = &cli.font {
        engine.set_text_renderer(TextRenderer::from_file(font)?);
    }
    engine.finish_rebuilds();
    Ok(engine)
}

fn save(image: &RgbaImage, output: &Path) -> Result<()> {
    image
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Saved {} ({}x{})", output.display(), image.width(), image.height());
    Ok(())
}

pub fn render(
    cli: &Cli,
    output: &Path,
    size: (u32, u32),
    zoom: Option<f64>,
    center: Option<(f64, f64)>,
    select: Option<u32>,
) -> Result<()> {
    let mut engine = load_engine(cli, Some(size))?;
    if zoom.is_some() || center.is_some() {
        let camera = engine.camera_mut();
        let (ww, wh) = camera.world_size();
        let zoom = zoom.unwrap_or(camera.zoom);
        camera.look_at(center.unwrap_or((ww / 2.0, wh / 2.0)), zoom);
    }
    if let Some(id) = select {
        if engine.world().index.by_id(id).is_none() {
            anyhow::bail!("no province with id {}", id);
        }
        engine.select(Some(id));
    }
    let frame = engine.render();
    save(&frame, output)
}

pub fn political(cli: &Cli, output: &Path) -> Result<()> {
    let engine = load_engine(cli, None)?;
    let layer = engine
        .political_layer()
        .context("political layer was not built")?;
    save(layer, output)
}

pub fn borders(cli: &Cli, output: &Path, province: Option<u32>) -> Result<()> {
    match province {
        Some(id) => {
            let config = load_config(cli)?;
            let world = load_world(&cli.assets)?;
            if world.index.by_id(id).is_none() {
                anyhow::bail!("no province with id {}", id);
            }
            let outline = province_outline(&world.index, id);
            let [r, g, b] = config.layers.selection_color;
            let mut image = RgbaImage::new(world.index.width(), world.index.height());
            for &(x, y) in &outline {
                image.put_pixel(x, y, Rgba([r, g, b, 255]));
            }
            info!("Province {} outline: {} pixels", id, outline.len());
            save(&image, output)
        }
        None => {
            let engine = load_engine(cli, None)?;
            let layer = engine
                .border_layer()
                .context("border layer was not built")?;
            save(layer, output)
        }
    }
}

#[derive(Debug, Serialize)]
struct LabelReport<'a> {
    zoom: f64,
    anchors: &'a BTreeMap<CountryTag, Anchor>,
    visible: Vec<PlacedLabel>,
}

pub fn labels(cli: &Cli, zoom: Option<f64>) -> Result<()> {
    let mut engine = load_engine(cli, None)?;
    if let Some(zoom) = zoom {
        let camera = engine.camera_mut();
        let (ww, wh) = camera.world_size();
        camera.look_at((ww / 2.0, wh / 2.0), zoom);
    }
    let report = LabelReport {
        zoom: engine.camera().zoom,
        anchors: engine.label_anchors(),
        visible: engine.visible_labels(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn lookup(cli: &Cli, x: i64, y: i64) -> Result<()> {
    let world = load_world(&cli.assets)?;
    match world.index.lookup(x, y) {
        Some(province) => {
            let owner = world.ownership.owner(province.id).unwrap_or("none");
            println!(
                "{},{} -> province {} ({:?}, owner {})",
                x, y, province.id, province.category, owner
            );
        }
        None => println!("{},{} -> none", x, y),
    }
    Ok(())
}

pub fn import(cli: &Cli, input: &Path, rules: &Path, output: &Path) -> Result<()> {
    let rules = CountryRules::load(rules)
        .with_context(|| format!("loading country rules {}", rules.display()))?;
    let text =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;

    let config = load_config(cli)?;
    let assets = load_assets(&cli.assets)?;
    let viewport = (assets.provinces.width(), assets.provinces.height());
    let mut engine = MapEngine::from_assets(&assets, viewport, config)?;

    let report = engine.import_assignments(&text, &rules);
    fs::write(output, engine.export_snapshot())
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Assigned: {}, Unmatched: {}, Skipped: {}",
        report.assigned, report.unmatched, report.skipped
    );
    println!("Saved {}", output.display());
    Ok(())
}

pub fn export(cli: &Cli, output: Option<&Path>) -> Result<()> {
    let world = load_world(&cli.assets)?;
    let snapshot = world.ownership.to_snapshot();
    match output {
        Some(path) => {
            fs::write(path, snapshot).with_context(|| format!("writing {}", path.display()))?;
            println!("Saved {} ({} provinces)", path.display(), world.ownership.len());
        }
        None => print!("{}", snapshot),
    }
    Ok(())
}
