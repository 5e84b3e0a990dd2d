mod cli;
mod tui;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, GridArgs};

use pianoroll::config::{self, EditorConfig};
use pianoroll::editor::Editor;
use pianoroll::grid::LineKind;
use pianoroll::render::{RenderRequest, RenderSink};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    match cli.command {
        None => {
            let mut editor = Editor::from_config(&config, tui::Scene::default());
            apply_overrides(&mut editor, &cli.grid)?;
            let editor = tui::run(editor)?;
            for (_, note) in editor.notes().iter() {
                println!("note: {:?}", note.to_tuple());
            }
            Ok(())
        }
        Some(Command::Geometry) => {
            let mut editor = Editor::from_config(&config, Vec::<RenderRequest>::new());
            apply_overrides(&mut editor, &cli.grid)?;
            print_geometry(&editor);
            Ok(())
        }
    }
}

/// Command-line grid settings are applied strictly: a bad value is an error,
/// unlike the config file where it is only warned about.
fn apply_overrides<R: RenderSink>(editor: &mut Editor<R>, args: &GridArgs) -> anyhow::Result<()> {
    if let Some(text) = &args.time_sig {
        editor.set_time_signature(text).context("--time-sig")?;
    }
    if let Some(text) = &args.measures {
        editor.set_measure_count(text).context("--measures")?;
    }
    if let Some(text) = &args.quantize {
        editor.set_quantize_division(text).context("--quantize")?;
    }
    if let Some(text) = &args.length {
        editor.set_default_length(text).context("--length")?;
    }
    Ok(())
}

fn print_geometry<R: RenderSink>(editor: &Editor<R>) {
    let grid = editor.grid();
    let axis = editor.axis();

    println!("Time signature:  {}", grid.time_signature_text());
    println!("Measures:        {}", grid.measures_text());
    println!("Quantize:        {}", grid.quantize_text());
    println!(
        "Default length:  {} ({} beats, {} px)",
        grid.default_length_text(),
        grid.default_length_beats(),
        grid.default_length_px()
    );
    println!("Grid origin:     x = {}", grid.origin_x());
    println!("Beat width:      {} px", grid.beat_width());
    println!("Measure width:   {} px", grid.measure_width());
    println!(
        "Grid width:      {} px ({} beats)",
        grid.grid_width(),
        grid.grid_beats()
    );
    match grid.snap_increment() {
        Some(inc) => println!("Snap increment:  {inc} px"),
        None => println!("Snap increment:  off"),
    }
    println!(
        "Pitch rows:      {} x {} px (pitches 0..={})",
        axis.total_rows(),
        axis.row_height(),
        axis.max_pitch()
    );

    println!("Grid lines:");
    for line in grid.all_grid_lines() {
        let kind = match line.kind {
            LineKind::Bar(n) => format!("bar {n}"),
            LineKind::End => "end".to_string(),
            LineKind::Half => "half".to_string(),
            LineKind::Division => "division".to_string(),
        };
        println!("  {:>10.3}  {kind}", line.x);
    }
}
