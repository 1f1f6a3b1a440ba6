//! `htmltext`: convert an HTML file and print the styled result.
//!
//! Prints the text as laid out on a monospace grid, or the full span
//! list as JSON with `--json`. `--tap X,Y` replays a tap on the grid and
//! reports which link region, if any, it activated.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};

use htmltext_bundle::DirBundle;
use htmltext_core::config::HtmlTextConfig;
use htmltext_core::resolve::ResolutionStrategy;
use htmltext_core::surface::GridSurface;
use htmltext_core::tags::{LinkHandler, TableHandler};
use htmltext_core::widget::HtmlTextWidget;
use htmltext_types::input::PointerSequence;

const USAGE: &str = "Usage: htmltext <file.html> [--config FILE] [--json] [--base URL] \
                     [--local DIR] [--columns N] [--tap X,Y]";

/// Grid cell size used to map `--tap` coordinates.
const CELL_WIDTH: u32 = 8;
const CELL_HEIGHT: u32 = 16;

// ---------------------------------------------------------------------------
// CLI parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    json: bool,
    base: Option<String>,
    local: Option<PathBuf>,
    columns: usize,
    tap: Option<(i32, i32)>,
}

fn parse_args(mut iter: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args {
        columns: 80,
        ..Args::default()
    };
    let mut input = None;
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = Some(value(&mut iter, "--config")?.into()),
            "--json" => args.json = true,
            "--base" => args.base = Some(value(&mut iter, "--base")?),
            "--local" => args.local = Some(value(&mut iter, "--local")?.into()),
            "--columns" => {
                args.columns = value(&mut iter, "--columns")?
                    .parse()
                    .context("--columns expects a number")?;
            },
            "--tap" => args.tap = Some(parse_point(&value(&mut iter, "--tap")?)?),
            other if other.starts_with("--") => bail!("unknown argument: {other}\n{USAGE}"),
            path => {
                if input.replace(PathBuf::from(path)).is_some() {
                    bail!("more than one input file\n{USAGE}");
                }
            },
        }
    }
    if args.base.is_some() && args.local.is_some() {
        bail!("--base and --local are mutually exclusive");
    }
    args.input = input.with_context(|| format!("missing input file\n{USAGE}"))?;
    Ok(args)
}

fn value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    iter.next()
        .with_context(|| format!("{flag} expects a value"))
}

fn parse_point(s: &str) -> Result<(i32, i32)> {
    let (x, y) = s
        .split_once(',')
        .with_context(|| format!("expected X,Y, got {s:?}"))?;
    Ok((x.trim().parse()?, y.trim().parse()?))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Logs table and internal-link clicks.
struct LogHandler;

impl TableHandler for LogHandler {
    fn on_table_click(&self, html: &str) {
        log::info!("table clicked ({} bytes of markup)", html.len());
        println!("{html}");
    }
}

impl LinkHandler for LogHandler {
    fn on_link_click(&self, target: &str) {
        log::info!("internal link clicked: {target}");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => HtmlTextConfig::load(path)?,
        None => HtmlTextConfig::default(),
    };

    let mut widget = HtmlTextWidget::new(GridSurface::new(args.columns, CELL_WIDTH, CELL_HEIGHT));
    let mut strategy = widget.apply_config(&config)?;

    let handler = Rc::new(LogHandler);
    let tables: Rc<dyn TableHandler> = Rc::<LogHandler>::clone(&handler);
    let links: Rc<dyn LinkHandler> = handler;
    widget.set_table_handler(Some(tables));
    widget.set_link_handler(Some(links));

    if let Some(dir) = &args.local {
        widget.set_bundle(Some(Box::new(DirBundle::open(dir)?)));
        strategy = ResolutionStrategy::Local;
    } else if let Some(base) = &args.base {
        strategy = ResolutionStrategy::remote(base.clone());
    }

    let markup = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    log::info!(
        "converting {} ({} bytes, images: {strategy})",
        args.input.display(),
        markup.len()
    );
    widget.set_html(&markup, &strategy)?;

    if args.json {
        println!("{}", widget.text().to_json()?);
    } else {
        println!("{}", widget.surface().render());
    }

    if let Some((x, y)) = args.tap {
        let consumed = widget.on_pointer(&PointerSequence::tap(x, y));
        log::info!("tap at ({x}, {y}) consumed: {consumed}");
        if let Some(activation) = &widget.link_hit().activation {
            log::info!("activated {activation:?}");
        }
    }

    Ok(())
}
