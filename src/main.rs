//! Headless viewer driver.
//!
//! Reads view events (one JSON object per line) and address submissions
//! (`{"search": "..."}`) from stdin, writes surface commands to stdout.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use healthmap::catalog::Catalog;
use healthmap::config::ViewerConfig;
use healthmap::controller::{ViewController, ViewEvent};
use healthmap::geocode::{Geocoder, MapboxGeocoder};
use healthmap::logging::{log, obj, v_str, Domain, Level};
use healthmap::search::{run_ticketed, MarkerTimers, SearchSequence};
use healthmap::surface::{JsonlSurface, MapSurface};

#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Search { search: String },
    Event(ViewEvent),
}

fn step(
    controller: &mut ViewController,
    event: ViewEvent,
    surface: &mut dyn MapSurface,
    timers: &mut MarkerTimers,
) {
    for req in controller.dispatch(event, surface) {
        timers.apply(req);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = ViewerConfig::from_env();
    let catalog = Arc::new(Catalog::load(Path::new(&cfg.catalog_path))?);

    let geocoder: Option<Arc<dyn Geocoder>> = if cfg.search_enabled() {
        Some(Arc::new(MapboxGeocoder::new(&cfg)?))
    } else {
        log(
            Level::Warn,
            Domain::Search,
            "search_disabled",
            obj(&[("msg", v_str("set MAPBOX_TOKEN and ADDRESS_SEARCH to enable address search"))]),
        );
        None
    };

    log(
        Level::Info,
        Domain::System,
        "start",
        obj(&[
            ("catalog", v_str(&cfg.catalog_path)),
            ("center", json!(cfg.initial_center)),
            ("zoom", json!(cfg.initial_zoom)),
            ("search", json!(geocoder.is_some())),
        ]),
    );

    let mut controller = ViewController::new(catalog, &cfg);
    let mut surface = JsonlSurface::new(io::stdout());
    let (tx, mut rx) = mpsc::unbounded_channel::<ViewEvent>();
    let mut timers = MarkerTimers::new(tx.clone());
    let searches = SearchSequence::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut processed: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line.context("failed to read stdin")? {
                    Some(line) => line,
                    None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Input>(&line) {
                    Ok(Input::Search { search }) => match &geocoder {
                        Some(g) => {
                            let g = Arc::clone(g);
                            let tx = tx.clone();
                            let seq = searches.clone();
                            let ticket = seq.issue();
                            tokio::spawn(async move {
                                if let Some(outcome) = run_ticketed(&seq, ticket, g.as_ref(), &search).await {
                                    let _ = tx.send(ViewEvent::SearchResolved(outcome));
                                }
                            });
                        }
                        None => log(
                            Level::Warn,
                            Domain::Search,
                            "search_unavailable",
                            obj(&[("address", v_str(&search))]),
                        ),
                    },
                    Ok(Input::Event(event)) => {
                        processed += 1;
                        step(&mut controller, event, &mut surface, &mut timers);
                    }
                    Err(e) => log(
                        Level::Warn,
                        Domain::System,
                        "bad_input",
                        obj(&[("msg", v_str(&e.to_string()))]),
                    ),
                }
            }
            Some(event) = rx.recv() => {
                processed += 1;
                step(&mut controller, event, &mut surface, &mut timers);
            }
        }
    }

    log(
        Level::Info,
        Domain::System,
        "shutdown",
        obj(&[
            ("events", json!(processed)),
            ("selection", json!(controller.selection())),
            ("pending_timers", json!(timers.pending())),
        ]),
    );
    Ok(())
}
