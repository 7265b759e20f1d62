use healthmap::catalog::{sha256_hex, Catalog};
use healthmap::config::ViewerConfig;
use healthmap::style::{legend, StylePolicy};
use serde_json::json;
use std::env;
use std::fs;

fn main() {
    let cfg = ViewerConfig::from_env();
    let path = env::args().nth(1).unwrap_or(cfg.catalog_path);

    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("failed to read {}: {}", path, err);
            std::process::exit(1);
        }
    };

    let catalog = match Catalog::from_json(&text) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("invalid catalog {}: {}", path, err);
            std::process::exit(2);
        }
    };

    let policy = StylePolicy {
        no_data_color: cfg.no_data_color,
    };
    let legends: Vec<_> = catalog
        .metrics()
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "title": m.title,
                "field": m.field,
                "breakpoints": m.breakpoints,
                "legend": legend(m, &policy),
            })
        })
        .collect();

    let manifest = json!({
        "path": path,
        "sha256": sha256_hex(text.as_bytes()),
        "metrics": catalog.metrics().len(),
        "overlays": catalog.overlays(),
        "hospitals": catalog.hospitals().len(),
        "legends": legends,
    });

    match serde_json::to_string_pretty(&manifest) {
        Ok(out) => println!("{}", out),
        Err(err) => {
            eprintln!("failed to render manifest: {}", err);
            std::process::exit(3);
        }
    }
}
