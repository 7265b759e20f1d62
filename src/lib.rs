//! Community-health choropleth viewer core.
//!
//! The crate resolves metric styles, popup content and overlay filters from a
//! static catalog, and drives an external map renderer through the
//! [`surface::MapSurface`] trait.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod geo;
pub mod geocode;
pub mod logging;
pub mod overlay;
pub mod popup;
pub mod retry;
pub mod search;
pub mod style;
pub mod surface;
