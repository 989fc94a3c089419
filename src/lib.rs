//! # sitefeed
//!
//! Scrape article listings from sites that publish no feed of their own and
//! serve them as RSS 2.0, Atom 1.0 and JSON Feed documents.
//!
//! ## Pipeline
//!
//! 1. **Render**: fetch the source page through a [`renderer::Renderer`]
//! 2. **Extract**: turn the HTML into at most 20 deduplicated [`models::Article`]s
//!    with the source's [`models::ExtractorKind`]
//! 3. **Enrich**: visit article pages for missing descriptions and reading
//!    times, remembering results in the [`store::ArticleStore`]
//! 4. **Assemble**: write all three feed formats with [`outputs::FeedAssembler`]
//! 5. **Cache**: keep the result in memory and in `feeds/<label>.json`
//!
//! [`service::FeedService`] ties the steps together and exposes serving,
//! refresh and status operations.

pub mod cache;
pub mod config;
pub mod enricher;
pub mod models;
pub mod outputs;
pub mod renderer;
pub mod scrapers;
pub mod service;
pub mod store;
pub mod utils;

pub use config::AppConfig;
pub use service::FeedService;
