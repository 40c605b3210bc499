use std::sync::Arc;

use crate::{
    config::Config,
    db::Catalog,
    error::AppResult,
    services::{Recommender, TfidfVectorizer},
};

/// Shared application state
///
/// Everything in here is loaded once at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Recommender,
    pub default_top_n: usize,
}

impl AppState {
    pub fn new(recommender: Recommender, default_top_n: usize) -> Self {
        Self {
            recommender,
            default_top_n,
        }
    }

    /// Loads the catalog and vectorizer named in the configuration.
    ///
    /// Any failure here is fatal: the server must not start without both.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let catalog = Catalog::load(&config.catalog_path)?;
        let vectorizer = TfidfVectorizer::load(&config.vectorizer_path)?;

        let recommender = Recommender::new(Arc::new(catalog), Arc::new(vectorizer))
            .with_candidate_limit(config.candidate_limit);

        Ok(Self::new(recommender, config.default_top_n))
    }
}
