use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    db::Catalog,
    models::{normalize_barcode, Analysis, Product, ProductView, RecommendedProduct},
    services::similarity::{cosine_similarity, TextVectorizer},
};

/// Upper bound on candidates scored per request, taken in catalog order
/// after the nutrition filter
pub const DEFAULT_CANDIDATE_LIMIT: usize = 3000;

/// Recommendations returned when the caller does not ask for a count
pub const DEFAULT_TOP_N: usize = 4;

/// Finds nutritionally-better alternatives for a scanned product
///
/// Holds the read-only catalog and vectorizer; cheap to clone and safe to
/// share across concurrent requests.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<Catalog>,
    vectorizer: Arc<dyn TextVectorizer>,
    candidate_limit: usize,
}

impl Recommender {
    pub fn new(catalog: Arc<Catalog>, vectorizer: Arc<dyn TextVectorizer>) -> Self {
        Self {
            catalog,
            vectorizer,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    pub fn with_candidate_limit(mut self, candidate_limit: usize) -> Self {
        self.candidate_limit = candidate_limit;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Looks up `barcode` and ranks better-scoring products by text similarity.
    ///
    /// Returns `None` when the barcode normalizes to nothing or matches no
    /// product. Only products with a strictly lower nutrition score are
    /// considered; a product without a score gets no recommendations.
    /// Ties in similarity keep catalog order, and each code appears once.
    pub fn recommend(&self, barcode: &str, top_n: usize) -> Option<Analysis> {
        let code = normalize_barcode(barcode);
        if code.is_empty() {
            return None;
        }

        let (base_idx, base) = self.catalog.find_by_code(&code)?;
        let base_vector = self.vectorizer.vectorize(&base.combined_text);

        let better: Vec<&Product> = self
            .catalog
            .products()
            .iter()
            .enumerate()
            .filter(|&(idx, product)| {
                idx != base_idx && product.scores_better_than(base.nutrition_score)
            })
            .map(|(_, product)| product)
            .collect();
        let filtered_count = better.len();

        let candidates: Vec<&Product> = better.into_iter().take(self.candidate_limit).collect();

        tracing::debug!(
            code = %code,
            filtered = filtered_count,
            scored = candidates.len(),
            "Scoring candidates"
        );

        let texts: Vec<&str> = candidates
            .iter()
            .map(|product| product.combined_text.as_str())
            .collect();
        let candidate_vectors = self.vectorizer.transform(&texts);
        let similarities = cosine_similarity(&base_vector, &candidate_vectors);

        let mut ranked: Vec<(&Product, f64)> = candidates.into_iter().zip(similarities).collect();
        // Stable: equal similarities keep catalog order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen: HashSet<Option<&str>> = HashSet::new();
        let recommendations: Vec<RecommendedProduct> = ranked
            .into_iter()
            .filter(|&(product, _)| seen.insert(product.code.as_deref()))
            .take(top_n)
            .map(|(product, similarity)| RecommendedProduct::new(product, similarity))
            .collect();

        tracing::debug!(
            code = %code,
            returned = recommendations.len(),
            "Recommendations ranked"
        );

        Some(Analysis {
            product: ProductView::from(base),
            recommendations,
        })
    }
}
