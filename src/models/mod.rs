use serde::Serialize;

pub mod barcode;
pub mod nutrition;

pub use barcode::{normalize_barcode, parse_code};
pub use nutrition::{parse_score, round_similarity, sanitize_score, NutritionGrade};

/// A single catalog entry, normalized at load time
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Digits-only barcode; `None` when the raw value had no digits
    pub code: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Cleaned name and ingredients joined by a space, used for similarity
    pub combined_text: String,
    /// Lower is better; `None` when the catalog value was not numeric
    pub nutrition_score: Option<f64>,
    pub allergens: Option<String>,
}

impl Product {
    /// Whether this product scores strictly better than `score`.
    ///
    /// Missing values on either side never compare as better.
    pub fn scores_better_than(&self, score: Option<f64>) -> bool {
        match (self.nutrition_score, score) {
            (Some(own), Some(other)) => own < other,
            _ => false,
        }
    }

    pub fn grade(&self) -> Option<NutritionGrade> {
        NutritionGrade::from_score(self.nutrition_score)
    }
}

/// Product as returned to the client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductView {
    pub name: Option<String>,
    pub code: Option<String>,
    pub nutriscore: Option<f64>,
    pub nutrigrade: Option<NutritionGrade>,
    pub allergens: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            code: product.code.clone(),
            nutriscore: product.nutrition_score.and_then(sanitize_score),
            nutrigrade: product.grade(),
            allergens: product.allergens.clone(),
        }
    }
}

/// A better-scoring alternative with its similarity to the scanned product
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendedProduct {
    #[serde(flatten)]
    pub product: ProductView,
    /// Cosine similarity rounded to three decimals
    pub similarity: f64,
}

impl RecommendedProduct {
    pub fn new(product: &Product, similarity: f64) -> Self {
        Self {
            product: ProductView::from(product),
            similarity: round_similarity(similarity),
        }
    }
}

/// Result of analyzing a barcode: the product and its alternatives
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Analysis {
    pub product: ProductView,
    pub recommendations: Vec<RecommendedProduct>,
}
