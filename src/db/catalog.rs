use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::{
    error::{AppError, AppResult},
    models::{parse_code, parse_score, Product},
};

/// Columns every catalog file must provide
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_CODE,
    COL_NAME,
    COL_NAME_CLEAN,
    COL_INGREDIENTS_CLEAN,
    COL_NUTRITION_SCORE,
    COL_ALLERGENS,
    COL_ALLERGENS_EN,
];

const COL_CODE: &str = "code";
const COL_NAME: &str = "product_name";
const COL_NAME_CLEAN: &str = "product_name_clean";
const COL_INGREDIENTS_CLEAN: &str = "ingredients_text_clean";
const COL_NUTRITION_SCORE: &str = "nutriscore_filled_n";
const COL_ALLERGENS: &str = "allergens";
const COL_ALLERGENS_EN: &str = "allergens_en";

/// Cell values read as missing, matching the default NA tokens of the
/// training pipeline's CSV reader
const NA_VALUES: [&str; 19] = [
    "",
    "#N/A",
    "#N/A N/A",
    "#NA",
    "-1.#IND",
    "-1.#QNAN",
    "-NaN",
    "-nan",
    "1.#IND",
    "1.#QNAN",
    "<NA>",
    "N/A",
    "NA",
    "NULL",
    "NaN",
    "None",
    "n/a",
    "nan",
    "null",
];

/// In-memory product catalog
///
/// Built once at startup and never mutated afterwards, so it can be shared
/// across requests behind an `Arc` without locking. Row order is the load
/// order of the source file.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Builds a catalog from already-normalized products
    pub fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Loads the catalog from a CSV file on disk
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            AppError::CatalogLoad(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let catalog = Self::from_reader(file)?;

        tracing::info!(
            path = %path.display(),
            products = catalog.len(),
            without_code = catalog.products.iter().filter(|p| p.code.is_none()).count(),
            without_score = catalog
                .products
                .iter()
                .filter(|p| p.nutrition_score.is_none())
                .count(),
            "Catalog loaded"
        );

        Ok(catalog)
    }

    /// Parses a catalog from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AppError::CatalogLoad(format!("Failed to read headers: {}", e)))?
            .clone();
        let columns = ColumnIndex::resolve(&headers)?;

        let mut products = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                AppError::CatalogLoad(format!("Malformed row {}: {}", line + 2, e))
            })?;
            products.push(columns.product(&record));
        }

        Ok(Self { products })
    }

    /// First product in load order whose code equals `code`
    pub fn find_by_code(&self, code: &str) -> Option<(usize, &Product)> {
        self.products
            .iter()
            .enumerate()
            .find(|(_, product)| product.code.as_deref() == Some(code))
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Positions of the required columns within a header row
struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> AppResult<Self> {
        let mut positions = HashMap::new();
        let mut missing = Vec::new();

        for column in REQUIRED_COLUMNS {
            match headers.iter().position(|h| h.trim() == column) {
                Some(idx) => {
                    positions.insert(column, idx);
                }
                None => missing.push(column),
            }
        }

        if !missing.is_empty() {
            return Err(AppError::CatalogLoad(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    /// Raw field value, with empty cells and NA tokens treated as absent
    fn field<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|&idx| record.get(idx))
            .filter(|value| !NA_VALUES.contains(value))
    }

    fn product(&self, record: &StringRecord) -> Product {
        let combined_text = format!(
            "{} {}",
            self.field(record, COL_NAME_CLEAN).unwrap_or(""),
            self.field(record, COL_INGREDIENTS_CLEAN).unwrap_or("")
        );

        let allergens = self
            .field(record, COL_ALLERGENS_EN)
            .or_else(|| self.field(record, COL_ALLERGENS))
            .map(str::to_string);

        Product {
            code: parse_code(self.field(record, COL_CODE)),
            name: self.field(record, COL_NAME).map(str::to_string),
            combined_text,
            nutrition_score: parse_score(self.field(record, COL_NUTRITION_SCORE)),
            allergens,
        }
    }
}
