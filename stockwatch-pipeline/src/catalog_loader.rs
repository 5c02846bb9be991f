//! Catalog import from CSV or JSON.
//!
//! CSV headers are matched case-insensitively. Accepted columns:
//!   sku|id, name, category, stock, price|base_price, supplier|supplier_id,
//!   reorder_point, lead_time_days, description
//! Only the id column is required; everything else has a default.
//!
//! JSON has the shape `{"products": [...], "suppliers": [...]}`.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Product, Supplier};

/// Everything a catalog import produced.
#[derive(Clone, Debug, Default)]
pub struct CatalogData {
    pub products: Vec<Product>,
    pub suppliers: Vec<Supplier>,
}

/// A CSV row before defaults are applied. Alternate column names are kept
/// as separate fields so a file carrying both spellings still parses.
#[derive(Debug, Deserialize)]
struct CsvProductRecord {
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_int")]
    stock: Option<i64>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    base_price: Option<f64>,
    #[serde(default)]
    supplier: Option<String>,
    #[serde(default)]
    supplier_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_int")]
    reorder_point: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_opt_int")]
    lead_time_days: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonCatalog {
    #[serde(default)]
    products: Vec<JsonProduct>,
    #[serde(default)]
    suppliers: Vec<JsonSupplier>,
}

#[derive(Debug, Deserialize)]
struct JsonProduct {
    id: Option<String>,
    sku: Option<String>,
    name: Option<String>,
    category: Option<String>,
    stock: Option<i64>,
    base_price: Option<f64>,
    price: Option<f64>,
    supplier_id: Option<String>,
    supplier: Option<String>,
    description: Option<String>,
    reorder_point: Option<u32>,
    lead_time_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct JsonSupplier {
    id: Option<String>,
    name: Option<String>,
    contact: Option<String>,
    email: Option<String>,
    #[serde(default)]
    categories: BTreeSet<String>,
    #[serde(alias = "avg_lead_time_days")]
    avg_lead_time: Option<u32>,
    rating: Option<f64>,
}

struct ProductFields {
    id: Option<String>,
    name: Option<String>,
    category: Option<String>,
    stock: Option<i64>,
    base_price: Option<f64>,
    supplier_id: Option<String>,
    reorder_point: Option<u32>,
    lead_time_days: Option<u32>,
    description: Option<String>,
}

impl ProductFields {
    /// Apply import defaults. Rows without an id produce nothing.
    fn into_product(self) -> Option<Product> {
        let id = non_empty(self.id)?;
        let defaults = Product::default();
        Some(Product {
            id,
            name: non_empty(self.name).unwrap_or(defaults.name),
            category: non_empty(self.category).unwrap_or(defaults.category),
            base_price: self.base_price.unwrap_or(defaults.base_price),
            stock: self.stock.unwrap_or(defaults.stock),
            supplier_id: non_empty(self.supplier_id).unwrap_or(defaults.supplier_id),
            reorder_point: self.reorder_point.unwrap_or(defaults.reorder_point),
            lead_time_days: self.lead_time_days.unwrap_or(defaults.lead_time_days),
            description: self.description.unwrap_or_default(),
        })
    }
}

impl CsvProductRecord {
    fn into_fields(self) -> PipelineResult<ProductFields> {
        let id = non_empty(self.sku).or(non_empty(self.id));
        Ok(ProductFields {
            reorder_point: to_u32("reorder_point", self.reorder_point)?,
            lead_time_days: to_u32("lead_time_days", self.lead_time_days)?,
            id,
            name: self.name,
            category: self.category,
            stock: self.stock,
            base_price: self.base_price.or(self.price),
            supplier_id: non_empty(self.supplier_id).or(self.supplier),
            description: self.description,
        })
    }
}

impl From<JsonProduct> for ProductFields {
    fn from(p: JsonProduct) -> Self {
        ProductFields {
            id: non_empty(p.id).or(p.sku),
            name: p.name,
            category: p.category,
            stock: p.stock,
            base_price: p.base_price.or(p.price),
            supplier_id: non_empty(p.supplier_id).or(p.supplier),
            reorder_point: p.reorder_point,
            lead_time_days: p.lead_time_days,
            description: p.description,
        }
    }
}

impl JsonSupplier {
    fn into_supplier(self) -> Option<Supplier> {
        let id = non_empty(self.id)?;
        Some(Supplier {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            contact: self.contact.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            categories: self.categories,
            avg_lead_time_days: self.avg_lead_time.unwrap_or(7),
            rating: self.rating.unwrap_or(0.0).clamp(0.0, 5.0),
        })
    }
}

/// Load products from a CSV reader.
pub fn load_products_csv<R: Read>(reader: R) -> PipelineResult<Vec<Product>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: csv::StringRecord = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    if !headers.iter().any(|h| h == "sku" || h == "id") {
        return Err(PipelineError::Catalog(
            "CSV must contain an 'sku' or 'id' column".to_string(),
        ));
    }
    csv_reader.set_headers(headers);

    let mut products = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let record: CsvProductRecord = result.map_err(|e| {
            PipelineError::Catalog(format!("CSV parse error at line {}: {}", line_num + 2, e))
        })?;
        match record.into_fields()?.into_product() {
            Some(product) => products.push(product),
            None => log::debug!("skipping CSV line {} without an id", line_num + 2),
        }
    }
    Ok(products)
}

/// Load products and suppliers from a JSON reader.
pub fn load_catalog_json<R: Read>(reader: R) -> PipelineResult<CatalogData> {
    let raw: JsonCatalog = serde_json::from_reader(reader)?;
    let products = raw
        .products
        .into_iter()
        .filter_map(|p| ProductFields::from(p).into_product())
        .collect();
    let suppliers = raw
        .suppliers
        .into_iter()
        .filter_map(JsonSupplier::into_supplier)
        .collect();
    Ok(CatalogData {
        products,
        suppliers,
    })
}

/// Load a catalog file, picking the format from the extension.
pub fn load_catalog_file(path: &Path) -> PipelineResult<CatalogData> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::Catalog(format!("Failed to open '{}': {}", path.display(), e))
    })?;
    let data = match extension.as_str() {
        "csv" => CatalogData {
            products: load_products_csv(file)?,
            suppliers: Vec::new(),
        },
        "json" => load_catalog_json(file)?,
        other => {
            return Err(PipelineError::Catalog(format!(
                "Unsupported catalog format '{}' for {}",
                other,
                path.display()
            )))
        }
    };
    log::info!(
        "loaded {} products and {} suppliers from {}",
        data.products.len(),
        data.suppliers.len(),
        path.display()
    );
    Ok(data)
}

/// Small built-in catalog used when no catalog file is available.
pub fn demo_catalog() -> CatalogData {
    // (id, name, category, price, stock, supplier, reorder point, lead days)
    let products: [(&str, &str, &str, f64, i64, &str, u32, u32); 5] = [
        ("SKU001", "Red T-Shirt", "T-Shirt", 29.99, 50, "SUP001", 10, 5),
        ("SKU002", "Blue Jeans", "Jeans", 79.99, 30, "SUP001", 8, 7),
        ("SKU003", "White Sneakers", "Sneakers", 129.99, 20, "SUP002", 5, 10),
        ("SKU004", "Black Dress", "Dress", 99.99, 15, "SUP003", 5, 7),
        ("SKU005", "Winter Jacket", "Jacket", 149.99, 10, "SUP002", 3, 14),
    ];
    let suppliers = [
        demo_supplier(
            ("SUP001", "Fashion Wholesale Co."),
            ("+880-1712-123456", "orders@fashionwholesale.com"),
            &["T-Shirt", "Jeans", "Dress"],
            4.5,
            5,
        ),
        demo_supplier(
            ("SUP002", "Premium Apparel Ltd."),
            ("+880-1812-654321", "supply@premiumapparel.com"),
            &["Sneakers", "Jacket"],
            4.8,
            10,
        ),
        demo_supplier(
            ("SUP003", "Quick Fashion Imports"),
            ("+880-1912-111222", "orders@quickfashion.com"),
            &["Dress", "T-Shirt"],
            4.2,
            4,
        ),
    ];

    CatalogData {
        products: products
            .iter()
            .map(|&(id, name, category, price, stock, supplier, rp, lead)| Product {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                base_price: price,
                stock,
                supplier_id: supplier.to_string(),
                reorder_point: rp,
                lead_time_days: lead,
                description: String::new(),
            })
            .collect(),
        suppliers: suppliers.into(),
    }
}

fn demo_supplier(
    (id, name): (&str, &str),
    (contact, email): (&str, &str),
    categories: &[&str],
    rating: f64,
    avg_lead_time_days: u32,
) -> Supplier {
    Supplier {
        id: id.to_string(),
        name: name.to_string(),
        contact: contact.to_string(),
        email: email.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        avg_lead_time_days,
        rating,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn to_u32(field: &str, value: Option<i64>) -> PipelineResult<Option<u32>> {
    value
        .map(|v| {
            u32::try_from(v).map_err(|_| {
                PipelineError::Catalog(format!("{} must be non-negative, got {}", field, v))
            })
        })
        .transpose()
}

/// Flexible integer deserializer: accepts "12", "12.0" and empty cells.
fn deserialize_opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    let s = match s {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(None),
    };
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(Some(v));
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 => Ok(Some(v as i64)),
        _ => Err(serde::de::Error::custom(format!(
            "expected integer value, got '{}'",
            trimmed
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
SKU,Name,Category,Stock,Price,Supplier
SKU00001,Sample Product 1,Electronics,120,19.99,MegaCorp Int.
SKU00002,Sample Product 2,Toys,3,5.50,FastSupply Co.
,Orphan,Books,1,2.00,Nobody
SKU00003,Sample Product 3,Books,7.0,12.00,
";

    const SAMPLE_JSON: &str = r#"{
        "products": [
            {"id": "SKU001", "name": "Red T-Shirt", "category": "T-Shirt", "base_price": 29.99,
             "stock": 50, "supplier_id": "SUP001", "reorder_point": 10, "lead_time_days": 5},
            {"sku": "SKU005", "name": "Winter Jacket", "category": "Jacket", "price": 149.99,
             "stock": 10, "supplier": "SUP002"}
        ],
        "suppliers": [
            {"id": "SUP001", "name": "Fashion Wholesale Co.", "contact": "+880-1712-123456",
             "email": "orders@fashionwholesale.com", "categories": ["T-Shirt", "Jeans"],
             "rating": 4.5, "avg_lead_time": 5}
        ]
    }"#;

    #[test]
    fn load_sample_csv_with_capitalised_headers() {
        let products = load_products_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].id, "SKU00001");
        assert_eq!(products[0].stock, 120);
        assert!((products[0].base_price - 19.99).abs() < 1e-9);
        assert_eq!(products[0].supplier_id, "MegaCorp Int.");
        assert_eq!(products[0].reorder_point, 10);
        assert_eq!(products[0].lead_time_days, 7);
        assert_eq!(products[2].stock, 7);
        assert_eq!(products[2].supplier_id, "Unknown");
    }

    #[test]
    fn csv_accepts_id_and_base_price_spelling() {
        let csv_data = "\
id,name,category,stock,base_price,supplier_id,reorder_point,lead_time_days
A1,Thing,Misc,4,10.0,SUP9,2,3
";
        let products = load_products_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(products[0].id, "A1");
        assert_eq!(products[0].supplier_id, "SUP9");
        assert_eq!(products[0].reorder_point, 2);
        assert_eq!(products[0].lead_time_days, 3);
    }

    #[test]
    fn csv_without_id_column_is_rejected() {
        let err = load_products_csv("name,stock\nx,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Catalog(_)));
    }

    #[test]
    fn csv_bad_stock_reports_line() {
        let err = load_products_csv("sku,stock\nA,many\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn json_products_and_suppliers() {
        let data = load_catalog_json(SAMPLE_JSON.as_bytes()).unwrap();
        assert_eq!(data.products.len(), 2);
        assert_eq!(data.products[1].id, "SKU005");
        assert!((data.products[1].base_price - 149.99).abs() < 1e-9);
        assert_eq!(data.products[1].supplier_id, "SUP002");
        assert_eq!(data.suppliers.len(), 1);
        assert_eq!(data.suppliers[0].avg_lead_time_days, 5);
        assert!(data.suppliers[0].categories.contains("Jeans"));
    }

    #[test]
    fn demo_catalog_links_every_product_to_a_supplier() {
        let data = demo_catalog();
        assert_eq!(data.products.len(), 5);
        for p in &data.products {
            assert!(data.suppliers.iter().any(|s| s.id == p.supplier_id), "{}", p.id);
        }
    }

    #[test]
    fn unsupported_extension_is_a_catalog_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.xml");
        std::fs::write(&path, "<catalog/>").unwrap();
        assert!(matches!(
            load_catalog_file(&path),
            Err(PipelineError::Catalog(_))
        ));
    }

    #[test]
    fn load_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(&path, SAMPLE_JSON).unwrap();
        let data = load_catalog_file(&path).unwrap();
        assert_eq!(data.products.len(), 2);
    }
}
