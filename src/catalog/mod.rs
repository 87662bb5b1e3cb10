//! Brand product catalog: categories, product names and product images


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Products shown when nothing in the retrieved text names a product
const FALLBACK_SIMILAR: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Catalog {
    pub brand: String,
    /// Directory holding `<product name>.jpg` files
    pub image_dir: PathBuf,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub products: Vec<String>,
}

/// A product image and whether it is on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub product: String,
    pub path: PathBuf,
    pub exists: bool,
}

impl Default for Catalog {
    fn default() -> Self {
        let category = |name: &str, products: &[&str]| Category {
            name: name.to_string(),
            products: products.iter().map(|p| (*p).to_string()).collect(),
        };

        Self {
            brand: "CanPrev".to_string(),
            image_dir: PathBuf::from("images"),
            categories: vec![
                category(
                    "Lifestyle",
                    &[
                        "Curcumin Unlocked",
                        "Active Multi Drink Mix",
                        "Fibre Feel",
                        "Collagen Full Spectrum Powder",
                        "L-Glycine Vegan Amino Acid",
                    ],
                ),
                category(
                    "Health Goals",
                    &[
                        "Myco 10 Mushroom Complex",
                        "K2Drops",
                        "Myco-Inosital",
                        "Green Up! with Grams",
                        "Lipsomal Milk Thistle Coconut",
                    ],
                ),
                category(
                    "Dietary Preferences",
                    &[
                        "Collagen Beauty powder",
                        "Lipsomal curcumin 100 Peach",
                        "Magnesium Bis Blueberry",
                        "L-Glutamine Vegan Amino Acid",
                        "CP-Lipsomals-Quercetin",
                    ],
                ),
                category(
                    "By Products",
                    &[
                        "CP-ElectroMagEfferescentDrink",
                        "Lipsomal Magnesium 50 Salted Caramel",
                        "CP-ElderC Liquid",
                        "CP-Post-BiotikImmuno Biotics",
                        "CPB-Silicon Beauty Liquid",
                    ],
                ),
            ],
        }
    }
}

impl Catalog {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|c| c.products.is_empty())
    }

    /// Every product name in catalog order, without duplicates
    #[inline]
    pub fn products(&self) -> Vec<&str> {
        let mut products: Vec<&str> = Vec::new();
        for name in self.categories.iter().flat_map(|c| &c.products) {
            if !products.contains(&name.as_str()) {
                products.push(name.as_str());
            }
        }
        products
    }

    #[inline]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Catalog spelling of `name`, matched case-insensitively
    #[inline]
    pub fn find_product(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.products()
            .into_iter()
            .find(|product| product.to_lowercase() == wanted)
    }

    #[inline]
    pub fn image_path(&self, product: &str) -> PathBuf {
        self.image_dir.join(format!("{product}.jpg"))
    }

    /// Image paths for every product, flagging the ones missing on disk
    #[inline]
    pub fn images(&self) -> Vec<ProductImage> {
        self.products()
            .into_iter()
            .map(|product| {
                let path = self.image_path(product);
                ProductImage {
                    product: product.to_string(),
                    exists: is_file(&path),
                    path,
                }
            })
            .collect()
    }

    /// Products named in `text` (case-insensitive), or the first few
    /// products when none are
    #[inline]
    pub fn similar_products(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        let products = self.products();

        let found: Vec<String> = products
            .iter()
            .filter(|product| haystack.contains(&product.to_lowercase()))
            .map(|product| (*product).to_string())
            .collect();

        if found.is_empty() {
            products
                .into_iter()
                .take(FALLBACK_SIMILAR)
                .map(str::to_string)
                .collect()
        } else {
            found
        }
    }
}

fn is_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| m.is_file())
}
