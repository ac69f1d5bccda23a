//! Seed the catalog from a directory of product photos.
//!
//! Each `.jpg` file becomes one product named after the file, with the
//! image stored as `products/<file name>`. Files already in the catalog are
//! skipped, so the command can be re-run after adding photos.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use petal_core::Price;
use petal_gateway::models::NewProduct;

use super::{CliError, store};

/// Directory prefix of product images under the media root.
const IMAGE_PREFIX: &str = "products";

/// Build a product for an image file, `None` if it is not a `.jpg`.
fn product_for_file(file_name: &str, price: Price) -> Option<NewProduct> {
    let stem = file_name.strip_suffix(".jpg")?;
    if stem.is_empty() {
        return None;
    }
    let name = stem.replace(['_', '-'], " ").trim().to_string();
    Some(NewProduct {
        name: if name.is_empty() { stem.to_string() } else { name },
        price,
        image: format!("{IMAGE_PREFIX}/{file_name}"),
    })
}

/// Create a product for every new `.jpg` in `dir`.
///
/// # Errors
///
/// Returns an error if the price is invalid, the directory cannot be read
/// or the store fails.
pub async fn products(dir: &Path, price: &str) -> Result<usize, CliError> {
    let price: Price = price
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("price: {price}")))?;
    if price.is_negative() {
        return Err(CliError::InvalidArgument("price must not be negative".to_string()));
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            files.push(name.to_string());
        }
    }
    files.sort();

    let store = store().await?;
    let existing: HashSet<String> = store
        .list_products()
        .await?
        .into_iter()
        .map(|p| p.image)
        .collect();

    let mut created = 0;
    for product in files.iter().filter_map(|f| product_for_file(f, price)) {
        if existing.contains(&product.image) {
            continue;
        }
        let product = store
            .create_product(product)
            .await?;
        info!(product_id = %product.id, name = %product.name, "Product created");
        created += 1;
    }

    info!(created, dir = %dir.display(), "Catalog seeded");
    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_for_file() {
        let price: Price = "100.00".parse().unwrap();
        let product = product_for_file("red_roses-bouquet.jpg", price).unwrap();
        assert_eq!(product.name, "red roses bouquet");
        assert_eq!(product.image, "products/red_roses-bouquet.jpg");
        assert_eq!(product.price, price);
    }

    #[test]
    fn test_skips_other_files() {
        let price = Price::ZERO;
        assert!(product_for_file("notes.txt", price).is_none());
        assert!(product_for_file("photo.png", price).is_none());
        assert!(product_for_file(".jpg", price).is_none());
    }

    #[test]
    fn test_separator_only_name_keeps_stem() {
        let product = product_for_file("__.jpg", Price::ZERO).unwrap();
        assert_eq!(product.name, "__");
    }
}
