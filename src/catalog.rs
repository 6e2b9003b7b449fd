//! Product catalog and category names.
//!
//! Category names live in [`Settings::categories`]; products reference them by
//! name. Removing a category does not touch products that still use it.

use crate::error::{Error, Result, ValidationError};
use crate::models::{Product, Settings};
use crate::money::require_non_negative;

fn validate_product(product: &Product, settings: &Settings) -> Result<()> {
    if product.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("product name").into());
    }
    require_non_negative("price", product.price)?;
    if !settings.has_category(&product.category) {
        return Err(ValidationError::UnknownCategory(product.category.clone()).into());
    }
    Ok(())
}

pub fn find_product<'a>(products: &'a [Product], id: &str) -> Option<&'a Product> {
    products.iter().find(|p| p.id == id)
}

/// Adds a new product. An existing id is a conflict, never an overwrite.
pub fn add_product(products: &mut Vec<Product>, settings: &Settings, product: Product) -> Result<()> {
    if find_product(products, &product.id).is_some() {
        return Err(ValidationError::DuplicateProduct(product.id).into());
    }
    validate_product(&product, settings)?;
    products.push(product);
    Ok(())
}

pub fn update_product(products: &mut [Product], settings: &Settings, product: Product) -> Result<()> {
    validate_product(&product, settings)?;
    let existing = products
        .iter_mut()
        .find(|p| p.id == product.id)
        .ok_or_else(|| Error::not_found("Product", &product.id))?;
    *existing = product;
    Ok(())
}

pub fn remove_product(products: &mut Vec<Product>, id: &str) -> Result<Product> {
    let index = products
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| Error::not_found("Product", id))?;
    Ok(products.remove(index))
}

pub fn products_in_category<'a>(products: &'a [Product], category: &'a str) -> impl Iterator<Item = &'a Product> {
    products.iter().filter(move |p| p.category == category)
}

impl Settings {
    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    /// Appends a category, keeping insertion order. Returns the stored (trimmed) name.
    pub fn add_category(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("category name").into());
        }
        if self.has_category(name) {
            return Err(ValidationError::DuplicateCategory(name.to_string()).into());
        }
        self.categories.push(name.to_string());
        Ok(name.to_string())
    }

    pub fn remove_category(&mut self, name: &str) -> Result<()> {
        let index = self
            .categories
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::not_found("Category", name))?;
        self.categories.remove(index);
        Ok(())
    }
}
