use tracing::info;
use uuid::Uuid;

use crate::catalog;
use crate::error::{Error, Result};
use crate::models::{CreateProduct, Product, UpdateProduct};
use crate::pos::Pos;

pub fn get_products(pos: &Pos) -> Result<Vec<Product>> {
    pos.require_signed_in()?;
    let mut products = pos.state().products.clone();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
}

pub fn get_products_by_category(pos: &Pos, category: &str) -> Result<Vec<Product>> {
    pos.require_signed_in()?;
    Ok(catalog::products_in_category(&pos.state().products, category)
        .cloned()
        .collect())
}

pub fn get_product(pos: &Pos, id: &str) -> Result<Product> {
    pos.require_signed_in()?;
    catalog::find_product(&pos.state().products, id)
        .cloned()
        .ok_or_else(|| Error::not_found("Product", id))
}

pub fn create_product(pos: &mut Pos, product: CreateProduct) -> Result<Product> {
    pos.require_signed_in()?;
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: product.name.trim().to_string(),
        price: product.price,
        category: product.category,
        image: product.image.unwrap_or_default(),
    };

    pos.commit(|state, _| {
        catalog::add_product(&mut state.products, &state.settings, product.clone())
    })?;

    info!(id = %product.id, name = %product.name, price = %product.price, "Product created");
    Ok(product)
}

/// Edits the catalog entry only. Lines already rung up keep the name and price
/// they were added with.
pub fn update_product(pos: &mut Pos, product: UpdateProduct) -> Result<Product> {
    pos.require_signed_in()?;
    let product = Product {
        id: product.id,
        name: product.name.trim().to_string(),
        price: product.price,
        category: product.category,
        image: product.image,
    };

    pos.commit(|state, _| {
        catalog::update_product(&mut state.products, &state.settings, product.clone())
    })?;

    info!(id = %product.id, price = %product.price, "Product updated");
    Ok(product)
}

pub fn delete_product(pos: &mut Pos, id: &str) -> Result<()> {
    pos.require_signed_in()?;
    let removed = pos.commit(|state, _| catalog::remove_product(&mut state.products, id))?;
    info!(id = %removed.id, name = %removed.name, "Product deleted");
    Ok(())
}
