use tracing::info;

use crate::error::Result;
use crate::pos::Pos;

pub fn get_categories(pos: &Pos) -> Result<Vec<String>> {
    pos.require_signed_in()?;
    Ok(pos.settings().categories.clone())
}

pub fn create_category(pos: &mut Pos, name: &str) -> Result<String> {
    pos.require_signed_in()?;
    let name = pos.commit(|state, _| state.settings.add_category(name))?;
    info!(category = %name, "Category created");
    Ok(name)
}

/// Removes the name only. Products filed under it keep the old category.
pub fn delete_category(pos: &mut Pos, name: &str) -> Result<()> {
    pos.require_signed_in()?;
    pos.commit(|state, _| state.settings.remove_category(name))?;

    let orphaned = pos
        .state()
        .products
        .iter()
        .filter(|p| p.category == name)
        .count();
    info!(category = %name, orphaned, "Category deleted");
    Ok(())
}
