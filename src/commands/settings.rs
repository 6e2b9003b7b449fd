use tracing::{info, warn};

use crate::error::Result;
use crate::models::{
    Currency, Language, PaymentMethod, PaymentMethodId, RestaurantInfo, RestaurantInfoPatch,
    Settings,
};
use crate::pos::Pos;
use crate::settings::check_login;

pub fn get_settings(pos: &Pos) -> Result<Settings> {
    pos.require_signed_in()?;
    Ok(pos.settings().clone())
}

pub fn update_currency(pos: &mut Pos, currency: Currency) -> Result<()> {
    pos.require_signed_in()?;
    pos.commit(|state, _| {
        state.settings.set_currency(currency);
        Ok(())
    })?;
    info!(?currency, "Currency updated");
    Ok(())
}

pub fn update_language(pos: &mut Pos, language: Language) -> Result<()> {
    pos.require_signed_in()?;
    pos.commit(|state, _| {
        state.settings.set_language(language);
        Ok(())
    })?;
    info!(?language, "Language updated");
    Ok(())
}

/// Returns whether the method is enabled after the toggle.
pub fn toggle_payment_method(pos: &mut Pos, id: PaymentMethodId) -> Result<bool> {
    pos.require_signed_in()?;
    let enabled = pos.commit(|state, _| state.settings.toggle_payment_method(id))?;
    info!(method = %id, enabled, "Payment method toggled");
    Ok(enabled)
}

pub fn get_enabled_payment_methods(pos: &Pos) -> Result<Vec<PaymentMethod>> {
    pos.require_signed_in()?;
    Ok(pos.settings().enabled_payment_methods().cloned().collect())
}

pub fn update_restaurant_info(pos: &mut Pos, patch: RestaurantInfoPatch) -> Result<RestaurantInfo> {
    pos.require_signed_in()?;
    let info = pos.commit(|state, _| {
        state.settings.apply_restaurant_patch(patch);
        Ok(state.settings.restaurant.clone())
    })?;
    info!(name = %info.name, "Restaurant info updated");
    Ok(info)
}

pub fn update_password(pos: &mut Pos, password: &str) -> Result<()> {
    pos.require_signed_in()?;
    pos.commit(|state, _| state.settings.set_password(password))?;
    info!("Password updated");
    Ok(())
}

/// Unlocks the till and records the restaurant name and password used.
pub fn login(pos: &mut Pos, restaurant_name: &str, password: &str) -> Result<()> {
    if let Err(err) = check_login(restaurant_name, password) {
        warn!(error = %err, "Login rejected");
        return Err(err);
    }

    let name = restaurant_name.trim().to_string();
    pos.commit(|state, _| {
        state.settings.restaurant.name = name.clone();
        state.settings.set_password(password)
    })?;
    pos.set_signed_in(true);

    info!(restaurant = %name, "Signed in");
    Ok(())
}

/// Locks the till again. Catalog, ledger and sessions are kept.
pub fn logout(pos: &mut Pos) {
    pos.set_signed_in(false);
    info!("Signed out");
}

pub fn is_signed_in(pos: &Pos) -> bool {
    pos.is_signed_in()
}
