use crate::error::{Error, Result, ValidationError};
use crate::models::{Currency, Language, PaymentMethod, PaymentMethodId, RestaurantInfoPatch, Settings};
use crate::money::currency_symbol;

/// Shared access password of the till. A screen lock for the front of house,
/// not an authentication mechanism.
pub const DEFAULT_PASSWORD: &str = "demo123";

impl Settings {
    pub fn enabled_payment_methods(&self) -> impl Iterator<Item = &PaymentMethod> {
        self.payment_methods.iter().filter(|m| m.enabled)
    }

    pub fn is_payment_method_enabled(&self, id: PaymentMethodId) -> bool {
        self.enabled_payment_methods().any(|m| m.id == id)
    }

    pub fn payment_method_name(&self, id: PaymentMethodId) -> String {
        self.payment_methods
            .iter()
            .find(|m| m.id == id)
            .map_or_else(|| id.to_string(), |m| m.name.clone())
    }

    /// Flips the enabled flag and returns the new value.
    pub fn toggle_payment_method(&mut self, id: PaymentMethodId) -> Result<bool> {
        let method = self
            .payment_methods
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::not_found("Payment method", id.as_str()))?;
        method.enabled = !method.enabled;
        Ok(method.enabled)
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn currency_symbol(&self) -> &'static str {
        currency_symbol(self.currency)
    }

    /// Merges the fields present in `patch` into the restaurant identity.
    pub fn apply_restaurant_patch(&mut self, patch: RestaurantInfoPatch) {
        let info = &mut self.restaurant;
        if let Some(name) = patch.name {
            info.name = name;
        }
        if let Some(address) = patch.address {
            info.address = address;
        }
        if let Some(phone) = patch.phone {
            info.phone = phone;
        }
    }

    pub fn set_password(&mut self, password: &str) -> Result<()> {
        let password = password.trim();
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password").into());
        }
        self.restaurant.password = password.to_string();
        Ok(())
    }
}

/// Checks a login attempt against the shared password.
///
/// The comparison is against [`DEFAULT_PASSWORD`], not the stored one.
/// Changing the stored password does not change what unlocks the screen.
pub fn check_login(restaurant_name: &str, password: &str) -> Result<()> {
    if restaurant_name.trim().is_empty() {
        return Err(ValidationError::EmptyField("restaurant name").into());
    }
    if password != DEFAULT_PASSWORD {
        return Err(Error::InvalidPassword);
    }
    Ok(())
}
