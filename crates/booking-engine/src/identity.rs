//! Client identity resolution.
//!
//! A person may reach us by phone, by messenger account, or both, and the
//! two identifiers can arrive at different times. Resolution converges them
//! onto one client row: the insert is attempted first and, if either unique
//! identifier collides, the existing row is found by external id and then
//! by canonical phone.

use tracing::{error, info, warn};

use crate::error::{BookingError, Result};
use crate::phone::normalize_phone;
use crate::store::{ClientInsert, Store};
use crate::types::ClientId;

/// Return the id of the client identified by `phone` / `external_id`,
/// creating the client if neither identifier is known.
///
/// When the client is found by phone and has no external id yet, the given
/// external id is recorded on it. An external id already present is never
/// overwritten.
///
/// # Errors
/// - `InvalidInput` for an empty name or an unusable phone.
/// - `IdentityResolutionFailed` if an identifier collided on insert but no
///   row can be found by either identifier.
pub fn resolve_or_create<S: Store + ?Sized>(
    store: &S,
    name: &str,
    phone: &str,
    external_id: Option<i64>,
) -> Result<ClientId> {
    let name = clean_name(name)?;
    let phone = normalize_phone(phone)?;

    match store.insert_client(&name, &phone, external_id)? {
        ClientInsert::Inserted(id) => {
            info!(client = %id, has_external_id = external_id.is_some(), "client created");
            Ok(id)
        }
        ClientInsert::Duplicate => {
            warn!(?external_id, "client identifiers already registered, resolving");

            if let Some(ext) = external_id {
                if let Some(client) = store.find_client_by_external_id(ext)? {
                    return Ok(client.id);
                }
            }

            if let Some(client) = store.find_client_by_phone(&phone)? {
                if let (Some(ext), None) = (external_id, client.external_id) {
                    if store.backfill_external_id(client.id, ext)? {
                        info!(client = %client.id, "external id attached to existing client");
                    }
                }
                return Ok(client.id);
            }

            error!(?external_id, "identifier collision without a matching client");
            Err(BookingError::IdentityResolutionFailed { phone })
        }
    }
}

/// Look up an existing client without creating one. The external id is
/// tried first, then the canonical phone.
pub fn find_client<S: Store + ?Sized>(
    store: &S,
    phone: Option<&str>,
    external_id: Option<i64>,
) -> Result<Option<ClientId>> {
    if let Some(ext) = external_id {
        if let Some(client) = store.find_client_by_external_id(ext)? {
            return Ok(Some(client.id));
        }
    }
    if let Some(phone) = phone {
        let phone = normalize_phone(phone)?;
        if let Some(client) = store.find_client_by_phone(&phone)? {
            return Ok(Some(client.id));
        }
    }
    Ok(None)
}

/// Trim and collapse inner whitespace.
fn clean_name(name: &str) -> Result<String> {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return Err(BookingError::InvalidInput("client name is empty".to_string()));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_tidied() {
        assert_eq!(clean_name("  Anna   Petrova ").unwrap(), "Anna Petrova");
        assert!(clean_name(" \t ").is_err());
    }
}
