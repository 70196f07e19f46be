//! Visitor identity: the session cookie, the Dub click id and the customer
//! id sent with every tracking call.

use tracing::{debug, warn};

use crate::client::{EventClient, SetOptions, COOKIE_HEADER_KEY};
use crate::config::CookieNames;
use crate::cookie::{decode_session_cookie, encode_session_cookie, read_named_cookie, SessionCookie};
use crate::event::McEvent;

/// Customer id used when nothing better is known.
pub const ANONYMOUS_CUSTOMER: &str = "anonymous";

/// Load the visitor's session record, minting and persisting a new one when the
/// cookie is missing or unusable, and attaching `customer_id` when the stored
/// record has none.
pub fn resolve_identity<C: EventClient + ?Sized>(
    client: &mut C,
    names: &CookieNames,
    customer_id: Option<&str>,
) -> SessionCookie {
    let customer_id = customer_id.filter(|id| !id.is_empty());

    let existing = client
        .get(&names.session)
        .and_then(|raw| match decode_session_cookie(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, cookie = %names.session, "discarding unreadable session cookie");
                None
            }
        })
        .filter(SessionCookie::has_session);

    match existing {
        Some(mut record) => {
            if let Some(id) = customer_id {
                if record.customer_id().is_none() {
                    record.customer_id = Some(id.to_string());
                    write_session(client, names, &record);
                }
            }
            record
        }
        None => {
            let record = SessionCookie::new(
                generate_session_id(),
                customer_id.map(str::to_string),
            );
            debug!(session_id = %record.session_id, "minted new session");
            write_session(client, names, &record);
            record
        }
    }
}

fn write_session<C: EventClient + ?Sized>(
    client: &mut C,
    names: &CookieNames,
    record: &SessionCookie,
) {
    match encode_session_cookie(record) {
        Ok(value) => client.set(&names.session, &value, SetOptions::infinite()),
        Err(e) => warn!(error = %e, "failed to encode session cookie"),
    }
}

/// Dub click id from the referral cookie, if the visitor has one.
pub fn resolve_click_id<C: EventClient + ?Sized>(
    client: &C,
    names: &CookieNames,
) -> Option<String> {
    let header = client.get(COOKIE_HEADER_KEY)?;
    read_named_cookie(&header, &names.click_id).map(str::to_string)
}

/// Customer id for an event: payload `customerId`, payload
/// `customerExternalId`, the session's customer id, the session id, then
/// [`ANONYMOUS_CUSTOMER`]. Always resolves (and may write) the session cookie.
pub fn resolve_customer_id<C: EventClient + ?Sized>(
    event: &McEvent,
    client: &mut C,
    names: &CookieNames,
) -> String {
    let supplied = event.payload.supplied_customer_id();
    let session = resolve_identity(client, names, supplied);

    supplied
        .map(str::to_string)
        .or_else(|| session.customer_id().map(str::to_string))
        .or_else(|| Some(session.session_id).filter(|id| !id.is_empty()))
        .unwrap_or_else(|| ANONYMOUS_CUSTOMER.to_string())
}

/// Random UUID-v4 session id.
///
/// Falls back to a non-cryptographic generator when the OS source fails.
/// Session ids only correlate visits and are never used as secrets.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    if let Err(e) = getrandom::fill(&mut bytes) {
        debug!(error = %e, "OS randomness unavailable, using fallback generator");
        fallback_random_bytes(&mut bytes);
    }
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

#[cfg(not(target_arch = "wasm32"))]
fn fallback_random_bytes(bytes: &mut [u8; 16]) {
    use rand::{rngs::SmallRng, RngCore, SeedableRng};
    use std::time::{SystemTime, UNIX_EPOCH};

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    SmallRng::seed_from_u64(seed ^ u64::from(std::process::id())).fill_bytes(bytes);
}

#[cfg(target_arch = "wasm32")]
fn fallback_random_bytes(bytes: &mut [u8; 16]) {
    for byte in bytes.iter_mut() {
        *byte = (js_sys::Math::random() * 256.0) as u8;
    }
}
