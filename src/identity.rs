//! Deterministic entity identifiers.
//!
//! Every service, service instance, and endpoint gets an id computed from
//! its identifying attributes. Independent nodes derive the same id for the
//! same logical entity without coordination, so these functions must stay
//! pure and stable across releases.
//!
//! Name parts are Base64-encoded before joining. The separators (`.`, `_`,
//! `@`) are outside the Base64 alphabet, so a name that itself contains a
//! separator cannot alias a different entity.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Errors that can occur while building or analyzing identifiers.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("entity name must not be empty")]
    EmptyName,

    #[error("service id must not be empty")]
    EmptyServiceId,

    #[error("malformed {kind} id: {id}")]
    Malformed { kind: &'static str, id: String },
}

/// Decomposed service identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdParts {
    pub name: String,
    pub is_normal: bool,
}

/// Decomposed service instance identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdParts {
    pub service_id: String,
    pub token: String,
    pub name: String,
}

/// Decomposed endpoint identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointIdParts {
    pub service_id: String,
    pub name: String,
}

/// Build the id of a logical service.
///
/// `is_normal` distinguishes services observed through their own agents from
/// virtual ones inferred from peer traffic; both kinds require a name.
pub fn service_id(name: &str, is_normal: bool) -> Result<String> {
    if name.is_empty() {
        return Err(IdentityError::EmptyName);
    }
    Ok(format!(
        "{}.{}",
        BASE64.encode(name),
        if is_normal { 1 } else { 0 }
    ))
}

/// Build the id of one running instance of a service.
///
/// `token` is the agent-supplied registration token (usually a UUID) that
/// keeps instances sharing a display name distinct. Re-registration with the
/// same token yields the same id.
pub fn instance_id(service_id: &str, name: &str, token: &str) -> Result<String> {
    if service_id.is_empty() {
        return Err(IdentityError::EmptyServiceId);
    }
    if name.is_empty() || token.is_empty() {
        return Err(IdentityError::EmptyName);
    }
    Ok(format!(
        "{}_{}@{}",
        service_id,
        BASE64.encode(token),
        BASE64.encode(name)
    ))
}

/// Build the id of an endpoint under a service.
pub fn endpoint_id(service_id: &str, name: &str) -> Result<String> {
    if service_id.is_empty() {
        return Err(IdentityError::EmptyServiceId);
    }
    if name.is_empty() {
        return Err(IdentityError::EmptyName);
    }
    Ok(format!("{}_{}", service_id, BASE64.encode(name)))
}

/// Split an agent-registered instance name into (token, display name).
///
/// Agents conventionally register as `<token>@<host>`; a name without the
/// marker acts as its own token.
pub fn split_instance_name(registered: &str) -> (&str, &str) {
    match registered.split_once('@') {
        Some((token, name)) if !token.is_empty() && !name.is_empty() => (token, name),
        _ => (registered, registered),
    }
}

/// Invert [`service_id`].
pub fn analyze_service_id(id: &str) -> Result<ServiceIdParts> {
    let malformed = || IdentityError::Malformed {
        kind: "service",
        id: id.to_string(),
    };
    let (encoded, flag) = id.rsplit_once('.').ok_or_else(malformed)?;
    let is_normal = match flag {
        "1" => true,
        "0" => false,
        _ => return Err(malformed()),
    };
    Ok(ServiceIdParts {
        name: decode_part(encoded, "service", id)?,
        is_normal,
    })
}

/// Invert [`instance_id`].
pub fn analyze_instance_id(id: &str) -> Result<InstanceIdParts> {
    let malformed = || IdentityError::Malformed {
        kind: "instance",
        id: id.to_string(),
    };
    let (service_id, rest) = id.split_once('_').ok_or_else(malformed)?;
    let (token, name) = rest.split_once('@').ok_or_else(malformed)?;
    Ok(InstanceIdParts {
        service_id: service_id.to_string(),
        token: decode_part(token, "instance", id)?,
        name: decode_part(name, "instance", id)?,
    })
}

/// Invert [`endpoint_id`].
pub fn analyze_endpoint_id(id: &str) -> Result<EndpointIdParts> {
    let (service_id, encoded) = id.split_once('_').ok_or_else(|| IdentityError::Malformed {
        kind: "endpoint",
        id: id.to_string(),
    })?;
    Ok(EndpointIdParts {
        service_id: service_id.to_string(),
        name: decode_part(encoded, "endpoint", id)?,
    })
}

fn decode_part(encoded: &str, kind: &'static str, id: &str) -> Result<String> {
    let bytes = BASE64.decode(encoded).map_err(|_| IdentityError::Malformed {
        kind,
        id: id.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|_| IdentityError::Malformed {
        kind,
        id: id.to_string(),
    })
}
