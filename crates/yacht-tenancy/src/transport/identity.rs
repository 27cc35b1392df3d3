//! Header-based identity for the HTTP surface
//!
//! Stands in for an authenticating gateway: the principal, its role and home
//! tenant arrive as request headers and are trusted as given. Tenant
//! resolution still applies, so an override header from a non-admin role is
//! ignored.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use super::http::AppState;
use crate::constants::{ADMIN_WIDE, headers};
use crate::error::{Error, Result};
use crate::tenant::{Principal, ResolvedContext, Role, TenantHints, TenantId, TenantOverride};
use crate::translate::TranslatedError;

fn header<'a>(map: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
    map.get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| Error::InvalidPrincipal(format!("{name} is not valid text")))
        })
        .transpose()
}

/// Principal and tenant hints carried by the request headers
pub fn identity_from_headers(map: &HeaderMap) -> Result<(Principal, TenantHints)> {
    let id = header(map, headers::PRINCIPAL_ID)?
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidPrincipal(format!("missing {}", headers::PRINCIPAL_ID)))?;

    let role: Role = header(map, headers::PRINCIPAL_ROLE)?
        .ok_or_else(|| Error::InvalidPrincipal(format!("missing {}", headers::PRINCIPAL_ROLE)))?
        .parse()?;

    let mut principal = Principal::new(id, role);
    if let Some(home) = header(map, headers::HOME_TENANT)?.filter(|h| !h.is_empty()) {
        principal = principal.with_home_tenant(TenantId::new(home)?);
    }

    let mut hints = TenantHints::none();
    if let Some(requested) = header(map, headers::TENANT_OVERRIDE)?.filter(|t| !t.is_empty()) {
        let tenant = if requested == ADMIN_WIDE {
            TenantOverride::AdminWide
        } else {
            TenantOverride::Tenant(TenantId::new(requested)?)
        };
        hints = hints.with_override(tenant);
    }

    Ok((principal, hints))
}

/// Resolved tenant context of the current request
#[derive(Debug)]
pub struct RequestContext(pub ResolvedContext);

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = TranslatedError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let resolved = identity_from_headers(&parts.headers)
            .and_then(|(principal, hints)| state.resolver().resolve(principal, &hints));

        match resolved {
            Ok(ctx) => {
                tracing::debug!(
                    principal.id = ctx.principal().id(),
                    principal.role = %ctx.principal().role(),
                    tenant.effective = %ctx.effective_tenant(),
                    "resolved tenant"
                );
                Ok(Self(ctx))
            }
            Err(e) => Err(state.translator().translate(&e)),
        }
    }
}
