//! Per-call API key resolution.
//!
//! A resolver holds an ordered list of lookup sources and returns the first
//! key found. The environment variable always sits ahead of the inbound
//! `Authorization` header, so a process-wide key wins even when a caller
//! sends their own. Keys are re-resolved on every call: in hosted mode the
//! transport may serve concurrent callers with different credentials, so
//! nothing is cached.

use secrecy::SecretString;

use crate::error::DashScopeError;

/// One place an API key may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// A process-wide environment variable.
    Env,
    /// The `Authorization: Bearer <key>` header on the inbound call.
    AuthorizationHeader,
}

/// Ordered credential lookup over the configured sources.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    env_var: String,
    sources: Vec<CredentialSource>,
}

impl CredentialResolver {
    /// Resolver for local single-user deployments: environment only.
    /// Header lookup is skipped entirely, not treated as a failure.
    pub fn local(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            sources: vec![CredentialSource::Env],
        }
    }

    /// Resolver for hosted multi-caller deployments: environment first,
    /// then the caller's Authorization header.
    pub fn hosted(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            sources: vec![CredentialSource::Env, CredentialSource::AuthorizationHeader],
        }
    }

    /// The sources this resolver consults, in order.
    pub fn sources(&self) -> &[CredentialSource] {
        &self.sources
    }

    /// Resolve an API key for one call.
    ///
    /// `authorization` is the raw header value from the inbound request, if
    /// any. The `Bearer ` scheme prefix is required and stripped; a header
    /// using any other scheme is rejected rather than passed through.
    pub fn resolve(&self, authorization: Option<&str>) -> Result<SecretString, DashScopeError> {
        for source in &self.sources {
            match source {
                CredentialSource::Env => {
                    if let Ok(key) = std::env::var(&self.env_var) {
                        if !key.is_empty() {
                            return Ok(SecretString::from(key));
                        }
                    }
                }
                CredentialSource::AuthorizationHeader => {
                    if let Some(value) = authorization {
                        let token = value.strip_prefix("Bearer ").ok_or_else(|| {
                            DashScopeError::Authentication(
                                "Authorization header must use the Bearer scheme".to_string(),
                            )
                        })?;
                        if !token.is_empty() {
                            return Ok(SecretString::from(token.to_string()));
                        }
                    }
                }
            }
        }

        Err(DashScopeError::Authentication(format!(
            "no API key found; set the {} environment variable or supply an Authorization header",
            self.env_var
        )))
    }
}
