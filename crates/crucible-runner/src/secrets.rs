//! Secret resolution for a container's environment (§4.7 step 6, §4.10
//! [ADDED]).

use async_trait::async_trait;
use crucible_error::Error;
use crucible_manifest::SecretRef;
use std::collections::HashMap;

/// Resolves secret names declared on a manifest into values.
///
/// Call sites must build the audit `input` snapshot *before* invoking
/// this trait and merging its result into the container environment:
/// resolved values are never logged and never placed on the execution
/// record.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn resolve(&self, names: &[SecretRef]) -> Result<HashMap<String, String>, Error>;
}

/// Reads `CRUCIBLE_SECRET_<NAME>` environment variables. Suitable for
/// local development; production deployments should supply a vault-backed
/// `SecretSource` instead.
pub struct EnvSecretSource;

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn resolve(&self, names: &[SecretRef]) -> Result<HashMap<String, String>, Error> {
        let mut out = HashMap::with_capacity(names.len());
        for secret in names {
            let var = format!("CRUCIBLE_SECRET_{}", secret.name().to_uppercase());
            let value = std::env::var(&var)
                .map_err(|_| Error::not_found(format!("secret {}", secret.name())))?;
            out.insert(secret.name().to_string(), value);
        }
        Ok(out)
    }
}

/// Returns an empty map. Used when no secret store is configured
/// (§4.7 step 6: "if configured; otherwise empty").
pub struct NullSecretSource;

#[async_trait]
impl SecretSource for NullSecretSource {
    async fn resolve(&self, _names: &[SecretRef]) -> Result<HashMap<String, String>, Error> {
        Ok(HashMap::new())
    }
}
