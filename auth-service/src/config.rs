//! Service configuration module.
//!
//! This module loads the auth service configuration from environment
//! variables.
//!
//! # Environment Variables
//!
//! - `AUTH_LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `AUTH_JWT_ALGORITHM`: `HS256` or `RS256` (default: `HS256`)
//! - `AUTH_JWT_SECRET` / `AUTH_JWT_SECRET_FILE`: HS256 secret, inline or from a file
//! - `AUTH_JWT_PRIVATE_KEY_FILE` / `AUTH_JWT_PUBLIC_KEY_FILE`: RS256 PEM files
//! - `AUTH_JWT_ISSUER`: Issuer claim (default: `auth-service`)
//! - `AUTH_ACCESS_TOKEN_TTL_SECS`: Access token lifetime (default: `900`)
//! - `AUTH_REFRESH_TOKEN_TTL_SECS`: Refresh token lifetime (default: `604800`)
//! - `AUTH_PRUNE_INTERVAL_SECS`: Revocation prune period (default: `60`)
//! - `AUTH_ARGON2_MEMORY_KIB`, `AUTH_ARGON2_ITERATIONS`, `AUTH_ARGON2_PARALLELISM`:
//!   Hashing cost (default: `19456`, `2`, `1`)
//!
//! # Invariants
//!
//! - Key material is parsed and checked at load time, so a running service
//!   never holds keys it cannot use.
//! - All durations are at least one second.

use std::path::Path;
use std::time::Duration;

use crate::auth::{HashParams, KeyError, KeyMaterial, SigningKeys, TokenPolicy};

const LISTEN_PORT: &str = "AUTH_LISTEN_PORT";
const JWT_ALGORITHM: &str = "AUTH_JWT_ALGORITHM";
const JWT_SECRET: &str = "AUTH_JWT_SECRET";
const JWT_SECRET_FILE: &str = "AUTH_JWT_SECRET_FILE";
const JWT_PRIVATE_KEY_FILE: &str = "AUTH_JWT_PRIVATE_KEY_FILE";
const JWT_PUBLIC_KEY_FILE: &str = "AUTH_JWT_PUBLIC_KEY_FILE";
const JWT_ISSUER: &str = "AUTH_JWT_ISSUER";
const ACCESS_TOKEN_TTL_SECS: &str = "AUTH_ACCESS_TOKEN_TTL_SECS";
const REFRESH_TOKEN_TTL_SECS: &str = "AUTH_REFRESH_TOKEN_TTL_SECS";
const PRUNE_INTERVAL_SECS: &str = "AUTH_PRUNE_INTERVAL_SECS";
const ARGON2_MEMORY_KIB: &str = "AUTH_ARGON2_MEMORY_KIB";
const ARGON2_ITERATIONS: &str = "AUTH_ARGON2_ITERATIONS";
const ARGON2_PARALLELISM: &str = "AUTH_ARGON2_PARALLELISM";

/// Service configuration.
///
/// # Post-conditions
///
/// - `key_material` parses into valid [`SigningKeys`].
/// - `token_policy` lifetimes and `prune_interval` are non-zero.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Signing key material.
    pub key_material: KeyMaterial,
    /// Token lifetimes and issuer.
    pub token_policy: TokenPolicy,
    /// Time between revocation prune passes.
    pub prune_interval: Duration,
    /// Argon2id cost parameters for new hashes.
    pub hash_params: HashParams,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(name: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        message: message.into(),
    }
}

impl ServiceConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default prune interval in seconds.
    pub const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No signing key is configured for the selected algorithm
    /// - A key file cannot be read or holds invalid key material
    /// - A numeric variable is set but not a valid number
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let listen_port = match get(LISTEN_PORT) {
            Some(value) => value.trim().parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
                invalid(
                    LISTEN_PORT,
                    format!("'{value}' is not a valid port number (must be 1-65535)"),
                )
            })?,
            None => Self::DEFAULT_PORT,
        };

        let key_material = load_key_material(&get)?;
        SigningKeys::from_material(&key_material)
            .map_err(|e| invalid(key_variable(&e), e.to_string()))?;

        let defaults = TokenPolicy::default();
        let token_policy = TokenPolicy {
            access_ttl: secs_or(&get, ACCESS_TOKEN_TTL_SECS, defaults.access_ttl)?,
            refresh_ttl: secs_or(&get, REFRESH_TOKEN_TTL_SECS, defaults.refresh_ttl)?,
            issuer: get(JWT_ISSUER).map_or(defaults.issuer, |v| v.trim().to_string()),
        };
        if token_policy.refresh_ttl < token_policy.access_ttl {
            return Err(invalid(
                REFRESH_TOKEN_TTL_SECS,
                "must not be shorter than the access token lifetime",
            ));
        }

        let prune_interval = secs_or(
            &get,
            PRUNE_INTERVAL_SECS,
            Duration::from_secs(Self::DEFAULT_PRUNE_INTERVAL_SECS),
        )?;

        let recommended = HashParams::RECOMMENDED;
        let hash_params = HashParams {
            memory_kib: number_or(&get, ARGON2_MEMORY_KIB, recommended.memory_kib)?,
            iterations: number_or(&get, ARGON2_ITERATIONS, recommended.iterations)?,
            parallelism: number_or(&get, ARGON2_PARALLELISM, recommended.parallelism)?,
        };

        Ok(Self {
            listen_port,
            key_material,
            token_policy,
            prune_interval,
            hash_params,
        })
    }
}

fn load_key_material<G>(get: &G) -> Result<KeyMaterial, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let algorithm = get(JWT_ALGORITHM).unwrap_or_else(|| "HS256".to_string());
    match algorithm.trim().to_ascii_uppercase().as_str() {
        "HS256" => {
            let secret = match (get(JWT_SECRET), get(JWT_SECRET_FILE)) {
                (Some(secret), None) => secret,
                (None, Some(path)) => read_file(JWT_SECRET_FILE, &path)?.trim_end().to_string(),
                (Some(_), Some(_)) => {
                    return Err(invalid(
                        JWT_SECRET,
                        format!("set only one of {JWT_SECRET} and {JWT_SECRET_FILE}"),
                    ));
                }
                (None, None) => return Err(ConfigError::MissingEnvVar(JWT_SECRET.to_string())),
            };
            Ok(KeyMaterial::Hs256 {
                secret: secret.into_bytes(),
            })
        }
        "RS256" => {
            let private_path = get(JWT_PRIVATE_KEY_FILE)
                .ok_or_else(|| ConfigError::MissingEnvVar(JWT_PRIVATE_KEY_FILE.to_string()))?;
            let public_path = get(JWT_PUBLIC_KEY_FILE)
                .ok_or_else(|| ConfigError::MissingEnvVar(JWT_PUBLIC_KEY_FILE.to_string()))?;
            Ok(KeyMaterial::Rs256 {
                private_key_pem: read_file(JWT_PRIVATE_KEY_FILE, &private_path)?,
                public_key_pem: read_file(JWT_PUBLIC_KEY_FILE, &public_path)?,
            })
        }
        other => Err(invalid(
            JWT_ALGORITHM,
            format!("'{other}' is not supported (expected HS256 or RS256)"),
        )),
    }
}

/// The variable responsible for a key error.
const fn key_variable(error: &KeyError) -> &'static str {
    match error {
        KeyError::EmptySecret | KeyError::SecretTooShort(_) => JWT_SECRET,
        KeyError::InvalidRs256PrivateKey(_) => JWT_PRIVATE_KEY_FILE,
        KeyError::InvalidRs256PublicKey(_) => JWT_PUBLIC_KEY_FILE,
    }
}

fn read_file(name: &str, path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(Path::new(path.trim()))
        .map_err(|e| invalid(name, format!("cannot read '{path}': {e}")))
}

fn number_or<G, T>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| invalid(name, format!("'{value}' is not a valid number"))),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, name: &str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs = number_or(get, name, default.as_secs())?;
    if secs == 0 {
        return Err(invalid(name, "must be at least 1 second"));
    }
    Ok(Duration::from_secs(secs))
}
