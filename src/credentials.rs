//! API credentials
//!
//! # Environment Variables
//!
//! - `API_KEY`, `API_SECRET`: application key pair
//! - `ACCESS_KEY`, `ACCESS_SECRET`: user access token pair
//!
//! Any value that is unset (or blank) is asked for with a masked prompt.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to read {label} from terminal: {source}")]
    Prompt {
        label: &'static str,
        #[source]
        source: dialoguer::Error,
    },

    #[error("{label} must not be empty")]
    Empty { label: &'static str },
}

/// (environment variable, prompt label)
const FIELDS: [(&str, &str); 4] = [
    ("API_KEY", "API key"),
    ("API_SECRET", "API secret"),
    ("ACCESS_KEY", "Access token"),
    ("ACCESS_SECRET", "Access secret"),
];

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

// Never print secrets, even at trace level.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("access_token", &"***")
            .field("access_secret", &"***")
            .finish()
    }
}

impl Credentials {
    /// Read from the environment, prompting on the terminal for gaps.
    pub fn from_env_or_prompt() -> Result<Self, CredentialError> {
        Self::resolve(
            |var| std::env::var(var).ok(),
            |label| {
                dialoguer::Password::new()
                    .with_prompt(label)
                    .interact()
                    .map_err(|source| CredentialError::Prompt { label, source })
            },
        )
    }

    /// Always prompt, ignoring the environment. Used after a rejected login.
    pub fn prompt() -> Result<Self, CredentialError> {
        Self::resolve(
            |_| None,
            |label| {
                dialoguer::Password::new()
                    .with_prompt(label)
                    .interact()
                    .map_err(|source| CredentialError::Prompt { label, source })
            },
        )
    }

    /// Resolve each field from `lookup`, falling back to `prompt`.
    pub fn resolve<L, P>(lookup: L, mut prompt: P) -> Result<Self, CredentialError>
    where
        L: Fn(&str) -> Option<String>,
        P: FnMut(&'static str) -> Result<String, CredentialError>,
    {
        let mut values = Vec::with_capacity(FIELDS.len());
        for (var, label) in FIELDS {
            let value = match lookup(var).filter(|v| !v.trim().is_empty()) {
                Some(v) => v,
                None => prompt(label)?,
            };
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(CredentialError::Empty { label });
            }
            values.push(value);
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            api_key: next(),
            api_secret: next(),
            access_token: next(),
            access_secret: next(),
        })
    }
}
