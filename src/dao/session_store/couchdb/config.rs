//! Connection settings of the CouchDB session store.

use super::error::{CouchError, CouchResult};

/// Document id used when `COUCH_SESSION_DOC` is not set.
pub const DEFAULT_SESSION_DOC: &str = "trials-session";

/// Where the session document lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    /// Server root, e.g. `http://localhost:5984`, without a trailing slash.
    pub server: String,
    pub database: String,
    /// Id of the single document holding the session.
    pub document: String,
    /// Basic-auth user and password.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL` and `COUCH_DB`, plus the optional `COUCH_SESSION_DOC` and
    /// `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |var: &'static str| value(var).ok_or(CouchError::MissingEnvVar { var });

        Ok(Self {
            server: required("COUCH_BASE_URL")?.trim_end_matches('/').to_string(),
            database: required("COUCH_DB")?,
            document: value("COUCH_SESSION_DOC").unwrap_or_else(|| DEFAULT_SESSION_DOC.into()),
            credentials: value("COUCH_USERNAME").zip(value("COUCH_PASSWORD")),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_the_document_and_skips_partial_credentials() {
        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984/"),
            ("COUCH_DB", "trials"),
            ("COUCH_USERNAME", "admin"),
        ]))
        .unwrap();

        assert_eq!(config.server, "http://couch:5984");
        assert_eq!(config.document, DEFAULT_SESSION_DOC);
        assert_eq!(config.credentials, None);
    }

    #[test]
    fn blank_database_is_missing() {
        let err = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984"),
            ("COUCH_DB", " "),
        ]))
        .unwrap_err();

        assert!(matches!(err, CouchError::MissingEnvVar { var: "COUCH_DB" }));
    }
}
