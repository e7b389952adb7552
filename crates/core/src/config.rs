//! Session configuration and credential fingerprinting.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// Validated credential/configuration tuple for one logical session.
///
/// Construction goes through [`SessionConfig::from_parts`] so that a missing
/// field is reported before anything expensive happens. The tuple identifies
/// the caller's right to one engine session: two requests with an identical
/// tuple share a session, any differing field gets its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub engine_api_key: String,
    pub engine_project_id: String,
    pub model_api_key: String,
    /// Optional persistent engine context to attach the session to.
    pub context_id: Option<String>,
}

impl SessionConfig {
    /// Validates possibly-absent credential fields into a config.
    ///
    /// Returns [`Error::MissingConfig`] naming exactly the absent required
    /// fields; `context_id` is optional and never reported.
    pub fn from_parts(
        engine_api_key: Option<String>,
        engine_project_id: Option<String>,
        model_api_key: Option<String>,
        context_id: Option<String>,
    ) -> Result<Self> {
        let mut missing = Vec::new();
        if engine_api_key.as_deref().is_none_or(str::is_empty) {
            missing.push("engine API key");
        }
        if engine_project_id.as_deref().is_none_or(str::is_empty) {
            missing.push("engine project id");
        }
        if model_api_key.as_deref().is_none_or(str::is_empty) {
            missing.push("model API key");
        }
        if !missing.is_empty() {
            return Err(Error::MissingConfig(missing));
        }

        Ok(Self {
            engine_api_key: engine_api_key.unwrap_or_default(),
            engine_project_id: engine_project_id.unwrap_or_default(),
            model_api_key: model_api_key.unwrap_or_default(),
            context_id: context_id.filter(|c| !c.is_empty()),
        })
    }

    /// Computes the deterministic fingerprint of this tuple.
    ///
    /// Pure and side-effect-free. Fields are encoded in a fixed order with
    /// length prefixes, so boundaries are unambiguous: equal tuples always
    /// agree and any differing field (including presence versus absence of
    /// `context_id`) produces a different fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut encoded = String::new();
        for part in [
            Some(self.engine_api_key.as_str()),
            Some(self.engine_project_id.as_str()),
            Some(self.model_api_key.as_str()),
            self.context_id.as_deref(),
        ] {
            match part {
                Some(value) => {
                    encoded.push_str(&value.len().to_string());
                    encoded.push(':');
                    encoded.push_str(value);
                }
                // Absent is distinct from empty ("-" versus "0:").
                None => encoded.push('-'),
            }
            encoded.push(';');
        }
        Fingerprint(encoded)
    }
}

/// Opaque key identifying one logical session's right to one engine session.
///
/// Wraps the canonical encoding of the credential tuple. The raw value embeds
/// credentials and must never be logged; use [`Fingerprint::token`] for log
/// output.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Short non-reversible token for logging and diagnostics.
    pub fn token(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fingerprint").field(&self.token()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ctx: Option<&str>) -> SessionConfig {
        SessionConfig::from_parts(
            Some("bb_key".into()),
            Some("proj_1".into()),
            Some("sk_model".into()),
            ctx.map(String::from),
        )
        .unwrap()
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(config(None).fingerprint(), config(None).fingerprint());
        assert_eq!(
            config(Some("ctx")).fingerprint(),
            config(Some("ctx")).fingerprint()
        );
    }

    #[test]
    fn fingerprint_changes_with_any_field() {
        let base = config(None).fingerprint();

        let mut other = config(None);
        other.engine_api_key = "bb_other".into();
        assert_ne!(base, other.fingerprint());

        let mut other = config(None);
        other.engine_project_id = "proj_2".into();
        assert_ne!(base, other.fingerprint());

        let mut other = config(None);
        other.model_api_key = "sk_other".into();
        assert_ne!(base, other.fingerprint());

        assert_ne!(base, config(Some("ctx")).fingerprint());
    }

    #[test]
    fn fingerprint_resists_field_concatenation_collisions() {
        let mut a = config(None);
        a.engine_api_key = "ab".into();
        a.engine_project_id = "c".into();

        let mut b = config(None);
        b.engine_api_key = "a".into();
        b.engine_project_id = "bc".into();

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn validation_names_every_missing_field() {
        let err = SessionConfig::from_parts(None, Some("proj".into()), None, None).unwrap_err();
        match err {
            Error::MissingConfig(fields) => {
                assert_eq!(fields, vec!["engine API key", "model API key"]);
            }
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let err = SessionConfig::from_parts(
            Some(String::new()),
            Some("proj".into()),
            Some("sk".into()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingConfig(fields) if fields == vec!["engine API key"]));
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let fp = config(None).fingerprint();
        let rendered = format!("{fp:?}");
        assert!(!rendered.contains("bb_key"));
        assert!(!rendered.contains("sk_model"));
    }
}
