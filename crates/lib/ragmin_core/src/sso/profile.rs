//! Provider profile parsing.
//!
//! The provider does not emit a stable shape for `attributes`: it may be a
//! mapping, a list of single-key mappings or a list of `"KEY=VALUE"` strings.
//! All three flatten into one mapping before anything reads from it.

use std::collections::BTreeMap;

use serde_json::Value;

use super::SsoError;

/// Work/student number attribute.
const ATTR_CODE: &str = "CODE";
/// Full name attribute.
const ATTR_NAME: &str = "XM";
/// Department attribute.
const ATTR_DEPARTMENT: &str = "DWPF";

/// Flatten an `attributes` payload of any accepted shape.
///
/// Later keys win. List entries that are neither mappings nor `K=V` strings
/// are skipped; any other top-level shape yields an empty mapping.
pub fn normalize_attributes(raw: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    match raw {
        Value::Object(map) => extend_from_map(&mut out, map),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(map) => extend_from_map(&mut out, map),
                    Value::String(pair) => {
                        if let Some((key, value)) = pair.split_once('=') {
                            out.insert(key.to_string(), value.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    out
}

fn extend_from_map(out: &mut BTreeMap<String, String>, map: &serde_json::Map<String, Value>) {
    for (key, value) in map {
        if let Some(value) = scalar_to_string(value) {
            out.insert(key.clone(), value);
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A provider profile with its attributes flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasProfile {
    pub id: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl CasProfile {
    /// Parse a profile response body.
    pub fn from_payload(payload: &Value) -> Result<Self, SsoError> {
        if payload.get("errorcode").is_some() {
            let detail = payload
                .get("errormsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(SsoError::ProfileFetch {
                detail: format!("CAS profile error: {detail}"),
            });
        }
        let attributes = payload
            .get("attributes")
            .map(normalize_attributes)
            .unwrap_or_default();
        Ok(Self {
            id: payload.get("id").and_then(scalar_to_string),
            attributes,
        })
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Work/student number, falling back to the account id.
    pub fn code(&self) -> Option<&str> {
        self.attribute(ATTR_CODE)
            .or_else(|| self.id.as_deref().filter(|v| !v.is_empty()))
    }

    pub fn name(&self) -> Option<&str> {
        self.attribute(ATTR_NAME)
    }

    pub fn department(&self) -> Option<&str> {
        self.attribute(ATTR_DEPARTMENT)
    }

    /// Resolve the local identity this profile maps to.
    pub fn identity(&self, email_domain: &str) -> Result<SsoIdentity, SsoError> {
        let code = self.code().ok_or(SsoError::MissingUserCode)?;
        Ok(SsoIdentity {
            code: code.to_string(),
            email: format!("{code}@{email_domain}"),
            display_name: self.name().unwrap_or(code).to_string(),
        })
    }
}

/// The local identity derived from a provider profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoIdentity {
    pub code: String,
    pub email: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOMAIN: &str = "zime.edu.cn";

    fn identity_of(payload: Value) -> SsoIdentity {
        CasProfile::from_payload(&payload)
            .unwrap()
            .identity(DOMAIN)
            .unwrap()
    }

    #[test]
    fn all_attribute_shapes_normalize_identically() {
        let mapping = json!({"id": "x", "attributes": {"CODE": "u1", "XM": "Alice"}});
        let list_of_maps = json!({"id": "x", "attributes": [{"CODE": "u1"}, {"XM": "Alice"}]});
        let list_of_pairs = json!({"id": "x", "attributes": ["CODE=u1", "XM=Alice"]});

        let expected = SsoIdentity {
            code: "u1".into(),
            email: "u1@zime.edu.cn".into(),
            display_name: "Alice".into(),
        };
        assert_eq!(identity_of(mapping), expected);
        assert_eq!(identity_of(list_of_maps), expected);
        assert_eq!(identity_of(list_of_pairs), expected);
    }

    #[test]
    fn pair_values_keep_embedded_equals() {
        let attrs = normalize_attributes(&json!(["DWPF=a=b", "novalue", 7]));
        assert_eq!(attrs.get("DWPF").map(String::as_str), Some("a=b"));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn department_comes_from_the_unit_attribute() {
        let payload = json!({"attributes": ["CODE=u1", "DWPF=Computing"]});
        let profile = CasProfile::from_payload(&payload).unwrap();
        assert_eq!(profile.department(), Some("Computing"));
        let profile = CasProfile::from_payload(&json!({"attributes": {"CODE": "u1"}})).unwrap();
        assert_eq!(profile.department(), None);
    }

    #[test]
    fn unexpected_shape_is_empty() {
        assert!(normalize_attributes(&json!("CODE=u1")).is_empty());
        assert!(normalize_attributes(&json!(42)).is_empty());
    }

    #[test]
    fn code_falls_back_to_id_and_name_to_code() {
        let identity = identity_of(json!({"id": "t9", "attributes": {}}));
        assert_eq!(identity.email, "t9@zime.edu.cn");
        assert_eq!(identity.display_name, "t9");
    }

    #[test]
    fn numeric_values_are_stringified() {
        let identity = identity_of(json!({"attributes": {"CODE": 2024001}}));
        assert_eq!(identity.code, "2024001");
    }

    #[test]
    fn profile_without_code_or_id_is_rejected() {
        let profile = CasProfile::from_payload(&json!({"attributes": {"XM": "Bob"}})).unwrap();
        let err = profile.identity(DOMAIN).unwrap_err();
        assert!(matches!(err, SsoError::MissingUserCode));
        assert_eq!(err.kind(), crate::FailureKind::Upstream);
    }

    #[test]
    fn provider_error_payload_is_a_fetch_error() {
        let err = CasProfile::from_payload(&json!({"errorcode": 40001, "errormsg": "expired"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "User info fetch error");
    }
}
