//! POST policy documents for direct browser uploads.
use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::signing::SigningError;
use crate::signing::credentials::Credentials;
use crate::signing::sigv4::{self, ALGORITHM, Scope};

/// A single condition storage checks the upload against.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Condition {
    /// Form field must equal the value.
    Exact(String, String),
    /// Form field must start with the value.
    StartsWith(String, String),
    /// Object size must lie within the inclusive byte range.
    ContentLengthRange(u64, u64),
}

impl Condition {
    fn to_json(&self) -> Value {
        match self {
            Condition::Exact(field, value) => json!({ field: value }),
            Condition::StartsWith(field, prefix) => {
                json!(["starts-with", format!("${field}"), prefix])
            }
            Condition::ContentLengthRange(min, max) => json!(["content-length-range", min, max]),
        }
    }
}

/// Builder for a signed upload policy.
#[derive(Clone, Debug)]
pub struct PostPolicy {
    expires_at: DateTime<Utc>,
    conditions: Vec<Condition>,
    fields: BTreeMap<String, String>,
}

impl PostPolicy {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            conditions: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn content_length_range(mut self, min: u64, max: u64) -> Self {
        self.conditions.push(Condition::ContentLengthRange(min, max));
        self
    }

    pub fn starts_with(mut self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::StartsWith(field.into(), prefix.into()));
        self
    }

    /// Adds a form field the client must send verbatim; it is also signed as
    /// an exact-match condition.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    fn document(&self, signed_fields: &BTreeMap<String, String>) -> Value {
        let conditions: Vec<Value> = self
            .conditions
            .iter()
            .cloned()
            .chain(
                signed_fields
                    .iter()
                    .map(|(name, value)| Condition::Exact(name.clone(), value.clone())),
            )
            .map(|condition| condition.to_json())
            .collect();

        json!({
            "expiration": self.expires_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            "conditions": conditions,
        })
    }

    /// Signs the policy, returning every field the upload form has to carry.
    pub fn sign(
        self,
        credentials: &Credentials,
        region: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<BTreeMap<String, String>, SigningError> {
        let scope = Scope::new(issued_at, region);

        let mut fields = self.fields.clone();
        fields.insert("X-Amz-Algorithm".to_string(), ALGORITHM.to_string());
        fields.insert(
            "X-Amz-Credential".to_string(),
            scope.credential(credentials.access_key_id()),
        );
        fields.insert("X-Amz-Date".to_string(), sigv4::amz_date(issued_at));
        if let Some(token) = credentials.session_token() {
            fields.insert("X-Amz-Security-Token".to_string(), token.to_string());
        }

        let encoded = STANDARD.encode(self.document(&fields).to_string());
        let signing_key = scope.signing_key(credentials.secret_access_key())?;
        let signature = sigv4::sign(&signing_key, &encoded)?;

        fields.insert("Policy".to_string(), encoded);
        fields.insert("X-Amz-Signature".to_string(), signature);
        Ok(fields)
    }
}
