//! AWS Signature Version 4 primitives for browser-based POST uploads.
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::signing::SigningError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const TERMINATOR: &str = "aws4_request";

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Credential scope of a signature: date, region and service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scope {
    date: String,
    region: String,
}

impl Scope {
    pub fn new(at: DateTime<Utc>, region: impl Into<String>) -> Self {
        Self {
            date: at.format("%Y%m%d").to_string(),
            region: region.into(),
        }
    }

    /// `YYYYMMDD/region/s3/aws4_request`
    pub fn to_credential_scope(&self) -> String {
        format!("{}/{}/{SERVICE}/{TERMINATOR}", self.date, self.region)
    }

    /// Value of the `X-Amz-Credential` form field.
    pub fn credential(&self, access_key_id: &str) -> String {
        format!("{access_key_id}/{}", self.to_credential_scope())
    }

    /// Derive the signing key for this scope.
    pub fn signing_key(&self, secret_access_key: &str) -> Result<Vec<u8>, SigningError> {
        self.signing_key_for_service(secret_access_key, SERVICE)
    }

    fn signing_key_for_service(
        &self,
        secret_access_key: &str,
        service: &str,
    ) -> Result<Vec<u8>, SigningError> {
        let k_date = hmac_sha256(
            format!("AWS4{secret_access_key}").as_bytes(),
            self.date.as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, service.as_bytes())?;
        hmac_sha256(&k_service, TERMINATOR.as_bytes())
    }
}

/// `X-Amz-Date` representation of an instant.
pub fn amz_date(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Hex signature of a string to sign (for POST uploads, the encoded policy).
pub fn sign(signing_key: &[u8], string_to_sign: &str) -> Result<String, SigningError> {
    Ok(hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes())?))
}
