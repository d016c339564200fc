//! RS256 service-account assertion (JWT bearer grant).
//!
//! `base64url(header) . base64url(claims) . base64url(signature)`, signed with
//! RSASSA-PKCS1-v1_5 over SHA-256. Valid for exactly one hour from `iat`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::credentials::ServiceAccountKey;
use crate::error::SheetsError;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

const HEADER: &str = r#"{"alg":"RS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(issuer: &str, audience: &str, now: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            scope: SHEETS_READONLY_SCOPE.to_string(),
            aud: audience.to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Signs assertions for one service account. The key is parsed once.
pub struct AssertionSigner {
    issuer: String,
    signing_key: SigningKey<Sha256>,
}

impl AssertionSigner {
    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`) PEM.
    pub fn from_key(key: &ServiceAccountKey) -> Result<Self, SheetsError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(&key.private_key)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&key.private_key))
            .map_err(|e| SheetsError::Configuration(format!("cannot parse private key: {e}")))?;
        Ok(Self {
            issuer: key.client_email.clone(),
            signing_key: SigningKey::<Sha256>::new(private_key),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signed assertion for `audience` (the token endpoint), issued at `now`
    /// (unix seconds).
    pub fn sign(&self, audience: &str, now: i64) -> Result<String, SheetsError> {
        let claims = Claims::new(&self.issuer, audience, now);
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| SheetsError::Configuration(format!("cannot encode claims: {e}")))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.signing_key.sign(signing_input.as_bytes());
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use rsa::RsaPublicKey;

    pub(crate) const PKCS8_PEM: &str = include_str!("../tests/fixtures/service-account.pem");
    const PKCS1_PEM: &str = include_str!("../tests/fixtures/service-account-pkcs1.pem");
    const ISSUER: &str = "reconciler@comrec-test.iam.gserviceaccount.com";
    const AUDIENCE: &str = "https://oauth2.googleapis.com/token";

    pub(crate) fn fixture_key() -> ServiceAccountKey {
        ServiceAccountKey { client_email: ISSUER.into(), private_key: PKCS8_PEM.into() }
    }

    fn decode_segment(segment: &str) -> Vec<u8> {
        URL_SAFE_NO_PAD.decode(segment).unwrap()
    }

    #[test]
    fn assertion_has_expected_header_and_claims() {
        let signer = AssertionSigner::from_key(&fixture_key()).unwrap();
        let jwt = signer.sign(AUDIENCE, 1_700_000_000).unwrap();

        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(!jwt.contains('='));

        let header: serde_json::Value = serde_json::from_slice(&decode_segment(parts[0])).unwrap();
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["typ"], "JWT");

        let claims: Claims = serde_json::from_slice(&decode_segment(parts[1])).unwrap();
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, AUDIENCE);
        assert_eq!(claims.scope, SHEETS_READONLY_SCOPE);
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn signature_verifies_with_public_key() {
        let private_key = RsaPrivateKey::from_pkcs8_pem(PKCS8_PEM).unwrap();
        let verifying_key = VerifyingKey::<Sha256>::new(RsaPublicKey::from(&private_key));

        let signer = AssertionSigner::from_key(&fixture_key()).unwrap();
        let jwt = signer.sign(AUDIENCE, 1_700_000_000).unwrap();
        let (signing_input, signature) = jwt.rsplit_once('.').unwrap();

        let signature = Signature::try_from(decode_segment(signature).as_slice()).unwrap();
        verifying_key.verify(signing_input.as_bytes(), &signature).unwrap();

        let tampered = signing_input.replacen('e', "f", 1);
        assert!(verifying_key.verify(tampered.as_bytes(), &signature).is_err());
    }

    #[test]
    fn pkcs1_key_is_accepted() {
        let key = ServiceAccountKey { client_email: ISSUER.into(), private_key: PKCS1_PEM.into() };
        let pkcs1 = AssertionSigner::from_key(&key).unwrap();
        let pkcs8 = AssertionSigner::from_key(&fixture_key()).unwrap();
        // PKCS#1 v1.5 signatures are deterministic: same key, same bytes.
        assert_eq!(pkcs1.sign(AUDIENCE, 42).unwrap(), pkcs8.sign(AUDIENCE, 42).unwrap());
    }

    #[test]
    fn garbage_key_is_configuration_error() {
        let key = ServiceAccountKey { client_email: ISSUER.into(), private_key: "not a pem".into() };
        match AssertionSigner::from_key(&key) {
            Err(SheetsError::Configuration(msg)) => assert!(msg.contains("private key")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("garbage key accepted"),
        }
    }
}
