// HTTP request signing (draft-cavage signatures, rsa-sha256) as the capacity API expects.
// GET/DELETE sign "date (request-target) host"; requests with a body also sign
// content-length, content-type and x-content-sha256.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("read key file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("key file {} is not a PKCS#1 or PKCS#8 RSA private key", path.display())]
    InvalidKey { path: PathBuf },
}

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub date: String,
    pub authorization: String,
    /// Present when a body was signed.
    pub content_sha256: Option<String>,
    pub content_type: Option<&'static str>,
}

pub struct RequestSigner {
    key_id: String,
    signing_key: SigningKey<Sha256>,
}

impl RequestSigner {
    pub fn new(key_id: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::<Sha256>::new(key),
        }
    }

    /// Key id is "<tenancy>/<user>/<fingerprint>".
    pub fn from_key_file(
        tenancy: &str,
        user: &str,
        fingerprint: &str,
        key_file: &str,
    ) -> Result<Self, SignerError> {
        let path = expand_home(key_file);
        let pem = std::fs::read_to_string(&path).map_err(|e| SignerError::Io {
            path: path.clone(),
            source: e,
        })?;
        let key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .ok()
            .or_else(|| RsaPrivateKey::from_pkcs1_pem(&pem).ok())
            .ok_or(SignerError::InvalidKey { path })?;
        Ok(Self::new(
            format!("{}/{}/{}", tenancy, user, fingerprint),
            key,
        ))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Sign one request. `path_and_query` is the request target as sent, e.g. "/20160918/tenancies/x".
    pub fn sign(
        &self,
        method: &str,
        path_and_query: &str,
        host: &str,
        date: &str,
        body: Option<&[u8]>,
    ) -> SignedHeaders {
        let method = method.to_lowercase();
        let mut headers: Vec<(&str, String)> = vec![
            ("date", date.to_string()),
            ("(request-target)", format!("{} {}", method, path_and_query)),
            ("host", host.to_string()),
        ];
        let content_sha256 = body.map(|b| STANDARD.encode(Sha256::digest(b)));
        if let (Some(b), Some(sha)) = (body, &content_sha256) {
            headers.push(("content-length", b.len().to_string()));
            headers.push(("content-type", JSON_CONTENT_TYPE.to_string()));
            headers.push(("x-content-sha256", sha.clone()));
        }

        let signature = self.signing_key.sign(signing_string(&headers).as_bytes());
        let header_names: Vec<&str> = headers.iter().map(|(name, _)| *name).collect();
        let authorization = format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            header_names.join(" "),
            STANDARD.encode(signature.to_bytes())
        );

        SignedHeaders {
            date: date.to_string(),
            authorization,
            content_type: content_sha256.as_ref().map(|_| JSON_CONTENT_TYPE),
            content_sha256,
        }
    }
}

/// "name: value" lines joined by newlines, in signed-header order.
fn signing_string(headers: &[(&str, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}
