use crate::utils::error::TrustError;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, ObjectIdentifier, PrivateKeyInfo};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use rustls::crypto::CryptoProvider;
use rustls::{CipherSuite, ServerConfig};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::public_key::PublicKey;

pub const MIN_RSA_MODULUS_BITS: usize = 2048;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// 允許清單中的加密套件 (IANA 代碼)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedSuite {
    pub code: u16,
    pub name: &'static str,
}

/// 依伺服器偏好順序排列
pub const CIPHER_SUITE_ALLOW_LIST: [AllowedSuite; 6] = [
    AllowedSuite {
        code: 0xc030,
        name: "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    },
    AllowedSuite {
        code: 0xc02f,
        name: "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    },
    AllowedSuite {
        code: 0xc027,
        name: "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256",
    },
    AllowedSuite {
        code: 0x003c,
        name: "TLS_RSA_WITH_AES_128_CBC_SHA256",
    },
    AllowedSuite {
        code: 0x009d,
        name: "TLS_RSA_WITH_AES_256_GCM_SHA384",
    },
    AllowedSuite {
        code: 0x009c,
        name: "TLS_RSA_WITH_AES_128_GCM_SHA256",
    },
];

pub enum KeyAlgorithm {
    Rsa(Box<RsaPrivateKey>),
    Unsupported(String),
}

/// 憑證簽章演算法，依摘要分類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha256WithRsa,
    Sha384WithRsa,
    Sha512WithRsa,
    Sha1WithRsa,
    Md5WithRsa,
    Other(String),
}

impl SignatureAlgorithm {
    pub fn from_oid(oid: &str) -> Self {
        match oid {
            "1.2.840.113549.1.1.11" => SignatureAlgorithm::Sha256WithRsa,
            "1.2.840.113549.1.1.12" => SignatureAlgorithm::Sha384WithRsa,
            "1.2.840.113549.1.1.13" => SignatureAlgorithm::Sha512WithRsa,
            "1.2.840.113549.1.1.5" => SignatureAlgorithm::Sha1WithRsa,
            "1.2.840.113549.1.1.4" => SignatureAlgorithm::Md5WithRsa,
            other => SignatureAlgorithm::Other(other.to_string()),
        }
    }

    pub fn has_allowed_digest(&self) -> bool {
        matches!(
            self,
            SignatureAlgorithm::Sha256WithRsa
                | SignatureAlgorithm::Sha384WithRsa
                | SignatureAlgorithm::Sha512WithRsa
        )
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::Sha256WithRsa => f.write_str("SHA256-RSA"),
            SignatureAlgorithm::Sha384WithRsa => f.write_str("SHA384-RSA"),
            SignatureAlgorithm::Sha512WithRsa => f.write_str("SHA512-RSA"),
            SignatureAlgorithm::Sha1WithRsa => f.write_str("SHA1-RSA"),
            SignatureAlgorithm::Md5WithRsa => f.write_str("MD5-RSA"),
            SignatureAlgorithm::Other(oid) => write!(f, "{}", oid),
        }
    }
}

/// 通過密碼學政策檢查的金鑰與憑證
pub struct TrustMaterial {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    modulus_bits: usize,
    signature: SignatureAlgorithm,
}

impl fmt::Debug for TrustMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustMaterial")
            .field("chain_len", &self.chain.len())
            .field("modulus_bits", &self.modulus_bits)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl TrustMaterial {
    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    pub fn signature_algorithm(&self) -> &SignatureAlgorithm {
        &self.signature
    }

    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    pub fn server_config(&self) -> Result<(ServerConfig, HardeningReport), TrustError> {
        let (provider, report) = harden(rustls::crypto::aws_lc_rs::default_provider())?;

        // 允許清單只有 TLS 1.2 套件
        let mut config = ServerConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&[&rustls::version::TLS12])?
            .with_no_client_auth()
            .with_single_cert(self.chain.clone(), self.key.clone_key())?;

        config.ignore_client_order = true;
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok((config, report))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardeningReport {
    pub enabled: Vec<&'static str>,
    pub unavailable: Vec<&'static str>,
}

/// 只保留允許清單中的套件；provider 不支援的套件 (CBC、靜態 RSA) 記在 `unavailable`
pub fn harden(mut provider: CryptoProvider) -> Result<(CryptoProvider, HardeningReport), TrustError> {
    let mut report = HardeningReport::default();
    let mut suites = Vec::with_capacity(CIPHER_SUITE_ALLOW_LIST.len());

    for allowed in CIPHER_SUITE_ALLOW_LIST {
        let wanted = CipherSuite::from(allowed.code);
        match provider.cipher_suites.iter().find(|s| s.suite() == wanted) {
            Some(suite) => {
                suites.push(*suite);
                report.enabled.push(allowed.name);
            }
            None => report.unavailable.push(allowed.name),
        }
    }

    if suites.is_empty() {
        return Err(TrustError::Transport(rustls::Error::General(
            "none of the allowed cipher suites is supported".to_string(),
        )));
    }

    provider.cipher_suites = suites;
    Ok((provider, report))
}

/// 載入並檢查金鑰與憑證，任何失敗都會中止啟動
pub fn establish(cert_path: &Path, key_path: &Path) -> Result<TrustMaterial, TrustError> {
    let chain = load_chain(cert_path)?;
    let key = PrivateKeyDer::from_pem_file(key_path).map_err(|e| TrustError::Load {
        path: key_path.display().to_string(),
        reason: e.to_string(),
    })?;

    let (_, leaf) = X509Certificate::from_der(chain[0].as_ref()).map_err(|e| TrustError::Load {
        path: cert_path.display().to_string(),
        reason: format!("cannot parse leaf certificate: {}", e),
    })?;

    let rsa_key = match classify_key(&key).map_err(|reason| TrustError::Load {
        path: key_path.display().to_string(),
        reason,
    })? {
        KeyAlgorithm::Rsa(rsa_key) => rsa_key,
        KeyAlgorithm::Unsupported(algorithm) => {
            return Err(TrustError::UnsupportedSignature { algorithm })
        }
    };

    if !matches_certificate(&rsa_key, &leaf) {
        return Err(TrustError::KeyMismatch);
    }

    let modulus_bits = rsa_key.n().bits();
    if modulus_bits < MIN_RSA_MODULUS_BITS {
        return Err(TrustError::KeyTooWeak {
            required: MIN_RSA_MODULUS_BITS,
            actual: modulus_bits,
        });
    }

    let signature = SignatureAlgorithm::from_oid(&leaf.signature_algorithm.algorithm.to_id_string());
    if !signature.has_allowed_digest() {
        return Err(TrustError::UnsupportedDigest {
            algorithm: signature.to_string(),
        });
    }

    tracing::info!(
        modulus_bits,
        signature = %signature,
        "✅ Security cryptographic requirements for certificates were all PASSED"
    );

    Ok(TrustMaterial {
        chain,
        key,
        modulus_bits,
        signature,
    })
}

/// 直接比對憑證 SPKI 中的 modulus 與 exponent，不受金鑰長度上限影響
fn matches_certificate(rsa_key: &RsaPrivateKey, leaf: &X509Certificate<'_>) -> bool {
    match leaf.public_key().parsed() {
        Ok(PublicKey::RSA(cert_key)) => {
            strip_leading_zeros(cert_key.modulus) == rsa_key.n().to_bytes_be().as_slice()
                && strip_leading_zeros(cert_key.exponent) == rsa_key.e().to_bytes_be().as_slice()
        }
        _ => false,
    }
}

// DER INTEGER 可能帶有前導 0x00
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn load_chain(cert_path: &Path) -> Result<Vec<CertificateDer<'static>>, TrustError> {
    let load_error = |reason: String| TrustError::Load {
        path: cert_path.display().to_string(),
        reason,
    };

    let chain = CertificateDer::pem_file_iter(cert_path)
        .map_err(|e| load_error(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| load_error(e.to_string()))?;

    if chain.is_empty() {
        return Err(load_error("no PEM certificate found".to_string()));
    }

    Ok(chain)
}

/// `Err` 為 RSA 金鑰無法解碼的原因
pub fn classify_key(key: &PrivateKeyDer<'_>) -> Result<KeyAlgorithm, String> {
    match key {
        PrivateKeyDer::Pkcs1(der) => RsaPrivateKey::from_pkcs1_der(der.secret_pkcs1_der())
            .map(|key| KeyAlgorithm::Rsa(Box::new(key)))
            .map_err(|e| format!("invalid PKCS#1 RSA key: {}", e)),
        PrivateKeyDer::Pkcs8(der) => {
            let info = PrivateKeyInfo::try_from(der.secret_pkcs8_der())
                .map_err(|e| format!("invalid PKCS#8 key: {}", e))?;
            if info.algorithm.oid != RSA_ENCRYPTION {
                return Ok(KeyAlgorithm::Unsupported(algorithm_name(
                    &info.algorithm.oid.to_string(),
                )));
            }
            RsaPrivateKey::from_pkcs8_der(der.secret_pkcs8_der())
                .map(|key| KeyAlgorithm::Rsa(Box::new(key)))
                .map_err(|e| format!("invalid PKCS#8 RSA key: {}", e))
        }
        PrivateKeyDer::Sec1(_) => Ok(KeyAlgorithm::Unsupported("EC".to_string())),
        _ => Ok(KeyAlgorithm::Unsupported("unknown".to_string())),
    }
}

fn algorithm_name(oid: &str) -> String {
    match oid {
        "1.2.840.10045.2.1" => "EC".to_string(),
        "1.3.101.112" => "Ed25519".to_string(),
        "1.3.101.113" => "Ed448".to_string(),
        "1.2.840.10040.4.1" => "DSA".to_string(),
        "1.2.840.113549.1.1.10" => "RSASSA-PSS".to_string(),
        other => other.to_string(),
    }
}
