// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! X.509 certificate generation with rcgen.
//!
//! Certificates are either self-signed or issued by a CA whose certificate
//! and private key the caller has already loaded as [`SignerMaterial`].

use chrono::{DateTime, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair, KeyUsagePurpose,
    SerialNumber, SignatureAlgorithm,
};
use time::{Duration, OffsetDateTime};

use strongbox_core::{
    CertificateMetadata, CertificateParameters, CredentialValue, GeneratedCredential,
    KeyAlgorithm, SignerMaterial,
};

use crate::serial::random_serial;

pub const MIN_DURATION_DAYS: u32 = 1;
pub const MAX_DURATION_DAYS: u32 = 3650;

/// Distinguished name rendering used in certificate metadata.
pub fn subject_for(common_name: &str, organization: Option<&str>) -> String {
    match organization {
        Some(org) => format!("CN={common_name},O={org}"),
        None => format!("CN={common_name}"),
    }
}

pub fn validate(params: &CertificateParameters) -> Result<(), String> {
    if params.common_name.trim().is_empty() {
        return Err("certificate common_name must not be empty".to_string());
    }
    if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&params.duration_days) {
        return Err(format!(
            "certificate duration must be between {MIN_DURATION_DAYS} and {MAX_DURATION_DAYS} days, got {}",
            params.duration_days
        ));
    }
    if params.self_sign && params.ca.is_some() {
        return Err("certificate cannot be both self-signed and signed by a CA".to_string());
    }
    Ok(())
}

fn signature_algorithm(algorithm: KeyAlgorithm) -> &'static SignatureAlgorithm {
    match algorithm {
        KeyAlgorithm::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
        KeyAlgorithm::EcdsaP384 => &rcgen::PKCS_ECDSA_P384_SHA384,
    }
}

fn build_params(
    params: &CertificateParameters,
    not_before: OffsetDateTime,
) -> Result<CertificateParams, rcgen::Error> {
    let mut cert = CertificateParams::new(params.alternative_names.clone())?;
    cert.distinguished_name
        .push(DnType::CommonName, params.common_name.as_str());
    if let Some(org) = &params.organization {
        cert.distinguished_name
            .push(DnType::OrganizationName, org.as_str());
    }
    cert.serial_number = Some(SerialNumber::from_slice(&random_serial()));
    cert.not_before = not_before;
    cert.not_after = not_before + Duration::days(i64::from(params.duration_days));

    if params.is_ca {
        cert.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        cert.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
    } else {
        cert.is_ca = IsCa::ExplicitNoCa;
        cert.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
    }
    Ok(cert)
}

/// Generate a certificate, signed by `signer` when one is given.
pub fn generate_certificate(
    params: &CertificateParameters,
    signer: Option<&SignerMaterial>,
) -> Result<GeneratedCredential, String> {
    validate(params)?;
    if params.ca.is_some() && signer.is_none() {
        return Err("signing CA material was not supplied".to_string());
    }

    let now = OffsetDateTime::now_utc();
    let cert_params = build_params(params, now).map_err(|e| e.to_string())?;
    let key = KeyPair::generate_for(signature_algorithm(params.key_algorithm))
        .map_err(|e| format!("key generation failed: {e}"))?;

    let subject = subject_for(&params.common_name, params.organization.as_deref());
    let certificate = match signer {
        Some(signer) => {
            let ca_key = KeyPair::from_pem(&signer.private_key_pem)
                .map_err(|e| format!("signer `{}` private key is unusable: {e}", signer.name))?;
            let issuer = Issuer::from_ca_cert_pem(&signer.certificate_pem, ca_key)
                .map_err(|e| format!("signer `{}` certificate is unusable: {e}", signer.name))?;
            cert_params.signed_by(&key, &issuer)
        }
        None => cert_params.self_signed(&key),
    }
    .map_err(|e| format!("signing failed: {e}"))?;

    let expires_at = DateTime::<Utc>::from_timestamp(
        (now + Duration::days(i64::from(params.duration_days))).unix_timestamp(),
        0,
    )
    .ok_or_else(|| "certificate expiry is out of range".to_string())?;

    let metadata = CertificateMetadata {
        issuer: signer.map_or_else(|| subject.clone(), |s| s.subject.clone()),
        subject,
        signer_name: signer.map(|s| s.name.clone()),
        signer_version_id: signer.map(|s| s.version_id),
        is_ca: params.is_ca,
        self_signed: signer.is_none(),
        expires_at,
    };

    Ok(GeneratedCredential {
        value: CredentialValue::Certificate {
            ca: signer.map(|s| s.certificate_pem.clone()),
            certificate: certificate.pem(),
            private_key: key.serialize_pem(),
        },
        certificate: Some(metadata),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use strongbox_core::CredentialName;
    use uuid::Uuid;

    fn ca_params(cn: &str) -> CertificateParameters {
        let mut params = CertificateParameters::new(cn);
        params.organization = Some("acme".into());
        params.is_ca = true;
        params.self_sign = true;
        params
    }

    fn signer_from(name: &str, generated: &GeneratedCredential) -> SignerMaterial {
        let CredentialValue::Certificate {
            certificate,
            private_key,
            ..
        } = &generated.value
        else {
            panic!("not a certificate");
        };
        SignerMaterial {
            name: CredentialName::parse(name).unwrap(),
            version_id: Uuid::new_v4(),
            subject: generated.certificate.as_ref().unwrap().subject.clone(),
            certificate_pem: certificate.clone(),
            private_key_pem: private_key.clone(),
        }
    }

    fn der_of(pem: &str) -> Vec<u8> {
        let body: String = pem.lines().filter(|l| !l.starts_with("-----")).collect();
        base64::engine::general_purpose::STANDARD.decode(body).unwrap()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn self_signed_ca() {
        let generated = generate_certificate(&ca_params("root-ca"), None).unwrap();
        let meta = generated.certificate.unwrap();
        assert_eq!(meta.subject, "CN=root-ca,O=acme");
        assert_eq!(meta.issuer, meta.subject);
        assert!(meta.self_signed);
        assert!(meta.is_ca);
        assert!(meta.signer_name.is_none());

        let CredentialValue::Certificate {
            ca,
            certificate,
            private_key,
        } = generated.value
        else {
            panic!("not a certificate");
        };
        assert!(ca.is_none());
        assert!(certificate.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(private_key.contains("PRIVATE KEY"));
        let parsed = CertificateParams::from_ca_cert_pem(&certificate).unwrap();
        assert!(matches!(parsed.is_ca, IsCa::Ca(_)));
    }

    #[test]
    fn leaf_is_issued_by_signer() {
        let root = generate_certificate(&ca_params("root-ca"), None).unwrap();
        let signer = signer_from("/root-ca", &root);

        let mut params = CertificateParameters::new("leaf.internal");
        params.alternative_names = vec!["leaf.internal".into()];
        params.ca = Some(signer.name.clone());
        let leaf = generate_certificate(&params, Some(&signer)).unwrap();

        let meta = leaf.certificate.unwrap();
        assert_eq!(meta.issuer, "CN=root-ca,O=acme");
        assert_eq!(meta.subject, "CN=leaf.internal");
        assert_eq!(meta.signer_name, Some(signer.name.clone()));
        assert_eq!(meta.signer_version_id, Some(signer.version_id));
        assert!(!meta.self_signed);

        let CredentialValue::Certificate { ca, certificate, .. } = leaf.value else {
            panic!("not a certificate");
        };
        assert_eq!(ca.as_deref(), Some(signer.certificate_pem.as_str()));
        // The issuer DN is encoded in the leaf even though its subject differs.
        assert!(contains(&der_of(&certificate), b"acme"));
    }

    #[test]
    fn missing_signer_material_is_an_error() {
        let mut params = CertificateParameters::new("leaf");
        params.ca = Some(CredentialName::parse("/root-ca").unwrap());
        let err = generate_certificate(&params, None).unwrap_err();
        assert!(err.contains("not supplied"));
    }

    #[test]
    fn duration_bounds() {
        let mut params = CertificateParameters::new("x");
        params.duration_days = 0;
        assert!(validate(&params).is_err());
        params.duration_days = 3651;
        assert!(validate(&params).is_err());
        params.duration_days = 3650;
        assert!(validate(&params).is_ok());
    }

    #[test]
    fn expiry_follows_duration() {
        let mut params = ca_params("short");
        params.duration_days = 30;
        params.key_algorithm = KeyAlgorithm::EcdsaP384;
        let meta = generate_certificate(&params, None).unwrap().certificate.unwrap();
        let days = (meta.expires_at - Utc::now()).num_days();
        assert!((29..=30).contains(&days), "got {days} days");
    }
}
