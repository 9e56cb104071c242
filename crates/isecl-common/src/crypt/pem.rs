//! Persisting keys and certificates as PEM

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use openssl::pkey::PKey;
use openssl::x509::X509;
use tracing::debug;

use crate::Result;

/// Write a PKCS8 DER private key to `path` as a `PRIVATE KEY` PEM block
///
/// The file is created with mode 0640 on unix.
///
/// # Errors
///
/// Returns an error if the DER is not a PKCS8 key or the file cannot be
/// written.
pub fn save_private_key_as_pkcs8(pkcs8_der: &[u8], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let pem = PKey::private_key_from_pkcs8(pkcs8_der)?.private_key_to_pem_pkcs8()?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }
    let mut file = options.open(path)?;
    file.write_all(&pem)?;
    debug!(path = %path.display(), "Saved PKCS8 private key");
    Ok(())
}

/// Write a DER certificate to `path` as a `CERTIFICATE` PEM block
///
/// # Errors
///
/// Returns an error if the DER is not a certificate or the file cannot be
/// written.
pub fn save_cert_as_pem(cert_der: &[u8], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let pem = X509::from_der(cert_der)?.to_pem()?;
    fs::write(path, pem)?;
    debug!(path = %path.display(), "Saved certificate");
    Ok(())
}

/// Read a PEM private key file and return it as PKCS8 DER
///
/// Accepts PKCS8 as well as traditional RSA/EC PEM encodings.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no private key.
pub fn read_pkcs8_private_key_pem(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let pem = fs::read(path)?;
    let key = PKey::private_key_from_pem(&pem)?;
    Ok(key.private_key_to_pkcs8()?)
}
