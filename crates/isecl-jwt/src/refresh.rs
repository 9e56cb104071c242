//! Process-wide token authentication with trust store refresh
//!
//! [`TokenAuthenticator`] owns the current [`VerifierSnapshot`] and replaces
//! it when validation fails in a way new trust material could fix:
//!
//! - unknown or just-expired `kid`: fetch signing certificates once per
//!   guard, then rebuild and retry once whether or not the fetch ran
//! - stale snapshot: rebuild from the local source, retry once
//!
//! Readers never block; a rebuilt snapshot is swapped in atomically and
//! requests already holding the old one finish against it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use isecl_common::CryptError;
use isecl_common::os::dir_file_contents;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::config::VerifierConfig;
use crate::token::Token;
use crate::verifier::{VerifierOptions, VerifierSnapshot};
use crate::{JwtError, Result};

/// Signing certificates and root CAs a snapshot is built from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustMaterial {
    /// PEM blobs of candidate signing certificates, optionally with chains
    pub signing_certs: Vec<Vec<u8>>,
    /// PEM blobs of trusted root CAs
    pub trusted_roots: Vec<Vec<u8>>,
}

/// Where trust material is read from when a snapshot is (re)built
pub trait TrustMaterialSource: Send + Sync {
    /// Read the current trust material
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::TrustMaterial`] if the material cannot be read.
    fn load(&self) -> Result<TrustMaterial>;
}

/// Retrieves new signing certificates from an external authority
///
/// Implementations typically download certificates and write them where the
/// [`TrustMaterialSource`] will find them on the next rebuild.
#[async_trait]
pub trait TrustMaterialFetcher: Send + Sync {
    /// Fetch and persist new trust material
    async fn fetch(&self) -> anyhow::Result<()>;
}

/// Trust material read from two directories of PEM files
#[derive(Debug, Clone)]
pub struct DirTrustMaterial {
    signing_certs_dir: PathBuf,
    trusted_cas_dir: PathBuf,
    pattern: String,
}

impl DirTrustMaterial {
    /// Read `*.pem` files from both directories
    pub fn new(signing_certs_dir: impl Into<PathBuf>, trusted_cas_dir: impl Into<PathBuf>) -> Self {
        Self {
            signing_certs_dir: signing_certs_dir.into(),
            trusted_cas_dir: trusted_cas_dir.into(),
            pattern: "*.pem".to_string(),
        }
    }

    /// Select files by a different wildcard
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
}

impl TrustMaterialSource for DirTrustMaterial {
    fn load(&self) -> Result<TrustMaterial> {
        // A directory that does not exist yet holds no material
        let read = |dir: &PathBuf| match dir_file_contents(dir, &self.pattern) {
            Ok(contents) => Ok(contents),
            Err(CryptError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Trust directory does not exist");
                Ok(Vec::new())
            }
            Err(e) => Err(JwtError::TrustMaterial(format!("{}: {e}", dir.display()))),
        };

        Ok(TrustMaterial {
            signing_certs: read(&self.signing_certs_dir)?,
            trusted_roots: read(&self.trusted_cas_dir)?,
        })
    }
}

/// Validates tokens against a self-refreshing trust store
pub struct TokenAuthenticator {
    source: Arc<dyn TrustMaterialSource>,
    fetcher: Option<Arc<dyn TrustMaterialFetcher>>,
    options: VerifierOptions,
    snapshot: ArcSwapOption<VerifierSnapshot>,
    download_attempted: AtomicBool,
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("options", &self.options)
            .field("has_fetcher", &self.fetcher.is_some())
            .field("keys", &self.snapshot.load().as_ref().map(|s| s.len()))
            .field("download_attempted", &self.download_attempted())
            .finish_non_exhaustive()
    }
}

impl TokenAuthenticator {
    /// Create an authenticator reading trust material from `source`
    ///
    /// No snapshot is built until the first validation or [`rebuild`].
    ///
    /// [`rebuild`]: TokenAuthenticator::rebuild
    pub fn new(source: impl TrustMaterialSource + 'static, options: VerifierOptions) -> Self {
        Self {
            source: Arc::new(source),
            fetcher: None,
            options,
            snapshot: ArcSwapOption::empty(),
            download_attempted: AtomicBool::new(false),
        }
    }

    /// Create an authenticator over the configured trust directories
    pub fn from_config(config: &VerifierConfig) -> Self {
        let source = DirTrustMaterial::new(&config.signing_certs_dir, &config.trusted_cas_dir)
            .with_pattern(config.file_pattern.clone());
        Self::new(source, config.options())
    }

    /// Fetch new signing certificates through `fetcher` on unknown key ids
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: impl TrustMaterialFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Current snapshot, if one has been built
    pub fn snapshot(&self) -> Option<Arc<VerifierSnapshot>> {
        self.snapshot.load_full()
    }

    /// Rebuild the snapshot from the source and publish it
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or holds too many
    /// signing certificates; the previous snapshot stays in place.
    pub fn rebuild(&self) -> Result<Arc<VerifierSnapshot>> {
        let material = self.source.load()?;
        let snapshot = Arc::new(VerifierSnapshot::build_with_options(
            &material.signing_certs,
            &material.trusted_roots,
            &self.options,
        )?);
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    /// Whether the certificate download has been attempted
    pub fn download_attempted(&self) -> bool {
        self.download_attempted.load(Ordering::Acquire)
    }

    /// Allow one more certificate download
    pub fn reset_download_guard(&self) {
        self.download_attempted.store(false, Ordering::Release);
    }

    /// Validate a token, refreshing the trust store when that could help
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::NoValidCertFound`] if no signing certificate is
    /// available even after a fetch, and otherwise the validation error of
    /// the last attempt. An empty store is retried on the next call.
    pub async fn validate<C: DeserializeOwned>(&self, token: &str) -> Result<Token<C>> {
        let snapshot = self.current_snapshot().await?;

        let error = match snapshot.validate::<C>(token) {
            Ok(token) => return Ok(token),
            Err(e) => e,
        };

        match &error {
            JwtError::MatchingCertNotFound { .. } | JwtError::MatchingCertJustExpired { .. } => {
                // Rebuilt below whatever the fetch outcome
                if let Err(fetch_error) = self.fetch_trust_material().await {
                    debug!(error = %fetch_error, "Signing certificates not fetched");
                }
            }
            JwtError::VerifierExpired { .. } => {}
            _ => {
                warn!(category = error.category(), error = %error, "Token validation failed");
                return Err(error);
            }
        }

        debug!(category = error.category(), "Rebuilding JWT verifier and retrying");
        self.rebuild()?.validate::<C>(token).inspect_err(|e| {
            warn!(category = e.category(), error = %e, "Token validation failed after refresh");
        })
    }

    async fn current_snapshot(&self) -> Result<Arc<VerifierSnapshot>> {
        // An empty store is rebuilt on every request until material appears
        if let Some(snapshot) = self.snapshot.load_full()
            && !snapshot.is_empty()
        {
            return Ok(snapshot);
        }

        let snapshot = self.rebuild()?;
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }

        warn!("No valid JWT signing certificates found, attempting download");
        if let Err(e) = self.fetch_trust_material().await {
            warn!(error = %e, "JWT signing certificates not downloaded");
        }
        let snapshot = self.rebuild()?;
        if snapshot.is_empty() {
            error!("No valid JWT signing certificates after download");
            return Err(JwtError::NoValidCertFound);
        }
        Ok(snapshot)
    }

    async fn fetch_trust_material(&self) -> Result<()> {
        let Some(fetcher) = &self.fetcher else {
            return Err(JwtError::TrustMaterial(
                "no signing certificate fetcher configured".to_string(),
            ));
        };
        if self
            .download_attempted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(JwtError::DownloadAlreadyAttempted);
        }

        info!("Downloading JWT signing certificates");
        fetcher.fetch().await.map_err(|e| {
            error!(error = %e, "Failed to download JWT signing certificates");
            JwtError::TrustMaterial(format!("{e:#}"))
        })
    }
}
