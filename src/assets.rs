// Logo sourcing. Providers are injectable so rendering never depends on
// where the image comes from, and a missing logo is never fatal.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{ReportError, Result};

/// Source of the optional header logo.
pub trait LogoProvider {
    fn fetch(&self) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogo;

impl LogoProvider for NoLogo {
    fn fetch(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
pub struct FileLogo {
    path: PathBuf,
}

impl FileLogo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LogoProvider for FileLogo {
    fn fetch(&self) -> Result<Option<Vec<u8>>> {
        std::fs::read(&self.path).map(Some).map_err(|err| {
            ReportError::AssetUnavailable(format!("logo {}: {}", self.path.display(), err))
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryLogo(pub Vec<u8>);

impl LogoProvider for MemoryLogo {
    fn fetch(&self) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.0.clone()))
    }
}

/// Fetch the logo and check that it decodes. Any failure is logged and
/// degrades to `None`.
pub fn resolve_logo(provider: &dyn LogoProvider) -> Option<Vec<u8>> {
    let checked = provider.fetch().and_then(|bytes| match bytes {
        Some(bytes) => image::load_from_memory(&bytes)
            .map(|img| {
                debug!(width = img.width(), height = img.height(), "Logo decoded");
                Some(bytes)
            })
            .map_err(|err| ReportError::AssetUnavailable(format!("logo does not decode: {}", err))),
        None => Ok(None),
    });

    match checked {
        Ok(logo) => logo,
        Err(err) => {
            warn!(error = %err, "Logo not loaded, continuing without logo");
            None
        }
    }
}
