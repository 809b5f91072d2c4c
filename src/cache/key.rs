//! Derives cache file names from request URLs.
//!
//! Every cache entry is named after a digest of the exact URL it was fetched
//! from, so two requests share a file only when every query parameter matches.

use crate::types::request::DataFormat;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Returns the lowercase hex SHA-256 digest of the URL's UTF-8 bytes.
///
/// The result is always 64 characters from `[0-9a-f]`, which makes it safe to
/// use as a single path segment on every platform.
///
/// # Examples
///
/// ```
/// use waterdata::derive_cache_key;
///
/// let key = derive_cache_key("https://waterservices.usgs.gov/nwis/iv/?format=json&sites=09163500");
/// assert_eq!(key.len(), 64);
/// assert_eq!(key, derive_cache_key("https://waterservices.usgs.gov/nwis/iv/?format=json&sites=09163500"));
/// ```
pub fn derive_cache_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Where a response for a given URL is stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheLocation {
    /// `<cache_dir>/<derive_cache_key(url)>.<json|rdb>`
    #[default]
    Derived,
    /// A caller-chosen file. Every URL fetched through this location shares
    /// the one file, so it should only be used for a single fixed query.
    Fixed(PathBuf),
}

impl CacheLocation {
    pub fn resolve(&self, cache_dir: &Path, url: &str, format: DataFormat) -> PathBuf {
        match self {
            CacheLocation::Derived => {
                cache_dir.join(format!("{}.{}", derive_cache_key(url), format.extension()))
            }
            CacheLocation::Fixed(path) => path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IV_URL: &str = "https://waterservices.usgs.gov/nwis/iv/?format=json&sites=09163500&period=P365D&siteStatus=all";

    #[test]
    fn test_key_is_stable() {
        assert_eq!(derive_cache_key(IV_URL), derive_cache_key(IV_URL));
    }

    #[test]
    fn test_key_differs_per_query_parameter() {
        let other_site = IV_URL.replace("09163500", "09163501");
        let other_period = IV_URL.replace("P365D", "P30D");
        assert_ne!(derive_cache_key(IV_URL), derive_cache_key(&other_site));
        assert_ne!(derive_cache_key(IV_URL), derive_cache_key(&other_period));
        assert_ne!(derive_cache_key(&other_site), derive_cache_key(&other_period));
    }

    #[test]
    fn test_key_is_path_safe() {
        let key = derive_cache_key("https://example.com/a/b?c=d&e=f/../g");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_known_digest() {
        // sha256("") is a fixed test vector
        assert_eq!(
            derive_cache_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_resolve_locations() {
        let dir = Path::new("/tmp/water-cache");
        let derived = CacheLocation::Derived.resolve(dir, IV_URL, DataFormat::Rdb);
        assert_eq!(derived.parent(), Some(dir));
        assert_eq!(derived.extension().and_then(|e| e.to_str()), Some("rdb"));

        let fixed = CacheLocation::Fixed(PathBuf::from("data/usgs_sitedata.rdb"));
        assert_eq!(
            fixed.resolve(dir, IV_URL, DataFormat::Rdb),
            PathBuf::from("data/usgs_sitedata.rdb")
        );
        assert_eq!(
            fixed.resolve(dir, "https://other", DataFormat::Json),
            PathBuf::from("data/usgs_sitedata.rdb")
        );
    }
}
