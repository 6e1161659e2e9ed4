//! Path sanitization and Unicode normalization.

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Mutex;

use lru::LruCache;
use unicode_normalization::UnicodeNormalization;

/// Capacity of the sanitizer's memoization cache.
pub const SANITIZE_CACHE_CAPACITY: usize = 8192;

/// Unicode normalization form applied to path components.
///
/// NFD is the default because the macOS FUSE bridge delivers names in
/// NFD; matching a tree declared from a command-line enumeration requires
/// aligning the forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationForm {
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
    /// Leave names as declared.
    None,
}

impl FromStr for NormalizationForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NFC" => Ok(Self::Nfc),
            "NFD" => Ok(Self::Nfd),
            "NFKC" => Ok(Self::Nfkc),
            "NFKD" => Ok(Self::Nfkd),
            "NONE" => Ok(Self::None),
            other => Err(format!("unknown normalization form: {}", other)),
        }
    }
}

/// Canonicalizes raw kernel paths into directory-index keys.
///
/// Sanitization is pure; the internal LRU only bounds CPU cost under
/// repeated access. Thread-safe via an internal mutex.
#[derive(Debug)]
pub struct PathSanitizer {
    form: NormalizationForm,
    /// Memoized full-path results.
    paths: Mutex<LruCache<String, String>>,
    /// Memoized single-component results. Separate from `paths`: the same
    /// raw string sanitizes differently as a path ("a" -> "/a") and as a
    /// name component ("a" -> "a").
    components: Mutex<LruCache<String, String>>,
}

impl PathSanitizer {
    /// Create a sanitizer for the given normalization form.
    pub fn new(form: NormalizationForm) -> Self {
        let cap: NonZeroUsize =
            NonZeroUsize::new(SANITIZE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            form,
            paths: Mutex::new(LruCache::new(cap)),
            components: Mutex::new(LruCache::new(cap)),
        }
    }

    /// The configured normalization form.
    pub fn form(&self) -> NormalizationForm {
        self.form
    }

    /// Canonicalize an absolute path.
    ///
    /// Strips NUL bytes, applies the configured normalization form,
    /// collapses redundant separators, drops `.` components, resolves
    /// `..` clamped at the root, and strips the trailing separator. The
    /// result is the key used for directory-index lookups.
    pub fn sanitize(&self, raw: &str) -> String {
        {
            let mut cache = self.paths.lock().unwrap();
            if let Some(hit) = cache.get(raw) {
                return hit.clone();
            }
        }
        let result: String = self.sanitize_uncached(raw);
        self.paths
            .lock()
            .unwrap()
            .put(raw.to_string(), result.clone());
        result
    }

    /// Normalize a single name component as delivered by the kernel.
    ///
    /// Same character-level rules as [`sanitize`](Self::sanitize), without
    /// separator handling.
    pub fn normalize_component(&self, raw: &str) -> String {
        {
            let mut cache = self.components.lock().unwrap();
            if let Some(hit) = cache.get(raw) {
                return hit.clone();
            }
        }
        let stripped: String = raw.chars().filter(|c: &char| *c != '\0').collect();
        let result: String = self.apply_form(&stripped);
        self.components
            .lock()
            .unwrap()
            .put(raw.to_string(), result.clone());
        result
    }

    /// Number of memoized full-path results. Test hook.
    pub fn cache_len(&self) -> usize {
        self.paths.lock().unwrap().len()
    }

    fn apply_form(&self, s: &str) -> String {
        match self.form {
            NormalizationForm::Nfc => s.nfc().collect(),
            NormalizationForm::Nfd => s.nfd().collect(),
            NormalizationForm::Nfkc => s.nfkc().collect(),
            NormalizationForm::Nfkd => s.nfkd().collect(),
            NormalizationForm::None => s.to_string(),
        }
    }

    fn sanitize_uncached(&self, raw: &str) -> String {
        let stripped: String = raw.chars().filter(|c: &char| *c != '\0').collect();
        let normalized: String = self.apply_form(&stripped);

        let mut parts: Vec<&str> = Vec::new();
        for component in normalized.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                name => parts.push(name),
            }
        }

        if parts.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", parts.join("/"))
        }
    }
}
