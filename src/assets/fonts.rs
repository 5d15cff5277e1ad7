//! Font readiness gate.
//!
//! Text is never measured or drawn until every family referenced by the scene has been requested
//! from the [`FontProvider`] and the gate's [`FontGate::ready`] barrier resolved. Each family is
//! requested at most once per gate, keyed by [`font_request_id`]. A failed family renders with the
//! provider's fallback font instead of blocking.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::FontConfig;
use crate::foundation::error::{ThumbError, ThumbResult};

/// External font-delivery collaborator.
pub trait FontProvider {
    /// Fetch font bytes (TTF/OTF) for a family.
    fn load_family(&self, family: &str) -> impl Future<Output = ThumbResult<Vec<u8>>>;

    /// Font used when a family fails to load. `None` means such text cannot be drawn.
    fn fallback(&self) -> Option<Arc<Vec<u8>>> {
        None
    }
}

/// Stable request identifier for a font family: `font-<family>` with whitespace runs as `-`.
pub fn font_request_id(family: &str) -> String {
    let mut id = String::from("font-");
    id.push_str(&family.split_whitespace().collect::<Vec<_>>().join("-"));
    id
}

/// Load state of one requested family.
#[derive(Clone, Debug)]
pub enum FontStatus {
    /// Requested, not loaded yet.
    Pending,
    /// Loaded successfully.
    Loaded(Arc<Vec<u8>>),
    /// Load failed; the fallback font substitutes.
    Fallback,
}

#[derive(Clone, Debug)]
struct FontEntry {
    family: String,
    status: FontStatus,
}

/// Font bytes resolved for a family, with the key used to cache its shaping registration.
#[derive(Clone, Debug)]
pub struct ResolvedFont {
    /// Key for shaping caches (`font_request_id` or `"fallback"`).
    pub key: String,
    /// Font bytes.
    pub bytes: Arc<Vec<u8>>,
}

/// Idempotent font loader with a single readiness barrier.
pub struct FontGate<P> {
    provider: P,
    entries: HashMap<String, FontEntry>,
    requests_issued: usize,
}

impl<P: FontProvider> FontGate<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            entries: HashMap::new(),
            requests_issued: 0,
        }
    }

    /// Borrow the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mark every not-yet-requested family as pending.
    pub fn request<'a>(&mut self, families: impl IntoIterator<Item = &'a str>) {
        for family in families {
            let id = font_request_id(family);
            self.entries.entry(id).or_insert_with(|| FontEntry {
                family: family.to_owned(),
                status: FontStatus::Pending,
            });
        }
    }

    /// Resolve once every pending family has loaded or failed over to the fallback.
    #[tracing::instrument(skip_all)]
    pub async fn ready(&mut self) {
        let mut pending: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| matches!(e.status, FontStatus::Pending))
            .map(|(id, _)| id.clone())
            .collect();
        pending.sort();

        for id in pending {
            let Some(family) = self.entries.get(&id).map(|e| e.family.clone()) else {
                continue;
            };
            self.requests_issued += 1;
            let status = match self.provider.load_family(&family).await {
                Ok(bytes) => {
                    tracing::debug!(%family, bytes = bytes.len(), "font loaded");
                    FontStatus::Loaded(Arc::new(bytes))
                }
                Err(e) => {
                    tracing::warn!(%family, error = %e, "font failed to load; using fallback");
                    FontStatus::Fallback
                }
            };
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.status = status;
            }
        }
    }

    /// Status of a family, if it was ever requested.
    pub fn status(&self, family: &str) -> Option<&FontStatus> {
        self.entries.get(&font_request_id(family)).map(|e| &e.status)
    }

    /// `true` when no requested family is still pending.
    pub fn is_ready(&self) -> bool {
        !self
            .entries
            .values()
            .any(|e| matches!(e.status, FontStatus::Pending))
    }

    /// Number of load requests sent to the provider so far.
    pub fn request_count(&self) -> usize {
        self.requests_issued
    }

    /// Font to draw `family` with: its own bytes, else the fallback, else none.
    pub fn font_for(&self, family: &str) -> Option<ResolvedFont> {
        let id = font_request_id(family);
        if let Some(FontEntry {
            status: FontStatus::Loaded(bytes),
            ..
        }) = self.entries.get(&id)
        {
            return Some(ResolvedFont {
                key: id,
                bytes: bytes.clone(),
            });
        }
        self.provider.fallback().map(|bytes| ResolvedFont {
            key: "fallback".to_owned(),
            bytes,
        })
    }
}

/// Filesystem font provider driven by [`FontConfig`].
///
/// Lookup order: explicit `families` entry, then a file in `dir` whose normalized stem matches
/// the family (`"Open Sans"` matches `OpenSans.ttf`, `open-sans-regular.otf`, ...).
#[derive(Clone, Debug, Default)]
pub struct DirFontProvider {
    dir: Option<PathBuf>,
    families: BTreeMap<String, PathBuf>,
    fallback: Option<Arc<Vec<u8>>>,
}

impl DirFontProvider {
    /// Build from configuration, reading the fallback font eagerly.
    pub fn from_config(cfg: &FontConfig) -> ThumbResult<Self> {
        let fallback = match &cfg.fallback {
            Some(p) => Some(Arc::new(read_font(p)?)),
            None => None,
        };
        Ok(Self {
            dir: cfg.dir.clone(),
            families: cfg.families.clone(),
            fallback,
        })
    }

    fn locate(&self, family: &str) -> Option<PathBuf> {
        if let Some(p) = self.families.get(family) {
            return Some(p.clone());
        }
        let dir = self.dir.as_ref()?;
        let want = normalize_family(family);
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
            .ok()?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
            })
            .collect();
        candidates.sort();

        let stem_of = |p: &Path| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(normalize_family)
                .unwrap_or_default()
        };
        let exact = candidates.iter().find(|p| {
            let s = stem_of(p);
            s == want || s == format!("{want}regular")
        });
        exact
            .or_else(|| candidates.iter().find(|p| stem_of(p).starts_with(&want)))
            .cloned()
    }
}

impl FontProvider for DirFontProvider {
    async fn load_family(&self, family: &str) -> ThumbResult<Vec<u8>> {
        let path = self
            .locate(family)
            .ok_or_else(|| ThumbError::io(format!("no font file found for family '{family}'")))?;
        read_font(&path)
    }

    fn fallback(&self) -> Option<Arc<Vec<u8>>> {
        self.fallback.clone()
    }
}

fn read_font(path: &Path) -> ThumbResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| ThumbError::io(format!("failed to read font '{}': {e}", path.display())))
}

fn normalize_family(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
