use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Identifies a preferred lead locomotive for the creation of a player consist.
///
/// `NoLocomotive` explicitly requests a consist without any locomotive; it only matches
/// consists whose lead-choice set is exactly `{NoLocomotive}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreferenceKey {
    NoLocomotive,
    Locomotive(PathBuf),
}

impl PreferenceKey {
    /// Build a locomotive key from a filesystem path. The path does not need to exist.
    pub fn locomotive<P: AsRef<Path>>(path: P) -> Self {
        PreferenceKey::Locomotive(normalize_path(path))
    }

    /// Singleton set returned for consists without a locomotive.
    pub fn no_locomotive_set() -> BTreeSet<PreferenceKey> {
        BTreeSet::from([PreferenceKey::NoLocomotive])
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            PreferenceKey::NoLocomotive => None,
            PreferenceKey::Locomotive(path) => Some(path),
        }
    }
}

/// Make `path` absolute and fold away `.` and `..` components without touching the disk.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_paths_produce_equal_keys() {
        let a = PreferenceKey::locomotive("content/trains/trainset/loco/../loco/./a.eng");
        let b = PreferenceKey::locomotive("content/trains/trainset/loco/a.eng");
        assert_eq!(a, b);
        assert!(a.path().is_some_and(|p| p.is_absolute()));
    }

    #[test]
    fn no_locomotive_only_equals_itself() {
        let loco = PreferenceKey::locomotive("x.eng");
        assert_ne!(PreferenceKey::NoLocomotive, loco);
        assert_eq!(PreferenceKey::NoLocomotive, PreferenceKey::NoLocomotive);
        assert_eq!(PreferenceKey::no_locomotive_set().len(), 1);
        assert!(PreferenceKey::NoLocomotive.path().is_none());
    }
}
