//! Derivation of modifier overlay locations.
//!
//! `path/to/values.yaml` with modifiers `[dev, us]` expands to
//! `path/to/values.yaml`, `path/to/values.dev.yaml`, `path/to/values.us.yaml`.
//! Nothing here touches the filesystem or network.

/// A location split into directory, base name and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Everything before the final `/` segment (empty if none, `/` at the root).
    pub dir: String,
    /// Final segment without its extension.
    pub name: String,
    /// Text after the last `.` of the final segment (empty if none).
    pub ext: String,
}

impl Location {
    /// Location of the overlay for `modifier`.
    pub fn with_modifier(&self, modifier: &str) -> String {
        let mut file = format!("{}.{}", self.name, modifier);
        if !self.ext.is_empty() {
            file.push('.');
            file.push_str(&self.ext);
        }
        if self.dir.is_empty() {
            file
        } else if self.dir.ends_with('/') {
            format!("{}{}", self.dir, file)
        } else {
            format!("{}/{}", self.dir, file)
        }
    }
}

/// Split a file path or URL into its directory, name and extension.
///
/// Backslashes are treated as `/` so that Windows paths decompose the same way.
pub fn decompose(location: &str) -> Location {
    let normalized = location.replace('\\', "/");
    let (dir, file) = match normalized.rsplit_once('/') {
        Some(("", file)) => ("/".to_string(), file),
        Some((dir, file)) => (dir.to_string(), file),
        None => (String::new(), normalized.as_str()),
    };

    // a leading dot (".env") names the file, it does not start an extension
    let (name, ext) = match file.rfind('.') {
        Some(idx) if idx > 0 => (&file[..idx], &file[idx + 1..]),
        _ => (file, ""),
    };

    Location {
        dir,
        name: name.to_string(),
        ext: ext.to_string(),
    }
}

/// Expand a base location into its ordered overlay chain.
pub fn expand<S: AsRef<str>>(location: &str, modifiers: &[S]) -> Vec<String> {
    let decomposed = decompose(location);
    std::iter::once(location.to_string())
        .chain(
            modifiers
                .iter()
                .map(|modifier| decomposed.with_modifier(modifier.as_ref())),
        )
        .collect()
}

/// Extension of the final segment, lowercased.
pub fn extension(location: &str) -> String {
    decompose(location).ext.to_lowercase()
}
