use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use walkdir::WalkDir;

use crate::error::{RestoreError, TargetSpecError};

/// Expands a leading `~`, then `$VAR` and `${VAR}`. Unset variables stay as
/// written without blocking the other expansions.
pub fn expand(path: &str) -> String {
    let home = shellexpand::tilde(path);
    shellexpand::env_with_context_no_errors(&home, |var| env::var(var).ok()).into_owned()
}

pub fn absolute(path: &str) -> PathBuf {
    let expanded = expand(path);
    std::path::absolute(&expanded).unwrap_or_else(|_| PathBuf::from(expanded))
}

pub fn has_wildcard(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Expands a wildcard pattern against the local filesystem. Matches are
/// sorted; an empty result is not an error here.
pub fn expand_glob(pattern: &Path) -> Result<Vec<PathBuf>, TargetSpecError> {
    let text = pattern.to_string_lossy();
    let glob = GlobBuilder::new(&text)
        .literal_separator(true)
        .build()
        .map_err(|e| TargetSpecError::InvalidGlob {
            pattern: text.to_string(),
            reason: e.kind().to_string(),
        })?
        .compile_matcher();

    let mut base = PathBuf::new();
    let mut parts: Vec<String> = Vec::new();
    for component in pattern.components() {
        let part = component.as_os_str().to_string_lossy();
        if parts.is_empty() && !has_wildcard(&part) {
            base.push(component);
            continue;
        }
        parts.push(part.into_owned());
    }
    let depth = parts.len();
    let recursive = parts.iter().any(|part| part == "**");
    if depth == 0 {
        return Ok(if pattern.exists() {
            vec![pattern.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let walker = if recursive {
        WalkDir::new(&base).min_depth(1)
    } else {
        WalkDir::new(&base).min_depth(depth).max_depth(depth)
    };
    let mut matches: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| glob.is_match(path))
        .filter(|path| !hides_dotfile(&base, path, &parts, recursive))
        .collect();
    matches.sort();
    Ok(matches)
}

/// Wildcards never match a leading `.`; hidden entries are only picked up
/// by pattern components that start with one.
fn hides_dotfile(base: &Path, path: &Path, parts: &[String], recursive: bool) -> bool {
    let Ok(relative) = path.strip_prefix(base) else {
        return false;
    };
    let names: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if recursive {
        let dotted_pattern = parts.iter().any(|part| part.starts_with('.'));
        return !dotted_pattern && names.iter().any(|name| name.starts_with('.'));
    }
    names
        .iter()
        .zip(parts)
        .any(|(name, part)| name.starts_with('.') && !part.starts_with('.'))
}

/// Resolves one configured source entry to the absolute paths it names.
pub fn resolve_source(raw: &str) -> Result<Vec<PathBuf>, TargetSpecError> {
    let path = absolute(raw);
    if has_wildcard(&path.to_string_lossy()) {
        let matches = expand_glob(&path)?;
        if matches.is_empty() {
            return Err(TargetSpecError::SourceGlobEmpty(raw.to_string()));
        }
        return Ok(matches);
    }
    if path.exists() {
        Ok(vec![path])
    } else {
        Err(TargetSpecError::SourceNotFound(raw.to_string()))
    }
}

pub fn is_tar_archive(path: &Path) -> bool {
    let name = path.to_string_lossy();
    [".tar.gz", ".tar.bz2", ".tar.xz"]
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Working directory switch for `borg extract`, which always writes into the
/// current directory. The original directory is restored by [`leave`] or,
/// failing that, on drop.
///
/// [`leave`]: WorkingDir::leave
pub struct WorkingDir {
    original: PathBuf,
    restored: bool,
}

impl WorkingDir {
    pub fn enter(destination: &Path) -> Result<Self, RestoreError> {
        if destination.is_file() {
            return Err(RestoreError::DestinationIsFile(destination.to_path_buf()));
        }
        let enter_err = |source| RestoreError::EnterDestination {
            path: destination.to_path_buf(),
            source,
        };
        let original = env::current_dir().map_err(enter_err)?;
        fs::create_dir_all(destination).map_err(enter_err)?;
        env::set_current_dir(destination).map_err(enter_err)?;
        Ok(Self {
            original,
            restored: false,
        })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    pub fn leave(mut self) -> Result<(), RestoreError> {
        self.restored = true;
        env::set_current_dir(&self.original).map_err(|source| RestoreError::LeaveDestination {
            path: self.original.clone(),
            source,
        })
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if !self.restored {
            let _ = env::set_current_dir(&self.original);
        }
    }
}
