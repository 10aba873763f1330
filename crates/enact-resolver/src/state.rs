// SPDX-License-Identifier: MIT OR Apache-2.0
//! Favorites and aliases, persisted as plain text records under the Enact
//! state directory (`~/.enact/`).
//!
//! `favorites.txt` is one tool name per line. `aliases.txt` is one `<alias>
//! <canonical name>` pair per line, whitespace-separated. Both are rewritten
//! in full on every mutation — the files are small and this keeps the format
//! trivially diffable and human-editable.

use crate::ResolverError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

async fn read_lines(path: &Path) -> Result<Vec<String>, ResolverError> {
    match fs::read_to_string(path).await {
        Ok(raw) => {
            Ok(raw.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')).map(String::from).collect())
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(ResolverError::Io { path: path.to_path_buf(), source }),
    }
}

async fn write_lines(path: &Path, lines: &[String]) -> Result<(), ResolverError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await.map_err(|source| ResolverError::Io { path: dir.to_path_buf(), source })?;
    }
    let body = lines.join("\n");
    let body = if body.is_empty() { body } else { format!("{body}\n") };
    fs::write(path, body).await.map_err(|source| ResolverError::Io { path: path.to_path_buf(), source })
}

/// Reads the favorites set from `<state_dir>/favorites.txt`.
pub async fn read_favorites(state_dir: &Path) -> Result<Vec<String>, ResolverError> {
    read_lines(&favorites_path(state_dir)).await
}

/// Adds `name` to favorites if not already present.
pub async fn add_favorite(state_dir: &Path, name: &str) -> Result<(), ResolverError> {
    let path = favorites_path(state_dir);
    let mut names = read_lines(&path).await?;
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
        names.sort();
        write_lines(&path, &names).await?;
    }
    Ok(())
}

/// Removes `name` from favorites, if present.
pub async fn remove_favorite(state_dir: &Path, name: &str) -> Result<(), ResolverError> {
    let path = favorites_path(state_dir);
    let mut names = read_lines(&path).await?;
    let before = names.len();
    names.retain(|n| n != name);
    if names.len() != before {
        write_lines(&path, &names).await?;
    }
    Ok(())
}

/// Reads the alias map (`alias -> canonical name`) from
/// `<state_dir>/aliases.txt`.
pub async fn read_aliases(state_dir: &Path) -> Result<BTreeMap<String, String>, ResolverError> {
    let lines = read_lines(&aliases_path(state_dir)).await?;
    let mut map = BTreeMap::new();
    for line in lines {
        if let Some((alias, canonical)) = line.split_once(char::is_whitespace) {
            map.insert(alias.trim().to_string(), canonical.trim().to_string());
        }
    }
    Ok(map)
}

/// Records `alias -> canonical`, overwriting any prior binding for `alias`.
pub async fn set_alias(state_dir: &Path, alias: &str, canonical: &str) -> Result<(), ResolverError> {
    let path = aliases_path(state_dir);
    let mut map = read_aliases(state_dir).await?;
    map.insert(alias.to_string(), canonical.to_string());
    let lines: Vec<String> = map.iter().map(|(a, c)| format!("{a} {c}")).collect();
    write_lines(&path, &lines).await
}

/// Removes the binding for `alias`, if present.
pub async fn remove_alias(state_dir: &Path, alias: &str) -> Result<(), ResolverError> {
    let path = aliases_path(state_dir);
    let mut map = read_aliases(state_dir).await?;
    if map.remove(alias).is_some() {
        let lines: Vec<String> = map.iter().map(|(a, c)| format!("{a} {c}")).collect();
        write_lines(&path, &lines).await?;
    }
    Ok(())
}

fn favorites_path(state_dir: &Path) -> PathBuf {
    state_dir.join("favorites.txt")
}

fn aliases_path(state_dir: &Path) -> PathBuf {
    state_dir.join("aliases.txt")
}
