use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::debug;
use regex::Regex;

/// Content setup read from an openmw.cfg-style file and/or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentConfig {
    pub data: Vec<PathBuf>,
    pub data_local: Option<PathBuf>,
    pub content: Vec<String>,
}

impl ContentConfig {
    /// Read `key=value` lines from `path`. Relative data paths are taken
    /// relative to the directory holding the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config =
            Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;

        if let Some(base) = path.parent() {
            for dir in config.data.iter_mut().chain(config.data_local.iter_mut()) {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let line_pattern = Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_-]*)\s*=\s*(.*?)\s*$")
            .context("building config line pattern")?;

        let mut config = Self::default();
        for (number, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some(caps) = line_pattern.captures(line) else {
                bail!("line {}: expected key=value, found {trimmed:?}", number + 1);
            };
            let key = &caps[1];
            let value = &caps[2];
            match key {
                "data" => config.data.push(PathBuf::from(
                    unquote(value).with_context(|| format!("line {}", number + 1))?,
                )),
                "data-local" => {
                    let local = unquote(value).with_context(|| format!("line {}", number + 1))?;
                    if !local.is_empty() {
                        config.data_local = Some(PathBuf::from(local));
                    }
                }
                "content" => config.content.push(value.to_string()),
                other => debug!("ignoring config key {other}"),
            }
        }
        Ok(config)
    }

    /// Append settings given on the command line after the file's own.
    pub fn extend(&mut self, data: Vec<PathBuf>, content: Vec<String>) {
        self.data.extend(data);
        self.content.extend(content);
    }

    /// Data directories in lookup order: `data` entries, then `data-local`,
    /// keeping only those that exist.
    pub fn data_directories(&self) -> Vec<PathBuf> {
        self.data
            .iter()
            .chain(self.data_local.iter())
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    debug!("skipping missing data directory {}", dir.display());
                }
                exists
            })
            .cloned()
            .collect()
    }

    /// Content files to load, in order. Lua script manifests are not record
    /// files and are left out.
    pub fn content_files(&self) -> Vec<&str> {
        self.content
            .iter()
            .map(String::as_str)
            .filter(|name| !is_script_manifest(name))
            .collect()
    }
}

fn is_script_manifest(name: &str) -> bool {
    let suffix = ".omwscripts";
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Strip the optional quotes around a path. Inside quotes `&` escapes the
/// next character, so `&"` is a quote and `&&` an ampersand.
fn unquote(value: &str) -> Result<String> {
    let Some(rest) = value.strip_prefix('"') else {
        return Ok(value.to_string());
    };
    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => match chars.next() {
                Some(escaped) => out.push(escaped),
                None => bail!("escape at end of quoted path {value}"),
            },
            '"' => return Ok(out),
            _ => out.push(c),
        }
    }
    bail!("unterminated quoted path {value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_quotes_and_comments() -> Result<()> {
        let config = ContentConfig::parse(
            r#"
# installation
data="/games/Morrowind/Data Files"
data=/mods/plain
data="/mods/Tom &&&" Jerry"
data-local="/home/user/data"
encoding=win1252
content=Morrowind.esm
  content = Tribunal.esm
content=scripts.omwscripts
"#,
        )?;
        assert_eq!(
            config.data,
            vec![
                PathBuf::from("/games/Morrowind/Data Files"),
                PathBuf::from("/mods/plain"),
                PathBuf::from("/mods/Tom &\" Jerry"),
            ]
        );
        assert_eq!(config.data_local, Some(PathBuf::from("/home/user/data")));
        assert_eq!(config.content_files(), vec!["Morrowind.esm", "Tribunal.esm"]);
        assert_eq!(config.content.len(), 3);
        Ok(())
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(ContentConfig::parse("data=\"/unterminated").is_err());
        assert!(ContentConfig::parse("just some words").is_err());
    }

    #[test]
    fn script_manifests_are_filtered_case_insensitively() {
        assert!(is_script_manifest("Mod.OMWSCRIPTS"));
        assert!(!is_script_manifest("omwscripts.esp"));
        assert!(!is_script_manifest("x"));
    }

    #[test]
    fn missing_directories_are_dropped_and_local_comes_last() -> Result<()> {
        let base = tempfile::tempdir()?;
        let data = base.path().join("data");
        let local = base.path().join("local");
        fs::create_dir_all(&data)?;
        fs::create_dir_all(&local)?;

        let config = ContentConfig {
            data: vec![base.path().join("gone"), data.clone()],
            data_local: Some(local.clone()),
            content: Vec::new(),
        };
        assert_eq!(config.data_directories(), vec![data, local]);
        Ok(())
    }

    #[test]
    fn relative_paths_resolve_against_the_config_file() -> Result<()> {
        let base = tempfile::tempdir()?;
        let cfg = base.path().join("openmw.cfg");
        fs::write(&cfg, "data=Data Files\ncontent=Morrowind.esm\n")?;
        let config = ContentConfig::from_file(&cfg)?;
        assert_eq!(config.data, vec![base.path().join("Data Files")]);
        Ok(())
    }
}
