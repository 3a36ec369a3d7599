//! Minimal INI-style configuration reader.
//!
//! `key=value` lines; `#` and `;` start comments, whole-line or inline.
//! No sections. Every lookup returns an f32; integer and boolean
//! parameters are cast by the caller. Missing, empty, or space-led values
//! warn on stderr and yield 0, which downstream casts read as "disabled".
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    /// Read a config file; a missing file warns and yields an empty
    /// config (every key then resolves to 0 / disabled).
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                eprintln!("config warning: cannot read {}: {err}", path.display());
                Self { values: HashMap::new() }
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut values = HashMap::new();
        for line in text.lines() {
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let mut line = line;
            if let Some((head, _)) = line.split_once('#') {
                line = head;
            }
            if let Some((head, _)) = line.split_once(';') {
                line = head;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            values.insert(key.to_string(), value.to_string());
        }
        Self { values }
    }

    /// Look a key up as f32. Warnings mirror the failure modes a hand-
    /// edited file actually produces: missing key, empty value, stray
    /// leading space, unparsable number.
    pub fn get(&self, key: &str) -> f32 {
        let Some(raw) = self.values.get(key) else {
            eprintln!("config warning: key not found: {key}");
            return 0.0;
        };
        if raw.is_empty() {
            eprintln!("config warning: key is empty: {key}");
            return 0.0;
        }
        if raw.starts_with(' ') {
            eprintln!("config warning: value has leading space: {key}");
            return 0.0;
        }
        match raw.trim_end().parse::<f32>() {
            Ok(v) => v,
            Err(_) => {
                eprintln!("config warning: not a number: {key}={raw}");
                0.0
            }
        }
    }
}
