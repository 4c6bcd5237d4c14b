// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-operation option records.
//
// Options arrive as loosely-typed key/value pairs (from JSON or `--opt k=v`
// on the command line) and are read back through typed getters. Every
// operation publishes an `OptionSpec` table with documented defaults, which
// `Options::with_defaults` folds in before the handler runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BlattwerkError, Result};

/// One documented option of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub key: &'static str,
    /// Default value as written on the command line; empty means "no default".
    pub default: &'static str,
    pub help: &'static str,
}

impl OptionSpec {
    pub const fn new(key: &'static str, default: &'static str, help: &'static str) -> Self {
        Self { key, default, help }
    }
}

/// Operation-specific key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Parse a `key=value` pair as given on the command line. Values that
    /// parse as JSON scalars keep their type; everything else is a string.
    pub fn parse_pair(&mut self, pair: &str) -> Result<()> {
        let (key, raw) = pair.split_once('=').ok_or_else(|| {
            BlattwerkError::InvalidOptions(format!("expected key=value, got {pair:?}"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(BlattwerkError::InvalidOptions(format!(
                "empty option key in {pair:?}"
            )));
        }
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
            _ => Value::String(raw.to_string()),
        };
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    /// Return a copy with every unset key filled in from `specs`.
    pub fn with_defaults(&self, specs: &[OptionSpec]) -> Result<Self> {
        let mut merged = self.clone();
        for spec in specs {
            if !spec.default.is_empty() && !merged.contains(spec.key) {
                // Defaults are parsed the same way command-line values are.
                merged.parse_pair(&format!("{}={}", spec.key, spec.default))?;
            }
        }
        Ok(merged)
    }

    /// String value; numbers and booleans are rendered to text.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn str_or(&self, key: &str, default: &str) -> String {
        self.str(key).unwrap_or_else(|| default.to_string())
    }

    /// Required string value.
    pub fn require_str(&self, key: &str) -> Result<String> {
        self.str(key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BlattwerkError::InvalidOptions(format!("option `{key}` is required")))
    }

    pub fn f32(&self, key: &str) -> Result<Option<f32>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(|v| Some(v as f32))
                .ok_or_else(|| invalid_number(key, &n.to_string())),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f32>()
                .map(Some)
                .map_err(|_| invalid_number(key, s)),
            Some(other) => Err(invalid_number(key, &other.to_string())),
        }
    }

    pub fn f32_or(&self, key: &str, default: f32) -> Result<f32> {
        Ok(self.f32(key)?.unwrap_or(default))
    }

    /// Whole-number value. Integral floats such as `3.0` are accepted.
    fn integer(&self, key: &str) -> Result<Option<i64>> {
        let whole = |v: f64| (v.fract() == 0.0 && v.abs() < 9.0e15).then_some(v as i64);
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(whole))
                .map(Some)
                .ok_or_else(|| invalid_number(key, &n.to_string())),
            Some(Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole))
                    .map(Some)
                    .ok_or_else(|| invalid_number(key, s))
            }
            Some(other) => Err(invalid_number(key, &other.to_string())),
        }
    }

    pub fn u32(&self, key: &str) -> Result<Option<u32>> {
        match self.integer(key)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| invalid_number(key, &v.to_string())),
        }
    }

    pub fn u32_or(&self, key: &str, default: u32) -> Result<u32> {
        Ok(self.u32(key)?.unwrap_or(default))
    }

    pub fn i32_or(&self, key: &str, default: i32) -> Result<i32> {
        match self.integer(key)? {
            None => Ok(default),
            Some(v) => i32::try_from(v).map_err(|_| invalid_number(key, &v.to_string())),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.0.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(true),
                "false" | "no" | "0" | "off" => Ok(false),
                _ => Err(BlattwerkError::InvalidOptions(format!(
                    "option `{key}` expects a boolean, got {s:?}"
                ))),
            },
            Some(other) => Err(BlattwerkError::InvalidOptions(format!(
                "option `{key}` expects a boolean, got {other}"
            ))),
        }
    }
}

fn invalid_number(key: &str, raw: &str) -> BlattwerkError {
    BlattwerkError::InvalidOptions(format!("option `{key}` expects a number, got {raw:?}"))
}
