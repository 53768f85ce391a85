// SPDX-License-Identifier: GPL-3.0-only

//! Mount option tokens
//!
//! The fourth table field is a free-form comma list. It is split once, at
//! parse time, into discrete tokens so that later stages never search
//! strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single token of the options field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MountOption {
    /// Bare token such as `noauto` or `x-stabbie`
    Flag { name: String },
    /// `key=value` token such as `port=2049`
    Value { key: String, value: String },
}

impl MountOption {
    pub fn parse(token: &str) -> Self {
        match token.split_once('=') {
            Some((key, value)) => MountOption::Value {
                key: key.to_string(),
                value: value.to_string(),
            },
            None => MountOption::Flag {
                name: token.to_string(),
            },
        }
    }

    pub fn key(&self) -> &str {
        match self {
            MountOption::Flag { name } => name,
            MountOption::Value { key, .. } => key,
        }
    }
}

impl fmt::Display for MountOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountOption::Flag { name } => write!(f, "{name}"),
            MountOption::Value { key, value } => write!(f, "{key}={value}"),
        }
    }
}

/// Option tokens in declared order, repeats included
///
/// mount(8) applies options left to right, so a later token overrides an
/// earlier one and repeats must survive into the rendered string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountOptions(Vec<MountOption>);

impl MountOptions {
    /// Split a raw comma-separated options field.
    ///
    /// Empty tokens are dropped. Everything else is kept in order.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(MountOption::parse)
                .collect(),
        )
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.0
            .iter()
            .any(|option| matches!(option, MountOption::Flag { name: flag } if flag == name))
    }

    /// Value of the last `key=value` token with this key
    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.iter().rev().find_map(|option| match option {
            MountOption::Value { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountOption> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Join the tokens back into an options string, leaving out every token
    /// whose key matches `excluded`.
    pub fn render_without(&self, excluded: &str) -> String {
        self.0
            .iter()
            .filter(|option| option.key() != excluded)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for MountOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(","))
    }
}

impl<'a> IntoIterator for &'a MountOptions {
    type Item = &'a MountOption;
    type IntoIter = std::slice::Iter<'a, MountOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
