// src/model/entry.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    Hatena,
    Zenn,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Hatena => f.write_str("hatena"),
            PlatformKind::Zenn => f.write_str("zenn"),
        }
    }
}

/// A publishing platform. Lower `priority` wins exact-timestamp ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    #[serde(rename = "type")]
    pub kind: PlatformKind,
    pub priority: i32,
}

impl Platform {
    pub const HATENA: Platform = Platform {
        kind: PlatformKind::Hatena,
        priority: 1,
    };
    pub const ZENN: Platform = Platform {
        kind: PlatformKind::Zenn,
        priority: 2,
    };
}

// Must stay sorted by priority ascending.
const PLATFORMS: [Platform; 2] = [Platform::HATENA, Platform::ZENN];

/// Built-in platforms, highest priority (lowest number) first.
pub fn platforms_by_priority() -> impl Iterator<Item = Platform> {
    PLATFORMS.into_iter()
}

/// A published entry as returned by a fetcher. Never mutated after fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub platform: Platform,
}

/// Picks the most recent entry; equal timestamps go to the lower priority value.
///
/// The result does not depend on input order. Entries that tie on both keys are
/// further ordered by platform kind, title and body so that even duplicates
/// coming from different fetch completions resolve the same way.
pub fn latest<I>(entries: I) -> Option<Entry>
where
    I: IntoIterator<Item = Entry>,
{
    entries.into_iter().min_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.platform.priority.cmp(&b.platform.priority))
            .then_with(|| a.platform.kind.cmp(&b.platform.kind))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.body.cmp(&b.body))
    })
}
