use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

/// Process-lifetime narrative progress. Created once at boot and handed to
/// every scene by reference; the only state that survives a scene change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressRegistry {
    completed_levels: u32,
    flags: BTreeSet<String>,
    counters: BTreeMap<String, u32>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh registry that starts as if `level` milestones were already reached.
    pub fn seeded(level: u32) -> Self {
        Self {
            completed_levels: level,
            ..Self::default()
        }
    }

    pub fn level(&self) -> u32 {
        self.completed_levels
    }

    /// Raises `completedLevels` to `level` if it is higher. Returns whether the
    /// stored value changed.
    pub fn advance_level(&mut self, level: u32) -> bool {
        if level <= self.completed_levels {
            debug!(
                requested = level,
                current = self.completed_levels,
                "level_advance_ignored"
            );
            return false;
        }
        info!(from = self.completed_levels, to = level, "level_advanced");
        self.completed_levels = level;
        true
    }

    pub fn flag(&self, key: &str) -> bool {
        self.flags.contains(key)
    }

    /// Latches `key`. Returns `true` only on the call that actually set it.
    pub fn raise_flag(&mut self, key: &str) -> bool {
        if self.flags.contains(key) {
            return false;
        }
        self.flags.insert(key.to_string());
        info!(flag = key, "flag_raised");
        true
    }

    /// Flags are set-once; writing `false` over a raised flag is ignored.
    pub fn set_flag(&mut self, key: &str, value: bool) -> bool {
        if value {
            return self.raise_flag(key);
        }
        if self.flags.contains(key) {
            debug!(flag = key, "flag_reset_ignored");
        }
        false
    }

    pub fn counter(&self, key: &str) -> u32 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn set_counter(&mut self, key: &str, value: u32) {
        self.counters.insert(key.to_string(), value);
    }

    pub fn increment_counter(&mut self, key: &str) -> u32 {
        let counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Scene-local set-once latches. Recreated with every scene instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Latches {
    raised: BTreeSet<&'static str>,
}

impl Latches {
    pub fn is_set(&self, key: &'static str) -> bool {
        self.raised.contains(key)
    }

    pub fn latch(&mut self, key: &'static str) -> bool {
        let newly_set = self.raised.insert(key);
        if newly_set {
            debug!(latch = key, "scene_latch_raised");
        }
        newly_set
    }

    pub fn len(&self) -> usize {
        self.raised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }
}

/// Where a gate's set-once flag lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatchKey {
    /// Dies with the scene instance.
    Scene(&'static str),
    /// Stored in the [`ProgressRegistry`] and survives scene changes.
    Progress(&'static str),
}

impl LatchKey {
    pub fn is_set(self, latches: &Latches, registry: &ProgressRegistry) -> bool {
        match self {
            LatchKey::Scene(key) => latches.is_set(key),
            LatchKey::Progress(key) => registry.flag(key),
        }
    }

    pub fn raise(self, latches: &mut Latches, registry: &mut ProgressRegistry) -> bool {
        match self {
            LatchKey::Scene(key) => latches.latch(key),
            LatchKey::Progress(key) => registry.raise_flag(key),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LatchKey::Scene(key) | LatchKey::Progress(key) => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_levels_never_regress() {
        let mut registry = ProgressRegistry::new();
        let mut last = registry.level();
        for requested in [2, 1, 0, 3, 3, 1, 5, 4] {
            registry.advance_level(requested);
            assert!(registry.level() >= last);
            last = registry.level();
        }
        assert_eq!(registry.level(), 5);
    }

    #[test]
    fn unset_keys_read_as_defaults() {
        let registry = ProgressRegistry::new();
        assert!(!registry.flag("hasTicket"));
        assert_eq!(registry.counter("memoryShards"), 0);
        assert_eq!(registry.level(), 0);
    }

    #[test]
    fn raising_a_flag_twice_matches_raising_it_once() {
        let mut once = ProgressRegistry::new();
        once.raise_flag("hasTicket");

        let mut twice = ProgressRegistry::new();
        assert!(twice.raise_flag("hasTicket"));
        assert!(!twice.raise_flag("hasTicket"));

        assert_eq!(once, twice);
    }

    #[test]
    fn false_never_clears_a_raised_flag() {
        let mut registry = ProgressRegistry::new();
        registry.set_flag("showHelpHint", true);
        registry.set_flag("showHelpHint", false);
        assert!(registry.flag("showHelpHint"));
    }

    #[test]
    fn counters_increment_from_zero() {
        let mut registry = ProgressRegistry::new();
        assert_eq!(registry.increment_counter("memoryShards"), 1);
        assert_eq!(registry.increment_counter("memoryShards"), 2);
        registry.set_counter("memoryShards", 7);
        assert_eq!(registry.counter("memoryShards"), 7);
    }

    #[test]
    fn seeded_registry_starts_at_level() {
        let registry = ProgressRegistry::seeded(2);
        assert_eq!(registry.level(), 2);
    }

    #[test]
    fn snapshot_lists_flags_and_counters() {
        let mut registry = ProgressRegistry::seeded(1);
        registry.raise_flag("hasTicket");
        registry.increment_counter("memoryShards");
        let json = registry.snapshot_json().expect("registry should serialize");
        assert_eq!(
            json,
            r#"{"completed_levels":1,"flags":["hasTicket"],"counters":{"memoryShards":1}}"#
        );
    }

    #[test]
    fn latch_key_routes_to_scene_or_progress_storage() {
        let mut latches = Latches::default();
        let mut registry = ProgressRegistry::new();
        assert!(LatchKey::Scene("pie_12").raise(&mut latches, &mut registry));
        assert!(LatchKey::Progress("hasTicket").raise(&mut latches, &mut registry));
        assert!(latches.is_set("pie_12"));
        assert!(registry.flag("hasTicket"));
        assert!(!LatchKey::Scene("hasTicket").is_set(&latches, &registry));
    }
}
