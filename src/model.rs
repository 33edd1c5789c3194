use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub game: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseGroupRecord {
    pub phase_id: u64,
    pub display_id: String,
    /// Wave identifier; filled in by the roster fetch.
    pub wave_id: Option<String>,
    /// Wave start, unix seconds; filled in by the roster fetch.
    pub start_time: Option<i64>,
    pub tournament_slug: String,
    pub tournament_name: String,
    pub tournament_id: u64,
}

pub type EventMap = BTreeMap<u64, EventRecord>;
pub type PhaseGroupMap = BTreeMap<u64, PhaseGroupRecord>;
/// discriminator -> gamer tag
pub type Roster = BTreeMap<String, String>;

/// Moves every entry of `incoming` into `target`. On a key collision the
/// incoming value replaces the existing one; the colliding keys are returned
/// so the caller can report them.
pub fn merge_last_wins<K: Ord + Clone, V>(
    target: &mut BTreeMap<K, V>,
    incoming: BTreeMap<K, V>,
) -> Vec<K> {
    let mut collisions = Vec::new();
    for (key, value) in incoming {
        if target.insert(key.clone(), value).is_some() {
            collisions.push(key);
        }
    }
    collisions
}
