//! Chord grouping
//!
//! Partition a note sequence into clusters of simultaneous onsets.

use std::collections::BTreeMap;

use super::types::ChordGroup;
use crate::song::Note;

/// Group notes by exact start time.
///
/// Groups come back in ascending time order and notes inside a group keep
/// their input order. Only identical timestamps are merged: notes 1ms apart
/// always land in different groups. The input does not need to be sorted.
///
/// # Example
/// ```
/// use keyscore::{group_chords, Note};
///
/// let notes = vec![
///     Note::new("1Key0", 0),
///     Note::new("1Key1", 0),
///     Note::new("1Key2", 500),
/// ];
/// let groups = group_chords(&notes);
///
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].time, 0);
/// assert_eq!(groups[0].keys(), vec!["1Key0", "1Key1"]);
/// assert_eq!(groups[1].keys(), vec!["1Key2"]);
/// ```
pub fn group_chords(notes: &[Note]) -> Vec<ChordGroup> {
    let mut by_time: BTreeMap<u64, Vec<Note>> = BTreeMap::new();
    for note in notes {
        by_time.entry(note.time).or_default().push(note.clone());
    }

    let groups: Vec<ChordGroup> = by_time
        .into_iter()
        .map(|(time, notes)| ChordGroup { time, notes })
        .collect();

    log::debug!(
        "Found {} chords in {} time groups",
        chord_count(&groups),
        groups.len()
    );
    groups
}

/// Number of groups that press more than one key
pub fn chord_count(groups: &[ChordGroup]) -> usize {
    groups.iter().filter(|group| group.is_chord()).count()
}
