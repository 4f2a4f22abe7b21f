//! # Grouper Module
//!
//! Partitions a fingerprint index into duplicate sets.
//!
//! Membership depends on fingerprint equality alone. Names, folder depth and
//! timestamps never decide whether two files are duplicates; discovery order
//! only decides how members are listed.

mod index;

pub use index::FingerprintIndex;

use crate::core::hasher::Fingerprint;
use crate::core::scanner::MediaFile;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Two or more files with byte-identical content.
///
/// Construction checks the invariants and the group is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    fingerprint: Fingerprint,
    size: u64,
    members: Vec<MediaFile>,
}

impl DuplicateGroup {
    /// Build a group, ordering members by discovery.
    ///
    /// Returns `None` unless there are at least two members and every member
    /// carries `fingerprint` and the same size.
    pub fn new(fingerprint: Fingerprint, mut members: Vec<MediaFile>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        let size = members[0].size;
        let consistent = members
            .iter()
            .all(|m| m.fingerprint == Some(fingerprint) && m.size == size);
        if !consistent {
            return None;
        }

        members.sort_by_key(|m| m.discovery_index);
        Some(Self {
            fingerprint,
            size,
            members,
        })
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Size of one member in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn members(&self) -> &[MediaFile] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.members.iter().map(|m| &m.path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.members.iter().any(|m| m.path == path)
    }

    /// Bytes freed if exactly one copy is kept
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * (self.members.len() as u64 - 1)
    }

    fn first_discovered(&self) -> usize {
        self.members[0].discovery_index
    }
}

/// Turns hashed files into duplicate groups
pub struct DuplicateGrouper;

impl DuplicateGrouper {
    /// Group a finished index
    pub fn group(index: FingerprintIndex) -> Vec<DuplicateGroup> {
        Self::group_map(index.into_inner())
    }

    /// Group an already-extracted fingerprint map
    pub fn group_map(map: HashMap<Fingerprint, Vec<MediaFile>>) -> Vec<DuplicateGroup> {
        let mut groups: Vec<DuplicateGroup> = map
            .into_iter()
            .filter_map(|(fingerprint, members)| DuplicateGroup::new(fingerprint, members))
            .collect();

        groups.sort_by_key(DuplicateGroup::first_discovered);
        tracing::debug!(groups = groups.len(), "grouped duplicates");
        groups
    }

    /// Group any collection of hashed files
    pub fn group_files(files: impl IntoIterator<Item = MediaFile>) -> Vec<DuplicateGroup> {
        let index = FingerprintIndex::new();
        for file in files {
            index.insert(file);
        }
        Self::group(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::{HashedContent, FINGERPRINT_LEN};
    use std::time::SystemTime;

    fn file(name: &str, index: usize, fp: u8, size: u64) -> MediaFile {
        MediaFile::discovered(PathBuf::from(name), size, SystemTime::UNIX_EPOCH, index).with_hash(
            HashedContent {
                fingerprint: Fingerprint::from_bytes([fp; FINGERPRINT_LEN]),
                bytes: size,
            },
        )
    }

    #[test]
    fn singletons_are_not_groups() {
        let groups = DuplicateGrouper::group_files(vec![
            file("/a.jpg", 0, 1, 10),
            file("/b.jpg", 1, 2, 10),
        ]);
        assert!(groups.is_empty());
    }

    #[test]
    fn members_follow_discovery_order() {
        let groups = DuplicateGrouper::group_files(vec![
            file("/z/late.jpg", 5, 1, 10),
            file("/a/early.jpg", 2, 1, 10),
            file("/m/middle.jpg", 3, 1, 10),
        ]);

        assert_eq!(groups.len(), 1);
        let order: Vec<_> = groups[0].members().iter().map(|m| m.discovery_index).collect();
        assert_eq!(order, vec![2, 3, 5]);
    }

    #[test]
    fn groups_are_ordered_by_first_member() {
        let groups = DuplicateGrouper::group_files(vec![
            file("/b1.jpg", 4, 2, 5),
            file("/a1.jpg", 1, 1, 5),
            file("/b2.jpg", 0, 2, 5),
            file("/a2.jpg", 3, 1, 5),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].fingerprint().as_bytes()[0], 2);
        assert_eq!(groups[1].fingerprint().as_bytes()[0], 1);
    }

    #[test]
    fn new_rejects_inconsistent_members() {
        let fp = Fingerprint::from_bytes([1; FINGERPRINT_LEN]);
        assert!(DuplicateGroup::new(fp, vec![file("/a.jpg", 0, 1, 10)]).is_none());
        assert!(DuplicateGroup::new(fp, vec![file("/a.jpg", 0, 1, 10), file("/b.jpg", 1, 1, 11)])
            .is_none());
        assert!(DuplicateGroup::new(fp, vec![file("/a.jpg", 0, 1, 10), file("/b.jpg", 1, 2, 10)])
            .is_none());
    }

    #[test]
    fn reclaimable_bytes_excludes_one_copy() {
        let groups = DuplicateGrouper::group_files(vec![
            file("/a.jpg", 0, 1, 100),
            file("/b.jpg", 1, 1, 100),
            file("/c.jpg", 2, 1, 100),
        ]);
        assert_eq!(groups[0].reclaimable_bytes(), 200);
        assert!(groups[0].contains(Path::new("/b.jpg")));
    }
}
