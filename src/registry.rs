//! Concurrency-safe record of content already accounted for.
//!
//! The registry maps a file size to the set of [`FullFingerprint`]s that
//! either exist at the destination or were accepted for copying in this
//! run. [`DuplicateRegistry::try_register`] is the only place where the
//! accept/reject decision is made: it checks and inserts under one lock, so
//! two workers holding byte-identical files cannot both win.
//!
//! Locking is per size. The outer [`DashMap`] is touched only to fetch (or
//! create) a bucket; the bucket's own mutex then serializes decisions for
//! that size without blocking unrelated sizes.
//!
//! A file admitted because its size was unique is recorded without a
//! fingerprint ([`DuplicateRegistry::claim_size`]). A later plan that meets
//! the same size takes it back with [`DuplicateRegistry::take_unhashed`] and
//! fingerprints it before deciding anything for that size.

use crate::hash::{FullFingerprint, PartialFingerprint};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Bucket {
    full: Mutex<HashSet<FullFingerprint>>,
    partial: Mutex<HashSet<PartialFingerprint>>,
    unhashed: Mutex<Vec<PathBuf>>,
}

/// Lock a set, recovering it if another worker panicked while holding it.
///
/// Every critical section is a single `HashSet` call, so a poisoned set is
/// still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-size sets of full fingerprints, shared across worker threads.
///
/// Entries are never removed.
#[derive(Debug, Default)]
pub struct DuplicateRegistry {
    buckets: DashMap<u64, Arc<Bucket>>,
}

impl DuplicateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, size: u64) -> Arc<Bucket> {
        // Clone the Arc so the shard lock is released before the bucket lock is taken
        Arc::clone(&self.buckets.entry(size).or_default())
    }

    fn existing(&self, size: u64) -> Option<Arc<Bucket>> {
        self.buckets.get(&size).map(|bucket| Arc::clone(&bucket))
    }

    /// Record `fingerprint` for `size` unless it is already present.
    ///
    /// Returns `true` if this call inserted it (the caller owns the content
    /// and may copy it) and `false` if it was already known (the caller holds
    /// a duplicate). Indivisible under concurrent calls: for any key, exactly
    /// one caller ever sees `true`.
    pub fn try_register(&self, size: u64, fingerprint: FullFingerprint) -> bool {
        lock(&self.bucket(size).full).insert(fingerprint)
    }

    /// Whether `fingerprint` is known for `size`. Never mutates.
    ///
    /// A `false` answer may be stale by the time the caller acts on it; use
    /// [`try_register`](Self::try_register) to decide.
    pub fn contains(&self, size: u64, fingerprint: &FullFingerprint) -> bool {
        self.existing(size).is_some_and(|bucket| {
            let set = lock(&bucket.full);
            set.contains(fingerprint)
        })
    }

    /// Pre-populate `size` with fingerprints of content that already exists.
    pub fn seed<I>(&self, size: u64, fingerprints: I)
    where
        I: IntoIterator<Item = FullFingerprint>,
    {
        let bucket = self.bucket(size);
        lock(&bucket.full).extend(fingerprints);
    }

    /// Whether anything is recorded for `size`, fingerprinted or not.
    pub fn has_size(&self, size: u64) -> bool {
        self.buckets.contains_key(&size)
    }

    /// Admit `path` for `size` without a fingerprint, if `size` is unknown.
    ///
    /// Returns `true` if this call created the bucket for `size`. Returns
    /// `false` and records nothing if the size is already known; the caller
    /// must then fingerprint the file and go through
    /// [`try_register`](Self::try_register).
    pub fn claim_size(&self, size: u64, path: &Path) -> bool {
        match self.buckets.entry(size) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Bucket {
                    unhashed: Mutex::new(vec![path.to_path_buf()]),
                    ..Bucket::default()
                }));
                true
            }
        }
    }

    /// Remove and return the files admitted for `size` by
    /// [`claim_size`](Self::claim_size).
    pub fn take_unhashed(&self, size: u64) -> Vec<PathBuf> {
        self.existing(size)
            .map(|bucket| std::mem::take(&mut *lock(&bucket.unhashed)))
            .unwrap_or_default()
    }

    /// Remember the partial fingerprint of a file accepted for `size`.
    pub fn note_partial(&self, size: u64, partial: PartialFingerprint) {
        lock(&self.bucket(size).partial).insert(partial);
    }

    /// Whether a file with this partial fingerprint was accepted for `size`.
    pub fn has_partial(&self, size: u64, partial: &PartialFingerprint) -> bool {
        self.existing(size).is_some_and(|bucket| {
            let set = lock(&bucket.partial);
            set.contains(partial)
        })
    }

    /// Total number of full fingerprints across all sizes.
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| {
                let set = lock(&bucket.full);
                set.len()
            })
            .sum()
    }

    /// Whether no fingerprint has been recorded.
    ///
    /// Files admitted by [`claim_size`](Self::claim_size) carry no
    /// fingerprint; see [`has_size`](Self::has_size).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct sizes with a bucket.
    pub fn sizes(&self) -> usize {
        self.buckets.len()
    }
}
