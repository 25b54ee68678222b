//! Guard against re-issuing an identical request
//!
//! Each request is reduced to a SHA-256 fingerprint of its URL, query
//! parameters and headers. Parameters and headers are sorted first so the
//! fingerprint does not depend on insertion order.

use std::collections::{HashMap, VecDeque};

use log::warn;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::constants::DEFAULT_LOOP_HISTORY;
use crate::template::value_to_text;

type Fingerprint = [u8; 32];

/// Generate a deterministic fingerprint for one request.
///
/// Every field is length-prefixed, so no two distinct requests share the
/// same byte stream.
pub fn request_fingerprint<'a, P, H>(url: &str, params: P, headers: H) -> Fingerprint
where
    P: IntoIterator<Item = (&'a String, &'a Value)>,
    H: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut hasher = Sha256::new();
    update_field(&mut hasher, url.as_bytes());

    for pairs in [sorted_pairs(params), sorted_pairs(headers)] {
        hasher.update((pairs.len() as u64).to_le_bytes());
        for (k, v) in pairs {
            update_field(&mut hasher, k.as_bytes());
            update_field(&mut hasher, v.as_bytes());
        }
    }

    hasher.finalize().into()
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn sorted_pairs<'a, I>(pairs: I) -> Vec<(&'a str, String)>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut sorted: Vec<_> = pairs
        .into_iter()
        .map(|(k, v)| (k.as_str(), value_to_text(v)))
        .collect();
    sorted.sort();
    sorted
}

/// Bounded memory of recent request fingerprints.
///
/// Lookups and insertions are O(1); once `capacity` fingerprints are held
/// the oldest one is forgotten.
#[derive(Debug, Clone)]
pub struct LoopDetector {
    capacity: usize,
    history: VecDeque<Fingerprint>,
    seen: HashMap<Fingerprint, usize>,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LOOP_HISTORY)
    }
}

impl LoopDetector {
    /// Create a detector remembering up to `capacity` requests (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
            seen: HashMap::with_capacity(capacity),
        }
    }

    /// Whether this exact request was already issued within the window.
    ///
    /// A request that is not a repeat is recorded.
    pub fn is_stuck_in_loop<'a, P, H>(&mut self, url: &str, params: P, headers: H) -> bool
    where
        P: IntoIterator<Item = (&'a String, &'a Value)>,
        H: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let fingerprint = request_fingerprint(url, params, headers);
        if self.seen.contains_key(&fingerprint) {
            warn!("Request to {} repeats an earlier request", url);
            return true;
        }

        if self.history.len() == self.capacity {
            if let Some(oldest) = self.history.pop_front() {
                self.forget(&oldest);
            }
        }
        self.history.push_back(fingerprint);
        *self.seen.entry(fingerprint).or_insert(0) += 1;
        false
    }

    fn forget(&mut self, fingerprint: &Fingerprint) {
        if let Some(count) = self.seen.get_mut(fingerprint) {
            *count -= 1;
            if *count == 0 {
                self.seen.remove(fingerprint);
            }
        }
    }

    /// Forget every recorded request.
    pub fn reset(&mut self) {
        self.history.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
