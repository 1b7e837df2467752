//! The tuple stage: project every key to `(a, b)` under a trial salt
//! and group keys into `b`-buckets, rejecting salts that put two keys
//! on the same tuple.

use tracing::warn;

use super::{Searcher, GOLDEN_RATIO};
use crate::scramble::ceil_log2;

/// A key's two hash projections: `a` varies within a bucket, `b`
/// selects the bucket.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Tuple {
    pub a: u32,
    pub b: u32,
}

impl Searcher<'_> {
    /// Derive `(a, b)` for every key from `phash(key, salt * phi)`.
    pub(crate) fn compute_tuples(&mut self, salt: u32) {
        let alog = ceil_log2(self.alen);
        let blog = ceil_log2(self.blen);
        let ilev = salt.wrapping_mul(GOLDEN_RATIO);
        // both projections must fit one 32-bit hash
        debug_assert!(alog + blog <= 32);

        self.tups.clear();
        for i in 0..self.keys.len() {
            let h = self.family.hash(self.keys.key(i), ilev);
            self.tups.push(Tuple {
                a: if alog != 0 { (h >> blog) & (self.alen as u32 - 1) } else { 0 },
                b: if blog != 0 { h & (self.blen as u32 - 1) } else { 0 },
            });
        }
    }

    /// Group keys by `b` and count `(a, b)` collisions.
    ///
    /// Two keys on the same tuple can never be separated by any choice
    /// of `tab[b]`, so any collision rejects the salt. With `thorough`
    /// unset this returns at the first countable collision; set, it
    /// counts every colliding unordered pair for reporting.
    ///
    /// Byte-equal colliding pairs are duplicate keys in the input; they
    /// are reported with both 1-based line numbers whether or not they
    /// count (with `kmax > 1`, a group of at most `kmax` equal tuples
    /// may legally share a slot and is not counted as a collision).
    ///
    /// On a collision-free return the bucket lists double as the
    /// per-bucket key sets the assignment engine walks.
    pub(crate) fn build_buckets(&mut self, thorough: bool) -> usize {
        if self.buckets.len() < self.blen {
            self.buckets.resize_with(self.blen, Vec::new);
        }
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        for (i, t) in self.tups.iter().enumerate() {
            self.buckets[t.b as usize].push(i as u32);
        }

        let mut ncoll = 0usize;
        let mut by_a: Vec<u32> = Vec::new();
        for bucket in &self.buckets[..self.blen] {
            if bucket.len() < 2 {
                continue;
            }
            by_a.clear();
            by_a.extend_from_slice(bucket);
            by_a.sort_unstable_by_key(|&i| self.tups[i as usize].a);

            let mut run = 0;
            while run < by_a.len() {
                let a = self.tups[by_a[run] as usize].a;
                let mut end = run + 1;
                while end < by_a.len() && self.tups[by_a[end] as usize].a == a {
                    end += 1;
                }
                let group = &by_a[run..end];
                let counted = group.len() > self.kmax as usize;
                for (x, &i) in group.iter().enumerate() {
                    for &j in &group[x + 1..] {
                        let (i, j) = (i.min(j) as usize, i.max(j) as usize);
                        if self.keys.key(i) == self.keys.key(j) {
                            warn!(
                                "duplicate keys detected: line {}  vs  line {}  `{}'",
                                i + 1,
                                j + 1,
                                String::from_utf8_lossy(self.keys.key(i)),
                            );
                        }
                        if counted {
                            ncoll += 1;
                            if !thorough {
                                return ncoll;
                            }
                        }
                    }
                }
                run = end;
            }
        }
        ncoll
    }
}
