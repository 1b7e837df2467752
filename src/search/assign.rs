//! The assignment engine: choose `tab[b]` for every bucket so that
//! `a ^ scramble[tab[b]]` lands every key on its own slot.
//!
//! The search per bucket is Tarjan-style augmentation over a spanning
//! tree of buckets: each tree edge records "re-assigning this parent
//! collides with exactly one placed key, whose bucket is the child".
//! When a collision-free leaf turns up, `apply` flips the `tab` values
//! along the path so the unmapped bucket becomes placeable.

use tracing::debug;

use super::tuples::Tuple;
use super::{Searcher, USE_SCRAMBLE};

/// Marks an unused slot in the hash table; every real entry is a key
/// index, which is always below the key count.
pub(crate) const NIL: u32 = u32::MAX;

/// One node of the spanning-tree queue.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct QItem {
    /// Bucket this node stands for; 0 doubles as "no collision" on the
    /// leaf that triggers an apply.
    b: u32,
    /// Queue index of the parent node.
    par: u32,
    /// Candidate `tab` value for the parent's bucket.
    newval: u32,
    /// The parent's `tab` value when this node was enqueued.
    oldval: u32,
}

/// Owned scratch state for one search; grown when `blen` or `smax`
/// grows, reset per assignment trial. Keeping it out of the call tree
/// makes the engine re-entrant.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    queue: Vec<QItem>,
    /// `ht[h]` is the key currently occupying slot `h`, or `NIL`.
    ht: Vec<u32>,
    /// `water[b]` is the highest `root + 1` that already enqueued `b`.
    water: Vec<u32>,
    /// The output under construction.
    pub tab: Vec<u32>,
    /// Per-slot occupancy, used by the k-perfect path only.
    occ: Vec<u32>,
}

impl Scratch {
    pub(crate) fn reset(&mut self, blen: usize, smax: usize) {
        if self.queue.len() < blen + 1 {
            self.queue.resize(blen + 1, QItem::default());
        }
        if self.ht.len() < smax {
            self.ht.resize(smax, NIL);
        }
        if self.water.len() < blen {
            self.water.resize(blen, 0);
        }
        if self.tab.len() < blen {
            self.tab.resize(blen, 0);
        }
        self.ht.fill(NIL);
        self.water.fill(0);
        self.tab.fill(0);
    }
}

/// Everything `augment`/`apply` read but never write.
struct Cx<'a> {
    tups: &'a [Tuple],
    buckets: &'a [Vec<u32>],
    scramble: &'a [u32],
    smax: usize,
}

/// Walk the augmenting path from the newest child back to the root,
/// flipping `tab` along the way.
///
/// For each child -> parent step the parent bucket's keys are erased
/// from their current slots, the parent's `tab` entry is set to the
/// child's `newval` (`oldval` when rolling back), and the keys are
/// re-placed. Hitting an occupied slot on the forward pass undoes the
/// partial application by re-running the same walk with `rollback`
/// set; that nested call never recurses further, because only the
/// forward pass can fail. The root is skipped on rollback placement:
/// it never had slots before this augmentation.
fn apply(cx: &Cx<'_>, scr: &mut Scratch, tail: usize, rollback: bool) -> bool {
    let mut chld = tail - 1;
    while chld != 0 {
        let par = scr.queue[chld].par as usize;
        let pb = scr.queue[par].b as usize;

        // erase the parent bucket's current placements
        let stabb = cx.scramble[scr.tab[pb] as usize];
        for &i in &cx.buckets[pb] {
            let h = (cx.tups[i as usize].a ^ stabb) as usize;
            if scr.ht[h] == i {
                scr.ht[h] = NIL;
            }
        }

        scr.tab[pb] = if rollback {
            scr.queue[chld].oldval
        } else {
            scr.queue[chld].newval
        };

        let stabb = cx.scramble[scr.tab[pb] as usize];
        for &i in &cx.buckets[pb] {
            let h = (cx.tups[i as usize].a ^ stabb) as usize;
            if rollback && par == 0 {
                // the root never had a hash
            } else if !rollback && scr.ht[h] != NIL {
                // very rare: a sibling path re-used a slot this one
                // needs; undo everything done so far
                debug_assert!(!rollback);
                apply(cx, scr, tail, true);
                return false;
            } else {
                scr.ht[h] = i;
            }
        }
        chld = par;
    }
    true
}

/// Grow a spanning tree rooted at `root` until some bucket can be
/// re-assigned without collision, then apply the path.
///
/// Candidate `tab` values run over the whole scramble range while it
/// still fits `smax`; past `USE_SCRAMBLE` buckets the emitted table
/// narrows to byte entries, so only the first 256 are tried.
fn augment(cx: &Cx<'_>, scr: &mut Scratch, blen: usize, root: u32) -> bool {
    let limit = if blen < USE_SCRAMBLE { cx.smax } else { 0x100 };
    let wmax = root + 1;

    scr.queue[0] = QItem { b: root, par: 0, newval: 0, oldval: 0 };
    scr.water[root as usize] = wmax;
    let mut tail = 1usize;

    let mut q = 0usize;
    while q < tail {
        let bq = scr.queue[q].b as usize;

        'cand: for k in 0..limit {
            let stabb = cx.scramble[k];
            // the single bucket this candidate collides with, if any
            let mut chldb = 0u32;

            for &i in &cx.buckets[bq] {
                let h = (cx.tups[i as usize].a ^ stabb) as usize;
                if h >= cx.smax {
                    continue 'cand;
                }
                let occ = scr.ht[h];
                if occ != NIL {
                    let hitb = cx.tups[occ as usize].b;
                    if chldb != 0 && chldb != hitb {
                        // more than one distinct colliding bucket
                        continue 'cand;
                    }
                    if chldb == 0 {
                        chldb = hitb;
                        if scr.water[chldb as usize] == wmax {
                            // already explored under this root
                            continue 'cand;
                        }
                    }
                }
            }

            scr.queue[tail] = QItem {
                b: chldb,
                par: q as u32,
                newval: k as u32,
                oldval: scr.tab[bq],
            };
            tail += 1;

            if chldb != 0 {
                scr.water[chldb as usize] = wmax;
            } else if apply(cx, scr, tail, false) {
                return true;
            } else {
                // the tentative leaf did not pan out
                tail -= 1;
            }
        }
        q += 1;
    }
    false
}

impl Searcher<'_> {
    /// Try to assign every bucket, largest groups first.
    ///
    /// Larger buckets constrain the table the most, so they go in
    /// while it is still sparse. Returns false as soon as one bucket
    /// cannot be augmented in; the driver then grows `blen` or moves
    /// on to the next salt.
    pub(crate) fn assign(&mut self) -> bool {
        self.scratch.reset(self.blen, self.smax);
        if self.kmax > 1 {
            return self.assign_kperfect();
        }

        let cx = Cx {
            tups: &self.tups,
            buckets: &self.buckets,
            scramble: &self.scramble,
            smax: self.smax,
        };
        let maxk = self.buckets[..self.blen].iter().map(Vec::len).max().unwrap_or(0);
        for j in (1..=maxk).rev() {
            for b in 0..self.blen {
                if self.buckets[b].len() == j && !augment(&cx, &mut self.scratch, self.blen, b as u32) {
                    debug!("failed to map group of size {} for tab size {}", j, self.blen);
                    return false;
                }
            }
        }
        true
    }

    /// Greedy k-perfect assignment: no augmentation, first candidate
    /// whose slots all stay within `kmax` occupants wins. Best effort;
    /// strict perfection (`kmax == 1`) takes the augmenting path above.
    fn assign_kperfect(&mut self) -> bool {
        let limit = if self.blen < USE_SCRAMBLE { self.smax } else { 0x100 };
        if self.scratch.occ.len() < self.smax {
            self.scratch.occ.resize(self.smax, 0);
        }
        self.scratch.occ.fill(0);

        let mut slots: Vec<u32> = Vec::new();
        let maxk = self.buckets[..self.blen].iter().map(Vec::len).max().unwrap_or(0);
        for j in (1..=maxk).rev() {
            'bucket: for b in 0..self.blen {
                if self.buckets[b].len() != j {
                    continue;
                }
                'cand: for k in 0..limit {
                    let stabb = self.scramble[k];
                    slots.clear();
                    for &i in &self.buckets[b] {
                        let h = self.tups[i as usize].a ^ stabb;
                        if h as usize >= self.smax {
                            continue 'cand;
                        }
                        slots.push(h);
                    }
                    slots.sort_unstable();
                    let mut x = 0;
                    while x < slots.len() {
                        let h = slots[x];
                        let mut end = x + 1;
                        while end < slots.len() && slots[end] == h {
                            end += 1;
                        }
                        if self.scratch.occ[h as usize] + (end - x) as u32 > self.kmax {
                            continue 'cand;
                        }
                        x = end;
                    }
                    for &h in &slots {
                        self.scratch.occ[h as usize] += 1;
                    }
                    self.scratch.tab[b] = k as u32;
                    continue 'bucket;
                }
                debug!("failed to map group of size {} for tab size {}", j, self.blen);
                return false;
            }
        }
        true
    }
}
