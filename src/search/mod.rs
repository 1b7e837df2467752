//! The search driver: an outer loop over trial salts interleaved with
//! parameter growth, feeding the tuple stage and the assignment
//! engine until the mapping is perfect or the parameter space is
//! exhausted.

mod assign;
mod tuples;

use thiserror::Error;
use tracing::{error, info};

use crate::family::HashFamily;
use crate::keys::KeyVec;
use crate::scramble::{ceil_log2, init_scramble};

use assign::Scratch;
use tuples::Tuple;

/// Multiplier turning a small trial salt into the hash initializer.
pub const GOLDEN_RATIO: u32 = 0x9e3779b9;

/// Bucket count at which the assignment engine stops ranging over all
/// of `smax` and confines `tab` values to byte range, so the emitted
/// table can keep an explicit scramble indirection with 256 entries.
pub const USE_SCRAMBLE: usize = 2048;

/// Salts to burn on tuple collisions before growing a dimension.
const RETRY_MKTAB: u32 = 4096;
/// Assignment failures tolerated per parameter set.
const RETRY_PERFP: u32 = 1;

/// Terminal search failures. Everything before these is retried
/// internally and never surfaces to the caller.
#[derive(Debug, Error)]
pub enum SearchError {
    /// No salt yielded distinct tuples even at maximum `alen`/`blen`.
    #[error("cannot find perfect hash, still {collisions} collisions")]
    Collisions { collisions: usize },
    /// Tuples were distinct but no assignment exists at maximum `blen`.
    #[error("cannot perfect hash")]
    Unassignable,
}

/// Knobs the CLI exposes; the defaults are the strict search.
#[derive(Debug, Clone)]
pub struct SearchOpts {
    /// Keys permitted per slot. 1 is the guaranteed strict mode;
    /// larger values switch to a best-effort greedy assignment.
    pub kmax: u32,
    /// Override for the initial bucket count, rounded up to a power
    /// of two and clamped to `[1, smax]`. Diagnostic use.
    pub buckets: Option<usize>,
}

impl Default for SearchOpts {
    fn default() -> SearchOpts {
        SearchOpts { kmax: 1, buckets: None }
    }
}

/// A found perfect hash: everything the emitter and a consumer need
/// to evaluate `H(key) = a ^ scramble[tab[b]]`.
#[derive(Debug, Clone)]
pub struct PerfectHash {
    pub family: HashFamily,
    pub salt: u32,
    pub smax: usize,
    pub alen: usize,
    pub blen: usize,
    /// Per-bucket adjustment indices into `scramble`; length `blen`.
    pub tab: Vec<u32>,
    /// The scramble table the search ran against.
    pub scramble: Vec<u32>,
}

impl PerfectHash {
    #[inline]
    pub fn blog(&self) -> u32 {
        ceil_log2(self.blen)
    }

    /// Evaluate the hash for `key`. Injective over the input key set;
    /// arbitrary (but `< smax`) for anything else.
    pub fn lookup(&self, key: &[u8]) -> u32 {
        if self.blen == 0 {
            return 0;
        }
        let h = self.family.hash(key, self.salt.wrapping_mul(GOLDEN_RATIO));
        let a = (h >> self.blog()) & (self.alen as u32 - 1);
        let b = h & (self.blen as u32 - 1);
        a ^ self.scramble[self.tab[b as usize] as usize]
    }
}

/// Initial `alen`/`blen` for a given range and key count.
///
/// `alen` and `blen` must be powers of two because both projections
/// are produced by masking the initial hash. `blen` is what the
/// emitted table pays for, so it starts as small as the key density
/// lets it; the thresholds were found empirically against key sets of
/// widely varying sizes. Values of `blen` below `smax/4` stop working
/// as the set fills up, and `smax/2` always works.
fn guess_lengths(smax: usize, nkeys: usize) -> (usize, usize) {
    let dnkeys = nkeys as f64;
    let dsmax = smax as f64;

    let alen = smax;
    let blen = if smax / 4 <= 1 << 14 {
        if dnkeys <= dsmax * 0.56 {
            smax / 32
        } else if dnkeys <= dsmax * 0.74 {
            smax / 16
        } else {
            smax / 8
        }
    } else if dnkeys <= dsmax * 0.6 {
        smax / 16
    } else if dnkeys <= dsmax * 0.8 {
        smax / 8
    } else {
        smax / 4
    };
    (alen.max(1), blen.max(1))
}

/// One search over one key set. Owns every working buffer so repeated
/// trials reuse their allocations.
pub(crate) struct Searcher<'k> {
    keys: &'k KeyVec,
    family: HashFamily,
    kmax: u32,
    smax: usize,
    alen: usize,
    blen: usize,
    tups: Vec<Tuple>,
    buckets: Vec<Vec<u32>>,
    scramble: Vec<u32>,
    scratch: Scratch,
}

/// Search for a perfect hash over `keys`.
pub fn find(keys: &KeyVec, family: HashFamily, opts: &SearchOpts) -> Result<PerfectHash, SearchError> {
    Searcher::new(keys, family, opts).run()
}

impl<'k> Searcher<'k> {
    fn new(keys: &'k KeyVec, family: HashFamily, opts: &SearchOpts) -> Searcher<'k> {
        let smax = 1usize << ceil_log2(keys.len());
        let (alen, mut blen) = guess_lengths(smax, keys.len());
        if let Some(b) = opts.buckets {
            blen = (1usize << ceil_log2(b.max(1))).min(smax);
        }
        Searcher {
            keys,
            family,
            kmax: opts.kmax.max(1),
            smax,
            alen,
            blen,
            tups: Vec::with_capacity(keys.len()),
            buckets: Vec::new(),
            scramble: init_scramble(smax),
            scratch: Scratch::default(),
        }
    }

    fn run(mut self) -> Result<PerfectHash, SearchError> {
        if self.keys.is_empty() {
            // nothing to search; the emitter handles the degenerate
            // shape
            return Ok(self.into_result(0, 0));
        }

        let mut badk = 0u32;
        let mut badp = 0u32;
        let mut trysalt: u32 = 1;
        loop {
            self.compute_tuples(trysalt);

            if self.build_buckets(false) > 0 {
                // two keys share (a, b); no tab entry can split them
                badk += 1;
                if badk < RETRY_MKTAB {
                    trysalt = trysalt.wrapping_add(1);
                    continue;
                } else if self.alen < self.smax {
                    self.alen *= 2;
                } else if self.blen < self.smax {
                    self.blen *= 2;
                } else {
                    let collisions = self.build_buckets(true);
                    error!("cannot find perfect hash, still {} collisions", collisions);
                    return Err(SearchError::Collisions { collisions });
                }
                // wider projections, fresh budget
                badk = 0;
                badp = 0;
                trysalt = trysalt.wrapping_add(1);
            } else if !self.assign() {
                badp += 1;
                if badp < RETRY_PERFP {
                    trysalt = trysalt.wrapping_add(1);
                    continue;
                } else if self.blen < self.smax {
                    self.blen *= 2;
                    // keep the salt: distinct tuples survive a blen
                    // doubling, only the b masks widen
                } else {
                    error!("cannot perfect hash");
                    return Err(SearchError::Unassignable);
                }
                badp = 0;
            } else {
                info!("built perfect hash table of size {}", self.blen);
                let blen = self.blen;
                return Ok(self.into_result(trysalt, blen));
            }
        }
    }

    fn into_result(self, salt: u32, blen: usize) -> PerfectHash {
        PerfectHash {
            family: self.family,
            salt,
            smax: self.smax,
            alen: self.alen,
            blen,
            tab: self.scratch.tab[..blen].to_vec(),
            scramble: self.scramble,
        }
    }
}

// ------------------------------------
