//! Generate perfect hash functions for fixed sets of byte-string keys.
//!
//! Given N distinct keys, the search finds a salt for a general string
//! hash, two power-of-two partition widths `alen` and `blen`, and a
//! small adjustment table `tab` such that
//!
//! ```text
//! H(key) = ((phash(key, salt) >> blog) & (alen-1))
//!              ^ scramble[tab[phash(key, salt) & (blen-1)]]
//! ```
//!
//! maps every key to its own slot below a power-of-two bound `smax`.
//! The result is emitted as C so consumers recognize the key set in
//! constant time with no probing.
//!
//! The construction is Bob Jenkins' perfect hashing scheme: a salt
//! retry loop around a graph-augmentation search that assigns the
//! per-bucket `tab` entries. See
//! http://www.burtleburtle.net/bob/hash/perfect.html.

pub mod emit;
pub mod family;
pub mod keys;
pub mod scramble;
pub mod search;

pub use emit::emit_c;
pub use family::HashFamily;
pub use keys::KeyVec;
pub use search::{find, PerfectHash, SearchError, SearchOpts};
