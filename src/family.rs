//! The family of general string hashes the search engine can build on.
//!
//! Every member maps `(bytes, seed) -> u32` and is total and
//! deterministic; the engine diversifies retries purely through the
//! seed. Collected from:
//! - http://www.cse.yorku.ca/~oz/hash.html Oz's hash functions.
//! - http://www.burtleburtle.net/bob/hash/doobs.html Bob Jenkins'
//!   1997 Dr. Dobbs article.

use byteorder::{ByteOrder, LittleEndian};
use clap::ValueEnum;

// ====================================
// Dispatch

/// Selects one general hash for the lifetime of a search.
///
/// The choice is made once at engine construction and threaded through
/// by value; there is no process-global function pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum HashFamily {
    Bingo,
    Murmur,
    Oat,
    Jsw,
    Bob,
    #[default]
    Icke2,
}

impl HashFamily {
    /// Hash `data` under `seed` with the selected member.
    #[inline]
    pub fn hash(self, data: &[u8], seed: u32) -> u32 {
        match self {
            HashFamily::Bingo => bingo(data, seed),
            HashFamily::Murmur => murmur(data, seed),
            HashFamily::Oat => oat(data, seed),
            HashFamily::Jsw => jsw(data, seed),
            HashFamily::Bob => bob(data, seed),
            HashFamily::Icke2 => icke2(data, seed),
        }
    }

    /// The name the CLI and the emitter use for this member.
    pub fn name(self) -> &'static str {
        match self {
            HashFamily::Bingo => "bingo",
            HashFamily::Murmur => "murmur",
            HashFamily::Oat => "oat",
            HashFamily::Jsw => "jsw",
            HashFamily::Bob => "bob",
            HashFamily::Icke2 => "icke2",
        }
    }
}

impl std::fmt::Display for HashFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ====================================
// bingo

/// Bernstein's djb2 in its xor form, `v = v * 33 ^ c`.
///
/// From http://www.cse.yorku.ca/~oz/hash.html:
///
/// > this algorithm (k=33) was first reported by dan bernstein many
/// > years ago in comp.lang.c. another version of this algorithm (now
/// > favored by bernstein) uses xor: hash(i) = hash(i - 1) * 33 ^
/// > str[i]; the magic of number 33 (why it works better than many
/// > other constants, prime or not) has never been adequately
/// > explained.
#[inline]
pub fn bingo(data: &[u8], seed: u32) -> u32 {
    let mut v = seed;
    for &c in data {
        v = v.wrapping_mul(33) ^ c as u32;
    }
    v
}

// ====================================
// murmur

/// Tokyo Cabinet's multiplicative hash, `v = v * 37 + c`.
///
/// A zero seed falls back to the constant 19780211 (Hirabayashi's
/// birthday) so the multiplier has something to chew on.
#[inline]
pub fn murmur(data: &[u8], seed: u32) -> u32 {
    let mut v = if seed != 0 { seed } else { 19780211 };
    for &c in data {
        v = v.wrapping_mul(37).wrapping_add(c as u32);
    }
    v
}

// ====================================
// oat

/// Bob Jenkins' one-at-a-time hash.
///
/// From http://www.burtleburtle.net/bob/hash/doobs.html:
///
/// > This is similar to the rotating hash, but it actually mixes
/// > the internal state. It takes 9n+9 instructions and produces a
/// > full 4-byte result. Preliminary analysis suggests there are no
/// > funnels.
#[inline]
pub fn oat(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    for &c in data {
        h = h.wrapping_add(c as u32);
        h = h.wrapping_add(h << 10);
        h ^= h >> 6;
    }
    h = h.wrapping_add(h << 3);
    h ^= h >> 11;
    h = h.wrapping_add(h << 15);
    h
}

// ====================================
// jsw

/// Julienne Walker's rotating hash, `v = rol(v, 1) ^ c`.
///
/// A zero seed falls back to 16777551.
#[inline]
pub fn jsw(data: &[u8], seed: u32) -> u32 {
    let mut v = if seed != 0 { seed } else { 16777551 };
    for &c in data {
        v = v.rotate_left(1) ^ c as u32;
    }
    v
}

// ====================================
// bob

/// > mix -- mix 3 32-bit values reversibly.
/// >
/// > For every delta with one or two bit set, and the deltas of all
/// > three high bits or all three low bits, whether the original value
/// > of a,b,c is almost all zero or is uniformly distributed,
/// > * If mix() is run forward or backward, at least 32 bits in a,b,c
/// >   have at least 1/4 probability of changing.
/// > * If mix() is run forward, every bit of c will change between 1/3
/// >   and 2/3 of the time.
#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*b);
    *a = a.wrapping_sub(*c);
    *a ^= *c >> 13;
    *b = b.wrapping_sub(*c);
    *b = b.wrapping_sub(*a);
    *b ^= *a << 8;
    *c = c.wrapping_sub(*a);
    *c = c.wrapping_sub(*b);
    *c ^= *b >> 13;
    *a = a.wrapping_sub(*b);
    *a = a.wrapping_sub(*c);
    *a ^= *c >> 12;
    *b = b.wrapping_sub(*c);
    *b = b.wrapping_sub(*a);
    *b ^= *a << 16;
    *c = c.wrapping_sub(*a);
    *c = c.wrapping_sub(*b);
    *c ^= *b >> 5;
    *a = a.wrapping_sub(*b);
    *a = a.wrapping_sub(*c);
    *a ^= *c >> 3;
    *b = b.wrapping_sub(*c);
    *b = b.wrapping_sub(*a);
    *b ^= *a << 10;
    *c = c.wrapping_sub(*a);
    *c = c.wrapping_sub(*b);
    *c ^= *b >> 15;
}

/// Bob Jenkins' lookup2-style block hash.
///
/// Two registers are seeded with the golden ratio, the third with
/// `seed`; whole 12-byte blocks are folded in as three little-endian
/// words and mixed, then the residual length and the 1..11 trailing
/// bytes are added before one final mix. The result is `c`.
///
/// See http://www.burtleburtle.net/bob/hash/doobs.html.
pub fn bob(data: &[u8], seed: u32) -> u32 {
    let mut a: u32 = 0x9e3779b9;
    let mut b: u32 = 0x9e3779b9;
    let mut c: u32 = seed;

    let mut rest = data;
    while rest.len() >= 12 {
        a = a.wrapping_add(LittleEndian::read_u32(&rest[0..4]));
        b = b.wrapping_add(LittleEndian::read_u32(&rest[4..8]));
        c = c.wrapping_add(LittleEndian::read_u32(&rest[8..12]));
        mix(&mut a, &mut b, &mut c);
        rest = &rest[12..];
    }

    // the first byte of c is reserved for the length
    c = c.wrapping_add(rest.len() as u32);
    if rest.len() >= 11 {
        c = c.wrapping_add((rest[10] as u32) << 24);
    }
    if rest.len() >= 10 {
        c = c.wrapping_add((rest[9] as u32) << 16);
    }
    if rest.len() >= 9 {
        c = c.wrapping_add((rest[8] as u32) << 8);
    }
    if rest.len() >= 8 {
        b = b.wrapping_add((rest[7] as u32) << 24);
    }
    if rest.len() >= 7 {
        b = b.wrapping_add((rest[6] as u32) << 16);
    }
    if rest.len() >= 6 {
        b = b.wrapping_add((rest[5] as u32) << 8);
    }
    if rest.len() >= 5 {
        b = b.wrapping_add(rest[4] as u32);
    }
    if rest.len() >= 4 {
        a = a.wrapping_add((rest[3] as u32) << 24);
    }
    if rest.len() >= 3 {
        a = a.wrapping_add((rest[2] as u32) << 16);
    }
    if rest.len() >= 2 {
        a = a.wrapping_add((rest[1] as u32) << 8);
    }
    if !rest.is_empty() {
        a = a.wrapping_add(rest[0] as u32);
    }
    mix(&mut a, &mut b, &mut c);
    c
}

// ====================================
// icke2

/// Forms lower bits from lower bits and higher bits from higher bits.
///
/// Each little-endian word contributes its low-3-bit lanes to `l` and
/// the remaining lanes to `h`; the accumulators slide one bit between
/// words so neighbouring bytes land on different output bits. Both are
/// folded down and combined with the seed. Note the seed only enters
/// as a final xor, so deltas between two keys are seed-invariant.
pub fn icke2(data: &[u8], seed: u32) -> u32 {
    let mut l: u32 = 0;
    let mut h: u32 = 0;

    let mut words = data.chunks_exact(4);
    for w in words.by_ref() {
        let w = LittleEndian::read_u32(w);
        l ^= w & 0x07070707;
        h ^= w & 0xfefefefe;
        l <<= 1;
        h >>= 1;
    }
    for &c in words.remainder() {
        l ^= (c & 0x07) as u32;
        h ^= (c & 0xfe) as u32;
        l <<= 1;
        h >>= 1;
    }

    l ^= l >> 6;
    l ^= l >> 12;
    l ^= l >> 18;
    h ^= h >> 3;
    h ^= h >> 11;
    h ^= h >> 17;
    seed ^ l ^ (h << 8)
}

// ------------------------------------

#[cfg(test)]
mod bingo_tests {
    use super::*;

    #[test]
    fn basic() {
        assert_eq!(bingo(b"", 0), 0);
        assert_eq!(bingo(b"a", 0), 97);
        assert_eq!(bingo(b"b", 0), 98);
        assert_eq!(bingo(b"ab", 0), 3299);
        assert_eq!(bingo(b"abcd", 0), 3591492);
        assert_eq!(bingo(b"hello, world", 0), 3966700620);
    }

    #[test]
    fn seeded() {
        assert_eq!(bingo(b"GET", 0x9e3779b9), 1234519855);
        assert_eq!(bingo(b"OPTIONS", 1), 3512558161);
    }
}

#[cfg(test)]
mod murmur_tests {
    use super::*;

    #[test]
    fn basic() {
        // a zero seed falls back to the default initializer
        assert_eq!(murmur(b"", 0), 19780211);
        assert_eq!(murmur(b"a", 0), 731867904);
        assert_eq!(murmur(b"b", 0), 731867905);
        assert_eq!(murmur(b"ab", 0), 1309308770);
        assert_eq!(murmur(b"abcd", 0), 1442347461);
        assert_eq!(murmur(b"hello, world", 0), 2864547963);
    }

    #[test]
    fn seeded() {
        assert_eq!(murmur(b"GET", 0x9e3779b9), 1183905713);
        assert_eq!(murmur(b"OPTIONS", 1), 2685307597);
    }
}

#[cfg(test)]
mod oat_tests {
    use super::*;

    #[test]
    fn basic() {
        assert_eq!(oat(b"", 0), 0);
        assert_eq!(oat(b"a", 0), 3392050242);
        assert_eq!(oat(b"b", 0), 14385563);
        assert_eq!(oat(b"ab", 0), 1172708952);
        assert_eq!(oat(b"abcd", 0), 3448463878);
        assert_eq!(oat(b"hello, world", 0), 466015908);
    }

    #[test]
    fn seeded() {
        assert_eq!(oat(b"GET", 0x9e3779b9), 1590807837);
        assert_eq!(oat(b"OPTIONS", 1), 606114224);
    }
}

#[cfg(test)]
mod jsw_tests {
    use super::*;

    #[test]
    fn basic() {
        assert_eq!(jsw(b"", 0), 16777551);
        assert_eq!(jsw(b"a", 0), 33555199);
        assert_eq!(jsw(b"b", 0), 33555196);
        assert_eq!(jsw(b"ab", 0), 67110300);
        assert_eq!(jsw(b"abcd", 0), 268441298);
        assert_eq!(jsw(b"hello, world", 0), 1486316);
    }

    #[test]
    fn seeded() {
        assert_eq!(jsw(b"GET", 0x9e3779b9), 4055616526);
        assert_eq!(jsw(b"OPTIONS", 1), 8123);
    }
}

#[cfg(test)]
mod bob_tests {
    use super::*;

    #[test]
    fn basic() {
        assert_eq!(bob(b"", 0), 3175731469);
        assert_eq!(bob(b"a", 0), 703514648);
        assert_eq!(bob(b"b", 0), 1420600727);
        assert_eq!(bob(b"ab", 0), 2558110785);
        assert_eq!(bob(b"abcd", 0), 1525030821);
        assert_eq!(bob(b"abcde", 0), 61433958);
        assert_eq!(bob(b"abcdefgh", 0), 88045406);
        assert_eq!(bob(b"abcdefghijk", 0), 3844836940);
    }

    #[test]
    fn blocks_and_tails() {
        // 12 bytes: one whole block, empty tail
        assert_eq!(bob(b"hello, world", 0), 3853784426);
        // 13 bytes: one block plus a 1-byte tail
        assert_eq!(bob(b"hello, world!", 0), 363127881);
        assert_eq!(bob(b"Now is the time for all good men", 0), 4105524534);
    }

    #[test]
    fn seeded() {
        assert_eq!(bob(b"GET", 0x9e3779b9), 3770109798);
        assert_eq!(bob(b"OPTIONS", 1), 3328743755);
        assert_eq!(bob(b"hello, world!", 0x12345678), 3904625393);
    }
}


#[cfg(test)]
mod dispatch_tests {
    use super::*;

    #[test]
    fn matches_free_functions() {
        let data: &[u8] = b"dispatch";
        assert_eq!(HashFamily::Bingo.hash(data, 3), bingo(data, 3));
        assert_eq!(HashFamily::Murmur.hash(data, 3), murmur(data, 3));
        assert_eq!(HashFamily::Oat.hash(data, 3), oat(data, 3));
        assert_eq!(HashFamily::Jsw.hash(data, 3), jsw(data, 3));
        assert_eq!(HashFamily::Bob.hash(data, 3), bob(data, 3));
        assert_eq!(HashFamily::Icke2.hash(data, 3), icke2(data, 3));
    }

    #[test]
    fn default_is_icke2() {
        assert_eq!(HashFamily::default(), HashFamily::Icke2);
    }
}
