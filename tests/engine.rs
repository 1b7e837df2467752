//! End-to-end scenarios: search, verify, emit.

use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use perfhash::{emit_c, find, HashFamily, KeyVec, PerfectHash, SearchOpts};

const HTTP_VERBS: &str = "GET\nPUT\nPOST\nHEAD\nDELETE\nOPTIONS\nTRACE\nCONNECT\nPATCH\n";

fn keyvec(bytes: &[u8]) -> KeyVec {
    KeyVec::from_reader(Cursor::new(bytes.to_vec())).unwrap()
}

/// Brute-force distinctness check straight from the published formula,
/// not through `PerfectHash::lookup`.
fn check_perfect(ph: &PerfectHash, keys: &KeyVec) {
    let blog = ph.blog();
    let ilev = ph.salt.wrapping_mul(0x9e3779b9);
    let mut seen = vec![false; ph.smax];
    for key in keys.iter() {
        let h = ph.family.hash(key, ilev);
        let a = (h >> blog) & (ph.alen as u32 - 1);
        let b = h & (ph.blen as u32 - 1);
        let slot = (a ^ ph.scramble[ph.tab[b as usize] as usize]) as usize;
        assert!(slot < ph.smax);
        assert!(!seen[slot], "two keys landed on slot {}", slot);
        seen[slot] = true;
        assert_eq!(slot as u32, ph.lookup(key));
    }
}

#[test]
fn http_verbs_are_perfectly_hashed() {
    let keys = keyvec(HTTP_VERBS.as_bytes());
    let ph = find(&keys, HashFamily::Bob, &SearchOpts::default()).unwrap();

    assert_eq!(ph.smax, 16);
    assert!(ph.alen.is_power_of_two() && ph.alen <= ph.smax);
    assert!(ph.blen.is_power_of_two() && ph.blen <= ph.smax);
    check_perfect(&ph, &keys);
}

#[test]
fn scramble_is_a_permutation_of_the_range() {
    let keys = keyvec(HTTP_VERBS.as_bytes());
    let ph = find(&keys, HashFamily::Oat, &SearchOpts::default()).unwrap();

    let mut vals: Vec<u32> = ph.scramble[..ph.smax].to_vec();
    vals.sort_unstable();
    let expect: Vec<u32> = (0..ph.smax as u32).collect();
    assert_eq!(vals, expect);
}

#[test]
fn random_keys_fill_smax_1024() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut text = Vec::new();
    for _ in 0..1024 {
        let key: [u8; 8] = rng.gen();
        for b in key {
            // keep the line structure intact
            text.extend_from_slice(format!("{:02x}", b).as_bytes());
        }
        text.push(b'\n');
    }
    let keys = keyvec(&text);
    assert_eq!(keys.len(), 1024);

    let ph = find(&keys, HashFamily::Bob, &SearchOpts::default()).unwrap();
    assert_eq!(ph.smax, 1024);
    check_perfect(&ph, &keys);
}

#[test]
fn search_is_deterministic_across_runs() {
    let keys = keyvec(HTTP_VERBS.as_bytes());
    let first = find(&keys, HashFamily::Murmur, &SearchOpts::default()).unwrap();
    let second = find(&keys, HashFamily::Murmur, &SearchOpts::default()).unwrap();
    assert_eq!(first.salt, second.salt);
    assert_eq!(first.tab, second.tab);
}

#[test]
fn emission_is_byte_identical_across_runs() {
    let keys = keyvec(HTTP_VERBS.as_bytes());
    let ph = find(&keys, HashFamily::Bob, &SearchOpts::default()).unwrap();

    let mut first = Vec::new();
    emit_c(&ph, &mut first).unwrap();
    let mut second = Vec::new();
    emit_c(&ph, &mut second).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn emitted_code_carries_the_constants() {
    let keys = keyvec(HTTP_VERBS.as_bytes());
    let ph = find(&keys, HashFamily::Bob, &SearchOpts::default()).unwrap();

    let mut buf = Vec::new();
    emit_c(&ph, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains(&format!("salt = {:#x}U * 0x9e3779b9U;", ph.salt)));
    assert!(text.contains(&format!("blog = {}U;", ph.blog())));
    assert!(text.contains(&format!("smax = {}U;", ph.smax)));
    assert!(text.contains("phash_lookup"));
}

#[test]
fn empty_input_degenerates() {
    let keys = keyvec(b"");
    let ph = find(&keys, HashFamily::Icke2, &SearchOpts::default()).unwrap();
    assert_eq!((ph.salt, ph.blen), (0, 0));

    let mut buf = Vec::new();
    emit_c(&ph, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(!text.contains("tab[] ="));
    assert!(text.contains("salt = 0x0U * 0x9e3779b9U;"));
}

#[test]
fn print_masking_values() {
    // `print --lower 8 --hash=bingo` output bytes for GET and PUT
    assert_eq!(perfhash::family::bingo(b"GET", 0) & 0xff, 0xf6);
    assert_eq!(perfhash::family::bingo(b"PUT", 0) & 0xff, 0xf1);
}
