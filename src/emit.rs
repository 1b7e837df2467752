//! Serialize a found hash as compilable C.
//!
//! The output is self-contained: the adjustment table, the constants,
//! the general hash the search ran with, and a lookup function. Below
//! `USE_SCRAMBLE` buckets the scramble indirection is folded into the
//! emitted `tab` (the entries become `scramble[tab[b]]`), so only
//! large tables carry an explicit scramble array, and then only the
//! 256 entries the assignment engine was allowed to reference.
//!
//! Emission is a pure function of the `PerfectHash`: equal inputs
//! produce byte-identical output.

use std::io::{self, Write};

use crate::family::HashFamily;
use crate::search::{PerfectHash, USE_SCRAMBLE};

// ====================================
// Integer widths

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CInt {
    U8,
    U16,
    U32,
}

impl CInt {
    fn name(self) -> &'static str {
        match self {
            CInt::U8 => "uint8_t",
            CInt::U16 => "uint16_t",
            CInt::U32 => "uint32_t",
        }
    }
}

/// A rule applies when `smax <= smax_max && blen >= blen_min`; the
/// first applicable rule wins.
struct WidthRule {
    smax_max: usize,
    blen_min: usize,
    ty: CInt,
}

/// `tab` entries: byte-sized while the values provably fit (small
/// range, or a large table whose entries are scramble indices below
/// 256), halfword otherwise.
const TAB_WIDTHS: [WidthRule; 3] = [
    WidthRule { smax_max: 0x100, blen_min: 0, ty: CInt::U8 },
    WidthRule { smax_max: usize::MAX, blen_min: 0x1000, ty: CInt::U8 },
    WidthRule { smax_max: usize::MAX, blen_min: 0, ty: CInt::U16 },
];

/// Scramble entries range over `[0, smax)`.
const SCRAMBLE_WIDTHS: [WidthRule; 2] = [
    WidthRule { smax_max: 0x10000, blen_min: 0, ty: CInt::U16 },
    WidthRule { smax_max: usize::MAX, blen_min: 0, ty: CInt::U32 },
];

fn pick_width(rules: &[WidthRule], smax: usize, blen: usize) -> CInt {
    for rule in rules {
        if smax <= rule.smax_max && blen >= rule.blen_min {
            return rule.ty;
        }
    }
    CInt::U32
}

// ====================================
// Emission

/// Write the generated C for `ph` to `out`.
pub fn emit_c<W: Write>(ph: &PerfectHash, out: &mut W) -> io::Result<()> {
    writeln!(out, "/* generated by perfhash; do not edit */")?;
    writeln!(out, "#include <stddef.h>")?;
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out)?;

    if ph.blen >= USE_SCRAMBLE {
        emit_scramble(ph, out)?;
    }
    if ph.blen > 0 {
        emit_tab(ph, out)?;
    }

    writeln!(out, "static const uint32_t salt = {:#x}U * 0x9e3779b9U;", ph.salt)?;
    writeln!(out, "static const uint32_t blog = {}U;", ph.blog())?;
    writeln!(out, "static const uint32_t alen = {}U;", ph.alen)?;
    writeln!(out, "static const uint32_t blen = {}U;", ph.blen)?;
    writeln!(out, "static const uint32_t smax = {}U;", ph.smax)?;
    writeln!(out)?;

    if ph.blen == 0 {
        // no keys, no table; keep the entry point callable
        writeln!(out, "static uint32_t")?;
        writeln!(out, "phash_lookup(const void *key, size_t len)")?;
        writeln!(out, "{{")?;
        writeln!(out, "\t(void)key;")?;
        writeln!(out, "\t(void)len;")?;
        writeln!(out, "\treturn 0U;")?;
        writeln!(out, "}}")?;
        return Ok(());
    }

    writeln!(out, "/* {} */", ph.family.name())?;
    out.write_all(family_c_body(ph.family).as_bytes())?;
    writeln!(out)?;

    writeln!(out, "static uint32_t")?;
    writeln!(out, "phash_lookup(const void *key, size_t len)")?;
    writeln!(out, "{{")?;
    writeln!(out, "\tconst uint32_t h = phash_raw(key, len, salt);")?;
    writeln!(out, "\tconst uint32_t a = (h >> blog) & (alen - 1U);")?;
    if ph.blen >= USE_SCRAMBLE {
        writeln!(out, "\treturn a ^ scramble[tab[h & (blen - 1U)]];")?;
    } else {
        writeln!(out, "\treturn a ^ tab[h & (blen - 1U)];")?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

fn emit_scramble<W: Write>(ph: &PerfectHash, out: &mut W) -> io::Result<()> {
    let ty = pick_width(&SCRAMBLE_WIDTHS, ph.smax, ph.blen);
    writeln!(out, "/* a permutation of 0..smax-1, indexed by tab[] */")?;
    writeln!(out, "static const {} scramble[] = {{", ty.name())?;
    match ty {
        CInt::U16 => {
            for row in ph.scramble[..0x100].chunks(8) {
                let cells: Vec<String> = row.iter().map(|v| format!("0x{:04x}", v)).collect();
                writeln!(out, "{},", cells.join(", "))?;
            }
        }
        _ => {
            for row in ph.scramble[..0x100].chunks(4) {
                let cells: Vec<String> = row.iter().map(|v| format!("0x{:08x}", v)).collect();
                writeln!(out, "{},", cells.join(", "))?;
            }
        }
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    Ok(())
}

fn emit_tab<W: Write>(ph: &PerfectHash, out: &mut W) -> io::Result<()> {
    let ty = pick_width(&TAB_WIDTHS, ph.smax, ph.blen);
    // below USE_SCRAMBLE the indirection is folded away here
    let folded: Vec<u32> = if ph.blen < USE_SCRAMBLE {
        ph.tab.iter().map(|&t| ph.scramble[t as usize]).collect()
    } else {
        ph.tab.clone()
    };

    writeln!(out, "/* small adjustments to A to make values distinct */")?;
    writeln!(out, "static const {} tab[] = {{", ty.name())?;
    if folded.len() < 16 {
        let cells: Vec<String> = folded.iter().map(|v| format!("{:3}", v)).collect();
        writeln!(out, "{},", cells.join(", "))?;
    } else {
        for row in folded.chunks(8) {
            let (lo, hi) = row.split_at(4);
            let lo: Vec<String> = lo.iter().map(u32::to_string).collect();
            let hi: Vec<String> = hi.iter().map(u32::to_string).collect();
            writeln!(out, "{},  {},", lo.join(", "), hi.join(", "))?;
        }
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    Ok(())
}

// ====================================
// Hash family bodies

fn family_c_body(family: HashFamily) -> &'static str {
    match family {
        HashFamily::Bingo => BINGO_C,
        HashFamily::Murmur => MURMUR_C,
        HashFamily::Oat => OAT_C,
        HashFamily::Jsw => JSW_C,
        HashFamily::Bob => BOB_C,
        HashFamily::Icke2 => ICKE2_C,
    }
}

const BINGO_C: &str = "\
static uint32_t
phash_raw(const void *key, size_t dlen, uint32_t prev)
{
	const unsigned char *data = key;
	uint32_t v = prev;

	for (size_t i = 0U; i < dlen; i++) {
		v *= 33U;
		v ^= data[i];
	}
	return v;
}
";

const MURMUR_C: &str = "\
static uint32_t
phash_raw(const void *key, size_t dlen, uint32_t prev)
{
	const unsigned char *data = key;
	uint32_t v = prev ? prev : 19780211U;

	for (size_t i = 0U; i < dlen; i++) {
		v *= 37U;
		v += data[i];
	}
	return v;
}
";

const OAT_C: &str = "\
static uint32_t
phash_raw(const void *key, size_t dlen, uint32_t prev)
{
	const unsigned char *data = key;
	uint32_t h = prev;

	for (size_t i = 0U; i < dlen; i++) {
		h += data[i];
		h += h << 10U;
		h ^= h >> 6U;
	}
	h += h << 3U;
	h ^= h >> 11U;
	h += h << 15U;
	return h;
}
";

const JSW_C: &str = "\
static uint32_t
phash_raw(const void *key, size_t dlen, uint32_t prev)
{
	const unsigned char *data = key;
	uint32_t v = prev ? prev : 16777551U;

	for (size_t i = 0U; i < dlen; i++) {
		v = (v << 1U | v >> 31U) ^ data[i];
	}
	return v;
}
";

const BOB_C: &str = "\
#define mix(a, b, c)					\\
	do {						\\
		a -= b, a -= c, a ^= (c >> 13U);	\\
		b -= c, b -= a, b ^= (a << 8U);		\\
		c -= a, c -= b, c ^= (b >> 13U);	\\
		a -= b, a -= c, a ^= (c >> 12U);	\\
		b -= c, b -= a, b ^= (a << 16U);	\\
		c -= a, c -= b, c ^= (b >> 5U);		\\
		a -= b, a -= c, a ^= (c >> 3U);		\\
		b -= c, b -= a, b ^= (a << 10U);	\\
		c -= a, c -= b, c ^= (b >> 15U);	\\
	} while (0)

static uint32_t
phash_raw(const void *key, size_t dlen, uint32_t prev)
{
	const unsigned char *data = key;
	uint32_t a = 0x9e3779b9U;
	uint32_t b = 0x9e3779b9U;
	uint32_t c = prev;

	for (; dlen >= 12U; data += 12U, dlen -= 12U) {
		a += data[0U] + ((uint32_t)data[1U] << 8U) +
			((uint32_t)data[2U] << 16U) +
			((uint32_t)data[3U] << 24U);
		b += data[4U] + ((uint32_t)data[5U] << 8U) +
			((uint32_t)data[6U] << 16U) +
			((uint32_t)data[7U] << 24U);
		c += data[8U] + ((uint32_t)data[9U] << 8U) +
			((uint32_t)data[10U] << 16U) +
			((uint32_t)data[11U] << 24U);
		mix(a, b, c);
	}

	c += dlen;
	switch (dlen) {
	case 11U: c += (uint32_t)data[10U] << 24U;
	case 10U: c += (uint32_t)data[9U] << 16U;
	case 9U: c += (uint32_t)data[8U] << 8U;
	case 8U: b += (uint32_t)data[7U] << 24U;
	case 7U: b += (uint32_t)data[6U] << 16U;
	case 6U: b += (uint32_t)data[5U] << 8U;
	case 5U: b += data[4U];
	case 4U: a += (uint32_t)data[3U] << 24U;
	case 3U: a += (uint32_t)data[2U] << 16U;
	case 2U: a += (uint32_t)data[1U] << 8U;
	case 1U: a += data[0U];
	case 0U:
	default:
		break;
	}
	mix(a, b, c);
	return c;
}
";

const ICKE2_C: &str = "\
static uint32_t
phash_raw(const void *key, size_t dlen, uint32_t prev)
{
	const unsigned char *data = key;
	uint32_t l = 0U;
	uint32_t h = 0U;
	size_t i = 0U;

	for (; i + 4U <= dlen; i += 4U) {
		const uint32_t w = data[i] +
			((uint32_t)data[i + 1U] << 8U) +
			((uint32_t)data[i + 2U] << 16U) +
			((uint32_t)data[i + 3U] << 24U);

		l ^= w & 0x07070707U;
		h ^= w & 0xfefefefeU;
		l <<= 1U;
		h >>= 1U;
	}
	for (; i < dlen; i++) {
		l ^= data[i] & 0x07U;
		h ^= data[i] & 0xfeU;
		l <<= 1U;
		h >>= 1U;
	}

	l ^= l >> 6U;
	l ^= l >> 12U;
	l ^= l >> 18U;
	h ^= h >> 3U;
	h ^= h >> 11U;
	h ^= h >> 17U;
	return prev ^ l ^ (h << 8U);
}
";

// ------------------------------------

#[cfg(test)]
mod emit_tests {
    use super::*;
    use crate::scramble::init_scramble;

    fn small_ph() -> PerfectHash {
        PerfectHash {
            family: HashFamily::Bob,
            salt: 44,
            smax: 16,
            alen: 16,
            blen: 1,
            tab: vec![0],
            scramble: init_scramble(16),
        }
    }

    fn render(ph: &PerfectHash) -> String {
        let mut buf = Vec::new();
        emit_c(ph, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn width_rules() {
        assert_eq!(pick_width(&TAB_WIDTHS, 16, 1), CInt::U8);
        assert_eq!(pick_width(&TAB_WIDTHS, 256, 64), CInt::U8);
        assert_eq!(pick_width(&TAB_WIDTHS, 512, 64), CInt::U16);
        assert_eq!(pick_width(&TAB_WIDTHS, 1 << 20, 4096), CInt::U8);
        assert_eq!(pick_width(&SCRAMBLE_WIDTHS, 1 << 16, 2048), CInt::U16);
        assert_eq!(pick_width(&SCRAMBLE_WIDTHS, 1 << 17, 2048), CInt::U32);
    }

    #[test]
    fn small_table_is_folded() {
        let text = render(&small_ph());
        assert!(text.contains("static const uint8_t tab[] = {"));
        assert!(text.contains("static const uint32_t salt = 0x2cU * 0x9e3779b9U;"));
        assert!(text.contains("return a ^ tab[h & (blen - 1U)];"));
        // the indirection is folded, so no scramble array
        assert!(!text.contains("scramble[] ="));
        assert!(text.contains("phash_raw"));
    }

    #[test]
    fn large_table_keeps_scramble() {
        let ph = PerfectHash {
            family: HashFamily::Icke2,
            salt: 7,
            smax: 4096,
            alen: 4096,
            blen: 2048,
            tab: vec![0; 2048],
            scramble: init_scramble(4096),
        };
        let text = render(&ph);
        assert!(text.contains("static const uint16_t scramble[] = {"));
        assert!(text.contains("static const uint16_t tab[] = {"));
        assert!(text.contains("return a ^ scramble[tab[h & (blen - 1U)]];"));
        // 256 halfword entries, eight per row
        assert_eq!(text.lines().filter(|l| l.starts_with("0x")).count(), 32);
    }

    #[test]
    fn empty_set_degenerates() {
        let ph = PerfectHash {
            family: HashFamily::Icke2,
            salt: 0,
            smax: 1,
            alen: 1,
            blen: 0,
            tab: Vec::new(),
            scramble: init_scramble(1),
        };
        let text = render(&ph);
        assert!(text.contains("return 0U;"));
        assert!(!text.contains("tab[] ="));
        assert!(!text.contains("scramble[] ="));
    }

    #[test]
    fn emission_is_idempotent() {
        assert_eq!(render(&small_ph()), render(&small_ph()));
    }
}
