//! The immutable, indexed key set a search runs over.
//!
//! Keys are newline-separated byte strings packed into one arena with a
//! NUL after each key, plus an offset vector with a sentinel entry
//! bounding the last key. Everything downstream borrows this; nothing
//! mutates it.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

pub struct KeyVec {
    pool: Vec<u8>,
    // offs[i] is where key i starts; offs[len()] is the sentinel.
    // Each key occupies offs[i] .. offs[i+1]-1, then one NUL.
    offs: Vec<usize>,
}

impl KeyVec {
    /// Read one key per line, stripping the line terminator (`\n` or
    /// `\r\n`). Empty lines become empty keys.
    pub fn from_reader<R: BufRead>(mut rd: R) -> io::Result<KeyVec> {
        let mut pool = Vec::new();
        let mut offs = vec![0usize];
        let mut line = Vec::new();

        loop {
            line.clear();
            if rd.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }
            pool.extend_from_slice(&line);
            pool.push(b'\0');
            offs.push(pool.len());
        }
        Ok(KeyVec { pool, offs })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<KeyVec> {
        KeyVec::from_reader(BufReader::new(File::open(path)?))
    }

    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.offs.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bytes of key `i`, without the terminating NUL.
    #[inline]
    pub fn key(&self, i: usize) -> &[u8] {
        &self.pool[self.offs[i]..self.offs[i + 1] - 1]
    }

    /// Length of key `i` in bytes.
    #[inline]
    pub fn keylen(&self, i: usize) -> usize {
        self.offs[i + 1] - self.offs[i] - 1
    }

    /// Lexicographic byte comparison of keys `i` and `j`.
    #[inline]
    pub fn cmp(&self, i: usize, j: usize) -> Ordering {
        self.key(i).cmp(self.key(j))
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.len()).map(move |i| self.key(i))
    }
}

// ------------------------------------
