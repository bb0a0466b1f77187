/// Lox string objects with a precomputed hash.
///
/// Strings are immutable once created. The heap interns them, so two
/// strings with equal contents always share one handle and can be compared
/// by identity.
use std::fmt;

/// FNV-1a offset basis (32-bit).
const FNV_OFFSET: u32 = 2_166_136_261;
/// FNV-1a prime (32-bit).
const FNV_PRIME: u32 = 16_777_619;

/// An immutable heap string.
#[derive(Clone, PartialEq, Eq)]
pub struct LoxString {
    chars: Box<str>,
    hash: u32,
}

impl LoxString {
    /// Create a new string, computing its hash.
    pub fn new(chars: &str) -> Self {
        LoxString {
            hash: hash_str(chars),
            chars: chars.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The precomputed hash.
    pub fn hash(&self) -> u32 {
        self.hash
    }
}

impl fmt::Debug for LoxString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.chars)
    }
}

impl fmt::Display for LoxString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chars)
    }
}

/// 32-bit FNV-1a over the UTF-8 bytes of `s`.
pub fn hash_str(s: &str) -> u32 {
    let mut hash = FNV_OFFSET;
    for &byte in s.as_bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
