//! Split-order key transform.
//!
//! Every node in a [`BucketListMap`](super::BucketListMap) is ordered by a
//! `u64` rank derived from bit reversal:
//!
//! ```text
//! key rank    = reverse_63( hash[0..62] | 1 << 62 )     -> always odd
//! bucket rank = reverse_63( bucket[0..62] )             -> always even
//! ```
//!
//! The "real key" tag is the most significant bit before reversal, so it
//! lands in bit 0 afterwards. For any bucket count `n = 2^k`, every key whose
//! hash satisfies `hash % n == b` sorts after the sentinel of bucket `b` and
//! before the next sentinel in rank order. Doubling the bucket count only
//! inserts new sentinels; no key is ever re-ranked.
//!
//! ```text
//! n = 4:  S0  k(8)       k(4)  S2  k(2)       k(6)  S1  k(1)       k(5)  S3  k(3)
//! n = 8:  S0  k(8)  S4   k(4)  S2  k(2)  S6   k(6)  S1  k(1)  S5   k(5)  S3  k(3)
//! ```
//!
//! `Sb` is the sentinel of bucket `b`, `k(h)` a key with hash `h`.
//!
//! The width and the tagging scheme are part of the contract: any bucket
//! controller layered on top computes sentinel ranks with these functions.

/// Number of bits that participate in the reversal.
pub const WORD_SIZE: u32 = 63;

/// Tag marking a rank as belonging to a real key rather than a bucket sentinel.
const REAL_KEY_BIT: u64 = 1 << (WORD_SIZE - 1);

/// Mask restricting hashes and bucket indices to `WORD_SIZE - 1` bits.
const HASH_MASK: u64 = REAL_KEY_BIT - 1;

/// Largest bucket index that has its own sentinel rank.
pub const MAX_BUCKET: usize = HASH_MASK as usize;

/// Rank of the minimum sentinel (also the rank of bucket 0).
pub const MIN_RANK: u64 = 0;

/// Rank of the maximum sentinel; strictly greater than every key rank.
pub const MAX_RANK: u64 = u64::MAX;

/// Reverse the low `width` bits of `value`. Bits above `width` are ignored.
#[inline]
pub fn reverse_bits(value: u64, width: u32) -> u64 {
    debug_assert!(width > 0 && width <= u64::BITS);

    let masked = if width == u64::BITS {
        value
    } else {
        value & ((1u64 << width) - 1)
    };
    masked.reverse_bits() >> (u64::BITS - width)
}

/// Rank of a regular key with the given raw hash.
#[inline]
pub fn key_rank(hash: u64) -> u64 {
    reverse_bits((hash & HASH_MASK) | REAL_KEY_BIT, WORD_SIZE)
}

/// Rank of the sentinel for `bucket`.
///
/// Callers validate `bucket <= MAX_BUCKET`; higher bits are discarded.
#[inline]
pub fn bucket_rank(bucket: usize) -> u64 {
    reverse_bits(bucket as u64 & HASH_MASK, WORD_SIZE)
}

/// True for ranks produced by [`key_rank`].
#[inline]
pub fn is_key_rank(rank: u64) -> bool {
    rank != MAX_RANK && rank & 1 == 1
}
