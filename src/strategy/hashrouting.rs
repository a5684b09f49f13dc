//! Hashrouting: a deterministic hash maps every content id onto one
//! "authoritative" cache node; sub-variants differ only in how the request
//! and the return trip are routed around that authoritative node (spec
//! §4.4 "Hashrouting details").

use crate::ids::ContentId;

/// The five hashrouting sub-variants named in spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashroutingVariant {
    /// Request and return both go via the authoritative cache.
    Symmetric,
    /// Request goes via the authoritative cache; return takes the shortest
    /// path to the receiver, caching at the authoritative node only if it
    /// happens to lie on that path.
    Asymmetric,
    /// The return forks at the node where the source-to-cache and
    /// source-to-receiver paths diverge.
    Multicast,
    /// Multicast, but only when the extra stretch stays within
    /// `max_stretch * diameter`; symmetric otherwise.
    HybridAm {
        /// Stretch budget as a fraction of the topology diameter.
        max_stretch: f64,
    },
    /// Whichever of symmetric/multicast has fewer total hops.
    HybridSm,
}

/// The "zig-zag" mapping from a content id onto one of `n` cache slots
/// (spec §4.4): `h = cid mod n; if floor(cid / n) is odd, n - h - 1, else h`.
/// This folds the hash back and forth across the slot range instead of
/// wrapping, spreading load more evenly than a plain modulo when `cid` is
/// drawn from a Zipf distribution correlated with small values.
pub fn zigzag_hash(cid: ContentId, n: usize) -> usize {
    assert!(n > 0, "zigzag_hash requires at least one cache node");
    let n64 = n as u64;
    let h = (cid.0 % n64) as usize;
    let fold = (cid.0 / n64) % 2 == 1;
    if fold {
        n - h - 1
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_is_within_bounds() {
        for cid in 0..50u64 {
            let h = zigzag_hash(ContentId(cid), 7);
            assert!(h < 7);
        }
    }

    #[test]
    fn zigzag_folds_on_odd_quotient() {
        // n = 5, cid = 7 -> h = 2, floor(7/5) = 1 (odd) -> 5 - 2 - 1 = 2
        assert_eq!(zigzag_hash(ContentId(7), 5), 2);
        // cid = 2 -> h = 2, floor(2/5) = 0 (even) -> 2
        assert_eq!(zigzag_hash(ContentId(2), 5), 2);
        // cid = 12 -> h = 2, floor(12/5) = 2 (even) -> 2
        assert_eq!(zigzag_hash(ContentId(12), 5), 2);
        // cid = 3 -> h=3, floor(3/5)=0 -> 3; cid = 8 -> h=3, floor=1(odd) -> 5-3-1=1
        assert_eq!(zigzag_hash(ContentId(3), 5), 3);
        assert_eq!(zigzag_hash(ContentId(8), 5), 1);
    }
}
