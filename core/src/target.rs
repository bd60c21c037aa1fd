//! Proof-of-work target & work arithmetic (C3).
//!
//! The teacher crate's `pow.rs` expressed difficulty as a leading-zero-bit
//! count checked directly against a hash. The wire format here instead
//! commits a full 256-bit target per block (see the header layout), so the
//! bit-count check is replaced by big-integer comparison and retargeting
//! using [`primitive_types::U256`].
//!
//! All functions are pure and stateless, same as the teacher's `pow` module,
//! so they can be called from any thread (including a worker pool).

use primitive_types::U256;

use crate::params::ConsensusParameters;
use crate::Hash;

/// Returns `true` if `hash`, read as a big-endian 256-bit integer, is less
/// than or equal to `target`.
pub fn hash_meets_target(hash: &Hash, target: U256) -> bool {
    U256::from_big_endian(hash) <= target
}

/// Work (cumulative difficulty contribution) of a single block with the
/// given `target`: `2^256 / (target + 1)`.
///
/// `U256` cannot represent `2^256` directly (it overflows), so this uses the
/// standard identity `floor(2^256 / (target+1)) == floor((2^256-1-target)/(target+1)) + 1`
/// for `target+1 <= 2^256`, which avoids ever materialising `2^256`.
pub fn block_work(target: U256) -> U256 {
    let max = U256::max_value();
    match target.checked_add(U256::one()) {
        Some(denom) if !denom.is_zero() => (max - target) / denom + U256::one(),
        // target == U256::MAX: denom would be 2^256, so work is exactly 1.
        _ => U256::one(),
    }
}

/// Computes the next block's target from the parent's target and the
/// observed spacing between the parent and grandparent, per §4.2: "a
/// function of the parent's target and the time delta since the
/// grandparent, clamped to a damping window".
///
/// `genesis` (no grandparent) is not retargeted by this function; callers
/// keep the genesis target fixed by convention.
pub fn next_target(
    parent_target: U256,
    parent_timestamp_ms: i64,
    grandparent_timestamp_ms: i64,
    params: &ConsensusParameters,
) -> U256 {
    let target_spacing = params.target_block_time_ms.max(1);
    let actual_spacing = (parent_timestamp_ms - grandparent_timestamp_ms).max(1);

    // Damp the observed spacing before feeding it into the multiply so a
    // single outlier block cannot swing the target by more than 4x.
    let damped_spacing = actual_spacing.clamp(target_spacing / 4, target_spacing * 4);

    let parent = parent_target;
    if damped_spacing == target_spacing {
        // Spacing matched exactly: reproduce the parent's target unchanged
        // rather than round-tripping through a multiply/divide that can
        // lose precision (or saturate) for targets near `U256::MAX`.
        return parent;
    }
    let scaled = parent
        .saturating_mul(U256::from(damped_spacing as u64))
        / U256::from(target_spacing as u64);

    let min_target = parent / U256::from(4u8);
    let max_target = parent.saturating_mul(U256::from(4u8));

    scaled.clamp(min_target, max_target).min(U256::max_value())
}
