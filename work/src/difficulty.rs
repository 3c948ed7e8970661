//! Difficulty retargeting at period boundaries.
//!
//! The "gap" `MAX - difficulty` is proportional to the chance that a random
//! hash meets the difficulty. Scaling the gap by `elapsed / target` makes
//! blocks that arrived too fast harder to produce and slow ones easier.

use merit_types::Difficulty;
use primitive_types::U256;

/// Largest factor by which one retarget may ease or tighten the gap.
pub const MAX_ADJUSTMENT: u64 = 4;

fn to_u256(difficulty: Difficulty) -> U256 {
    U256::from_big_endian(&difficulty.to_be_bytes())
}

fn from_u256(value: U256) -> Difficulty {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    Difficulty::from_be_bytes(bytes)
}

/// Compute the difficulty for the next period.
///
/// `elapsed_secs` is the time the finished period actually took and
/// `target_secs` the time it should have taken. The ratio is clamped to
/// `[1/MAX_ADJUSTMENT, MAX_ADJUSTMENT]`. A zero target leaves the difficulty
/// unchanged.
pub fn retarget(current: Difficulty, elapsed_secs: u64, target_secs: u64) -> Difficulty {
    if target_secs == 0 {
        return current;
    }

    let min_elapsed = (target_secs / MAX_ADJUSTMENT).max(1);
    let max_elapsed = target_secs.saturating_mul(MAX_ADJUSTMENT);
    let elapsed = elapsed_secs.clamp(min_elapsed, max_elapsed);

    let gap = U256::MAX - to_u256(current);
    let target = U256::from(target_secs);
    let elapsed = U256::from(elapsed);

    // gap * elapsed / target, split so the product cannot overflow the low part.
    let quotient = gap / target;
    let remainder = gap % target;
    let scaled = quotient
        .checked_mul(elapsed)
        .and_then(|high| high.checked_add(remainder * elapsed / target))
        .unwrap_or(U256::MAX);

    let new_gap = scaled.max(U256::one());
    from_u256(U256::MAX - new_gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn difficulty(top: u8) -> Difficulty {
        let mut bytes = [0u8; 32];
        bytes[0] = top;
        Difficulty::from_be_bytes(bytes)
    }

    #[test]
    fn on_target_is_stable() {
        let d = difficulty(0x80);
        let next = retarget(d, 6000, 6000);
        // Rounding may shave at most one unit off the gap.
        let diff = to_u256(next) - to_u256(d);
        assert!(diff <= U256::one());
    }

    #[test]
    fn fast_blocks_raise_difficulty() {
        let d = difficulty(0x80);
        let next = retarget(d, 3000, 6000);
        assert!(next > d);
    }

    #[test]
    fn slow_blocks_lower_difficulty() {
        let d = difficulty(0xC0);
        let next = retarget(d, 12000, 6000);
        assert!(next < d);
    }

    #[test]
    fn adjustment_is_clamped() {
        let d = difficulty(0x80);
        assert_eq!(retarget(d, 1, 6000), retarget(d, 1500, 6000));
        assert_eq!(retarget(d, 1_000_000, 6000), retarget(d, 24000, 6000));
    }

    #[test]
    fn easing_saturates_at_zero() {
        let next = retarget(Difficulty::ZERO, 24000, 6000);
        assert_eq!(next, Difficulty::ZERO);
    }

    #[test]
    fn tightening_never_reaches_max() {
        let almost = from_u256(U256::MAX - U256::from(2u64));
        let next = retarget(almost, 1, 6000);
        assert_eq!(next, from_u256(U256::MAX - U256::one()));
    }

    #[test]
    fn zero_target_is_noop() {
        let d = difficulty(0x42);
        assert_eq!(retarget(d, 100, 0), d);
    }
}
