//! Penalty amount calculation.

use malachite::Natural;
use sentinel_types::Candidate;

/// `floor(stake / rate)`.
///
/// `rate` comes from a validated [`crate::SlashingConfig`] and is never zero.
/// The remainder is not slashed.
pub fn calc_penalty(stake: &Natural, rate: u64) -> Natural {
    stake / &Natural::from(rate)
}

/// Penalty for `candidate` at `rate`, over all four stake components.
pub fn calc_slash_amount(candidate: &Candidate, rate: u64) -> Natural {
    calc_penalty(&candidate.total_stake(), rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::{Address, NodeId};

    #[test]
    fn floor_division() {
        assert_eq!(calc_penalty(&Natural::from(1000u32), 20), Natural::from(50u32));
        assert_eq!(calc_penalty(&Natural::from(999u32), 20), Natural::from(49u32));
        assert_eq!(calc_penalty(&Natural::from(0u32), 10), Natural::from(0u32));
        assert_eq!(calc_penalty(&Natural::from(19u32), 20), Natural::from(0u32));
    }

    #[test]
    fn slash_amount_sums_components_before_dividing() {
        // 3 + 3 + 2 + 2 = 10; dividing each part first would give 0.
        let c = Candidate {
            node_id: NodeId([1; 64]),
            staking_address: Address([1; 20]),
            released: Natural::from(3u32),
            released_hes: Natural::from(3u32),
            restricting_plan: Natural::from(2u32),
            restricting_plan_hes: Natural::from(2u32),
        };
        assert_eq!(calc_slash_amount(&c, 10), Natural::from(1u32));
    }

    #[test]
    fn large_stakes_do_not_overflow() {
        let stake: Natural = "1000000000000000000000000000000".parse().unwrap();
        let expected: Natural = "50000000000000000000000000000".parse().unwrap();
        assert_eq!(calc_penalty(&stake, 20), expected);
    }
}
