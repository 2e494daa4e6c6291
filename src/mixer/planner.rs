// Distribution planner - decides how one payout round is split across a
// user's return addresses.
//
// Every destination but the last takes a random fraction in [0, 0.9) of
// whatever is still unassigned; the last one takes the remainder. Once the
// remainder drops below epsilon it is handed to the current destination and
// the random draws stop, so destinations between that one and the last get
// nothing this round.

use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Upper bound (exclusive) of the random fraction drawn per destination
pub const MAX_SHARE_FRACTION: f64 = 0.9;

/// Random shares are rounded to this many decimal places
const SHARE_SCALE: u32 = 6;

/// The last destination's amount is always sent with this many decimals
const FINAL_SHARE_PRECISION: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionConfig {
    /// Most that is paid out to one user in a single round
    pub increment: Decimal,
    pub epsilon: Decimal,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            increment: Decimal::new(50, 1),
            epsilon: Decimal::new(1, 4),
        }
    }
}

/// One transfer of a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub address: String,
    pub amount: Decimal,
    /// Amount exactly as it is sent to the ledger
    pub wire_amount: String,
}

impl Payout {
    fn variable(address: &str, amount: Decimal) -> Self {
        Self {
            address: address.to_string(),
            amount,
            wire_amount: amount.normalize().to_string(),
        }
    }

    /// Rounded first, so `amount` is exactly what goes on the wire
    fn fixed(address: &str, amount: Decimal) -> Self {
        let amount = amount.round_dp(FINAL_SHARE_PRECISION);
        Self {
            address: address.to_string(),
            amount,
            wire_amount: format!("{:.*}", FINAL_SHARE_PRECISION as usize, amount),
        }
    }

    /// False for a share that rounds to nothing on the wire
    pub fn is_sendable(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    /// `min(amount, increment)`
    pub round_amount: Decimal,
    /// True when this round leaves part of the entitlement for later rounds
    pub partial: bool,
    /// In destination order
    pub payouts: Vec<Payout>,
}

impl DistributionPlan {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.payouts.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, address: &str) -> Option<&Payout> {
        self.payouts.iter().find(|p| p.address == address)
    }

    #[cfg(test)]
    pub fn total(&self) -> Decimal {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

pub struct DistributionPlanner {
    config: DistributionConfig,
}

impl DistributionPlanner {
    pub fn new(config: DistributionConfig) -> Self {
        Self { config }
    }

    /// Split this round's amount across `destinations` using the thread RNG
    pub fn plan(&self, destinations: &[String], amount: Decimal) -> DistributionPlan {
        let mut rng = rand::rng();
        self.plan_with_rng(&mut rng, destinations, amount)
    }

    pub fn plan_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        destinations: &[String],
        amount: Decimal,
    ) -> DistributionPlan {
        let round_amount = amount.min(self.config.increment);
        let mut plan = DistributionPlan {
            round_amount,
            partial: amount > self.config.increment,
            payouts: Vec::with_capacity(destinations.len()),
        };

        let Some((last, rest)) = destinations.split_last() else {
            return plan;
        };

        let mut remaining = round_amount;
        for address in rest {
            if remaining < self.config.epsilon {
                // Not subtracted: the last destination below still gets it too.
                plan.payouts.push(Payout::variable(address, remaining));
                break;
            }

            let fraction = rng.random::<f64>() * MAX_SHARE_FRACTION;
            let share = (Decimal::from_f64(fraction).unwrap_or(Decimal::ZERO) * remaining)
                .round_dp(SHARE_SCALE);
            if share > Decimal::ZERO {
                plan.payouts.push(Payout::variable(address, share));
            }
            remaining -= share;
        }

        plan.payouts.push(Payout::fixed(last, remaining));
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn addresses(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("return-{}", i)).collect()
    }

    fn planner() -> DistributionPlanner {
        DistributionPlanner::new(DistributionConfig::default())
    }

    #[test]
    fn test_no_destinations_is_empty_plan() {
        let plan = planner().plan(&[], dec!(42));

        assert!(plan.is_empty());
        assert_eq!(plan.total(), Decimal::ZERO);
    }

    #[test]
    fn test_single_destination_gets_capped_amount() {
        let destinations = addresses(1);

        let plan = planner().plan(&destinations, dec!(1000.045));
        assert_eq!(plan.payouts.len(), 1);
        assert_eq!(plan.payouts[0].amount, dec!(5.0));
        assert_eq!(plan.payouts[0].wire_amount, "5.000000");
        assert!(plan.partial);

        let plan = planner().plan(&destinations, dec!(3.2));
        assert_eq!(plan.payouts[0].amount, dec!(3.2));
        assert_eq!(plan.payouts[0].wire_amount, "3.200000");
        assert!(!plan.partial);
    }

    #[test]
    fn test_split_sums_to_round_amount() {
        let destinations = addresses(3);

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = planner().plan_with_rng(&mut rng, &destinations, dec!(1000.045));

            assert_eq!(plan.round_amount, dec!(5.0));
            assert!((plan.total() - dec!(5.0)).abs() <= dec!(0.0000005));

            let wire_total: Decimal = plan
                .payouts
                .iter()
                .map(|p| p.wire_amount.parse::<Decimal>().unwrap())
                .sum();
            assert!((wire_total - dec!(5.0)).abs() <= dec!(0.000001));

            for payout in &plan.payouts {
                assert!(payout.amount >= Decimal::ZERO);
                assert!(payout.amount <= dec!(5.0));
            }
        }
    }

    #[test]
    fn test_small_amount_is_paid_in_full() {
        let destinations = addresses(4);
        let mut rng = StdRng::seed_from_u64(7);

        let plan = planner().plan_with_rng(&mut rng, &destinations, dec!(4.369));

        assert!(!plan.partial);
        assert!((plan.total() - dec!(4.369)).abs() <= dec!(0.0000005));
    }

    #[test]
    fn test_last_share_is_rounded_not_truncated() {
        let plan = planner().plan(&addresses(1), dec!(1.23456789));

        assert_eq!(plan.payouts[0].wire_amount, "1.234568");
        assert_eq!(plan.payouts[0].amount, dec!(1.234568));
    }

    #[test]
    fn test_last_share_below_wire_precision_is_not_sendable() {
        let plan = planner().plan(&addresses(1), dec!(0.0000003));

        assert_eq!(plan.payouts[0].wire_amount, "0.000000");
        assert!(!plan.payouts[0].is_sendable());
    }

    #[test]
    fn test_last_destination_uses_fixed_precision() {
        let destinations = addresses(3);
        let mut rng = StdRng::seed_from_u64(11);

        let plan = planner().plan_with_rng(&mut rng, &destinations, dec!(5));

        let last = plan.payouts.last().unwrap();
        assert_eq!(last.address, "return-3");
        let decimals = last.wire_amount.split('.').nth(1).unwrap();
        assert_eq!(decimals.len(), 6);
        for earlier in &plan.payouts[..plan.payouts.len() - 1] {
            assert_eq!(earlier.wire_amount, earlier.amount.normalize().to_string());
        }
    }

    #[test]
    fn test_remainder_below_epsilon_stops_random_split() {
        let destinations = addresses(3);
        let mut rng = StdRng::seed_from_u64(3);

        let plan = planner().plan_with_rng(&mut rng, &destinations, dec!(0.00005));

        assert_eq!(plan.payouts.len(), 2);
        assert_eq!(plan.get("return-1").unwrap().wire_amount, "0.00005");
        assert!(plan.get("return-2").is_none());
        assert_eq!(plan.get("return-3").unwrap().wire_amount, "0.000050");
    }

    #[test]
    fn test_same_seed_same_plan() {
        let destinations = addresses(5);

        let a = planner().plan_with_rng(&mut StdRng::seed_from_u64(99), &destinations, dec!(20));
        let b = planner().plan_with_rng(&mut StdRng::seed_from_u64(99), &destinations, dec!(20));

        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_increment() {
        let planner = DistributionPlanner::new(DistributionConfig {
            increment: dec!(0.5),
            epsilon: dec!(0.0001),
        });

        let plan = planner.plan(&addresses(2), dec!(3));

        assert_eq!(plan.round_amount, dec!(0.5));
        assert_eq!(plan.total(), dec!(0.5));
        assert!(plan.partial);
    }
}
