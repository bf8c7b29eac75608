//! Algebraic properties of pricing, sessions and bays

use bayline_booking::{
    BayId, BayStatus, CustomerSession, MembershipTier, Money, PricingTier, Quote, SessionStatus,
    TimeSlot,
};
use bayline_core::environment::StdRandom;
use bayline_testing::test_time;
use chrono::TimeDelta;
use proptest::prelude::*;

fn tier() -> impl Strategy<Value = PricingTier> {
    prop::sample::select(PricingTier::ALL.to_vec())
}

fn membership() -> impl Strategy<Value = MembershipTier> {
    prop::sample::select(MembershipTier::ALL.to_vec())
}

/// A session starting `start` minutes from the test time, `length` minutes long
fn session(
    start: i64,
    length: i64,
    tier: PricingTier,
    membership: MembershipTier,
) -> Option<CustomerSession> {
    CustomerSession::scheduled(
        "Prop Player",
        Some(membership),
        BayId::new(1),
        test_time() + TimeDelta::minutes(start),
        test_time() + TimeDelta::minutes(start + length),
        tier,
        test_time(),
    )
    .ok()
}

proptest! {
    #[test]
    fn effective_price_is_base_less_discount(tier in tier(), membership in membership()) {
        let quote = Quote::hourly(tier, membership);
        let expected = tier.base_rate().as_dollars_f64()
            * (1.0 - f64::from(membership.discount_percent()) / 100.0);

        prop_assert!((quote.effective.as_dollars_f64() - expected).abs() < 0.01);
        prop_assert_eq!(quote.discount.checked_add(quote.effective), Some(quote.base));
    }

    #[test]
    fn better_membership_never_costs_more(
        tier in tier(),
        a in membership(),
        b in membership(),
        hours in 1u32..8,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low = Quote::for_hours(tier, low, hours);
        let high = Quote::for_hours(tier, high, hours);

        prop_assert!(high.effective <= low.effective);
        prop_assert!(high.deposit <= low.deposit);
    }

    #[test]
    fn percent_off_never_increases(cents in 0u64..10_000_000, percent in 0u8..=255) {
        let price = Money::from_cents(cents);
        prop_assert!(price.apply_percent_off(percent) <= price);
        prop_assert!(price.percent_of(percent) <= price);
    }

    #[test]
    fn member_priced_slot_reports_member_price(tier in tier(), promotion in 0u8..=100) {
        let slot = TimeSlot::new(test_time(), test_time() + TimeDelta::hours(1), tier);
        prop_assert!(slot.is_ok());
        let slot = slot.map(|s| s.with_member_price(tier.member_rate()).with_promotion(promotion));

        let expected = tier.base_rate().as_dollars_f64() * 0.85;
        let effective = slot.map(|s| s.effective_price().as_dollars_f64()).unwrap_or_default();
        prop_assert!((effective - expected).abs() < 0.01);
    }

    #[test]
    fn planned_end_stays_after_start(
        start in -120i64..600,
        length in 1i64..600,
        extensions in prop::collection::vec(1i64..300, 0..5),
        tier in tier(),
        membership in membership(),
    ) {
        let session = session(start, length, tier, membership);
        prop_assert!(session.is_some());
        let Some(mut session) = session else { return Ok(()) };
        prop_assert!(session.planned_end_time() > session.start_time());

        for minutes in extensions {
            let before = session.planned_end_time();
            prop_assert!(session.extend(TimeDelta::minutes(minutes), test_time()).is_ok());
            prop_assert!(session.planned_end_time() > before);
            prop_assert!(session.planned_end_time() > session.start_time());
        }
    }

    #[test]
    fn extensions_compose(
        length in 1i64..300,
        first in 1i64..300,
        second in 1i64..300,
        tier in tier(),
        membership in membership(),
    ) {
        let Some(base) = session(30, length, tier, membership) else {
            return Err(TestCaseError::fail("valid window"));
        };
        let mut twice = base.clone();
        let mut once = base;

        prop_assert!(twice.extend(TimeDelta::minutes(first), test_time()).is_ok());
        prop_assert!(twice.extend(TimeDelta::minutes(second), test_time()).is_ok());
        prop_assert!(once.extend(TimeDelta::minutes(first + second), test_time()).is_ok());

        prop_assert_eq!(twice, once);
    }

    #[test]
    fn terminal_sessions_ignore_ticks(
        outcome in 0u8..3,
        later in 0i64..10_000,
        tier in tier(),
    ) {
        let Some(mut session) = session(30, 60, tier, MembershipTier::Basic) else {
            return Err(TestCaseError::fail("valid window"));
        };
        let finished = match outcome {
            0 => session.mark_as_cancelled(test_time()),
            1 => session.mark_as_no_show(test_time()),
            _ => session
                .mark_as_started(test_time())
                .and_then(|()| session.mark_as_completed(test_time() + TimeDelta::minutes(5))),
        };
        prop_assert!(finished.is_ok());
        prop_assert!(session.status().is_terminal());

        let snapshot = session.clone();
        prop_assert_eq!(session.tick(test_time() + TimeDelta::minutes(later)), None);
        prop_assert_eq!(&session, &snapshot);
        prop_assert_ne!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn mock_fleets_are_consistent(seed in any::<u64>(), count in 0usize..40, turns in 0usize..30) {
        let rng = StdRandom::seeded(seed);
        let mut bays = BayStatus::mock_fleet(count, &rng, test_time());

        prop_assert_eq!(bays.len(), count);
        prop_assert!(bays.iter().all(BayStatus::is_consistent));

        for _ in 0..turns {
            for bay in &mut bays {
                bay.simulate_status_change(&rng, test_time());
            }
            prop_assert!(bays.iter().all(BayStatus::is_consistent));
        }
    }
}
