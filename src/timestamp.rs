//! Timestamp reconciliation for AIS fixes.
//!
//! Position reports carry only the second within the UTC minute when the fix
//! was taken. The full timestamp is rebuilt from the local clock at arrival.

use chrono::{DateTime, Duration, Timelike, Utc};

/// How far a reconstructed timestamp may lie ahead of the local clock.
pub const MAX_AHEAD: Duration = Duration::seconds(3);

/// Rebuild the timestamp of a fix from the arrival time and the reported
/// second of the minute.
///
/// Returns `now` unchanged when the second is missing or outside 0-59 (AIS
/// uses 60-63 for "not available" and positioning-system states). Otherwise
/// `now`'s seconds are replaced by `reported_second`, stepping back one
/// minute at a time while the result is more than [`MAX_AHEAD`] in the future.
pub fn reconcile(now: DateTime<Utc>, reported_second: Option<u8>) -> DateTime<Utc> {
    let Some(second) = reported_second.filter(|s| *s < 60) else {
        return now;
    };

    let Some(mut candidate) = now
        .with_nanosecond(0)
        .and_then(|t| t.with_second(u32::from(second)))
    else {
        return now;
    };

    while candidate - now > MAX_AHEAD {
        candidate -= Duration::minutes(1);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_unavailable_second() {
        let now = at(12, 0, 17) + Duration::milliseconds(250);
        assert_eq!(reconcile(now, None), now);
        assert_eq!(reconcile(now, Some(60)), now);
        assert_eq!(reconcile(now, Some(63)), now);
    }

    #[test]
    fn test_same_minute() {
        let now = at(12, 10, 40);
        assert_eq!(reconcile(now, Some(30)), at(12, 10, 30));
        assert_eq!(reconcile(now, Some(40)), at(12, 10, 40));
    }

    #[test]
    fn test_small_lead_is_tolerated() {
        let now = at(12, 10, 40);
        assert_eq!(reconcile(now, Some(43)), at(12, 10, 43));
    }

    #[test]
    fn test_rolls_back_to_previous_minute() {
        let now = at(12, 10, 2);
        assert_eq!(reconcile(now, Some(58)), at(12, 9, 58));
    }

    #[test]
    fn test_rollback_is_one_minute_before_substitution() {
        let now = at(12, 11, 2);
        let naive = now.with_second(58).unwrap();
        assert_eq!(reconcile(now, Some(58)), naive - Duration::minutes(1));
    }

    #[test]
    fn test_earlier_second_stays_in_minute() {
        // 12:10:02 is already in the past, nothing to roll back
        let now = at(12, 10, 58);
        assert_eq!(reconcile(now, Some(2)), at(12, 10, 2));
    }

    #[test]
    fn test_lead_just_over_tolerance() {
        let now = at(12, 10, 40);
        assert_eq!(reconcile(now, Some(44)), at(12, 9, 44));
    }

    #[test]
    fn test_rolls_back_across_hour() {
        let now = at(13, 0, 1);
        assert_eq!(reconcile(now, Some(59)), at(12, 59, 59));
    }

    #[test]
    fn test_subsecond_dropped() {
        let now = at(12, 10, 40) + Duration::milliseconds(900);
        assert_eq!(reconcile(now, Some(39)), at(12, 10, 39));
    }

    proptest! {
        #[test]
        fn reconciled_stays_near_now(
            offset in 0i64..86_400_000,
            second in 0u8..60,
        ) {
            let now = at(0, 0, 0) + Duration::milliseconds(offset);
            let ts = reconcile(now, Some(second));

            prop_assert_eq!(ts.second(), u32::from(second));
            prop_assert!(ts - now <= MAX_AHEAD);
            prop_assert!(now - ts < Duration::minutes(1));
        }
    }
}
