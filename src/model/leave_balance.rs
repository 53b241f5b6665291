use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveType;

/// Full annual entitlement for an employee with a whole year of tenure.
pub const FULL_ANNUAL_QUOTA: f64 = 14.0;

/// One row per (employee, year). Mutated only through the ledger; the
/// `annual_remaining == annual_quota - annual_used` invariant is maintained
/// by `apply`/`reverse` below and re-checked in tests.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 14.0)]
    pub annual_quota: f64,
    #[schema(example = 3.0)]
    pub annual_used: f64,
    #[schema(example = 11.0)]
    pub annual_remaining: f64,
    #[schema(example = 1.0)]
    pub sick_used: f64,
    #[schema(example = 0.0)]
    pub menstrual_used: f64,
    #[schema(example = 0.0)]
    pub unpaid_used: f64,
    #[schema(example = 0.0)]
    pub toil_balance: f64,
    #[schema(example = 0.0)]
    pub toil_used: f64,
    #[schema(example = 0.0)]
    pub toil_expired: f64,
}

/// Annual quota prorated by tenure: employees who joined this calendar year
/// get the months remaining in the year (join month included), everyone else
/// gets the full quota.
pub fn prorated_annual_quota(join_date: NaiveDate, today: NaiveDate) -> f64 {
    if join_date.year() == today.year() {
        let months_remaining = 12 - join_date.month0() as i64;
        (months_remaining as f64 / 12.0 * FULL_ANNUAL_QUOTA).round()
    } else {
        FULL_ANNUAL_QUOTA
    }
}

impl LeaveBalance {
    /// Consumes `days` from the counter owned by `leave_type`. Only annual
    /// leave touches the remaining-days counter; caps were already enforced
    /// by the validator before the terminal transition.
    pub fn apply(&mut self, leave_type: LeaveType, days: f64) {
        match leave_type {
            LeaveType::Annual => {
                self.annual_used += days;
                self.annual_remaining = self.annual_quota - self.annual_used;
            }
            LeaveType::Sick => self.sick_used += days,
            LeaveType::Menstrual => self.menstrual_used += days,
            LeaveType::Unpaid => self.unpaid_used += days,
            // No per-year counter for these
            LeaveType::Maternity | LeaveType::Marriage => {}
        }
    }

    /// Inverse of `apply`, invoked when an approved leave is cancelled before
    /// it starts. Every tracked counter is restored, not only annual leave.
    pub fn reverse(&mut self, leave_type: LeaveType, days: f64) {
        match leave_type {
            LeaveType::Annual => {
                self.annual_used = (self.annual_used - days).max(0.0);
                self.annual_remaining = self.annual_quota - self.annual_used;
            }
            LeaveType::Sick => self.sick_used = (self.sick_used - days).max(0.0),
            LeaveType::Menstrual => self.menstrual_used = (self.menstrual_used - days).max(0.0),
            LeaveType::Unpaid => self.unpaid_used = (self.unpaid_used - days).max(0.0),
            LeaveType::Maternity | LeaveType::Marriage => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn balance() -> LeaveBalance {
        LeaveBalance {
            id: 1,
            employee_id: 1000,
            year: 2026,
            annual_quota: 14.0,
            annual_used: 0.0,
            annual_remaining: 14.0,
            sick_used: 0.0,
            menstrual_used: 0.0,
            unpaid_used: 0.0,
            toil_balance: 0.0,
            toil_used: 0.0,
            toil_expired: 0.0,
        }
    }

    #[test]
    fn full_quota_for_prior_year_joiners() {
        assert_eq!(
            prorated_annual_quota(date(2023, 9, 15), date(2026, 3, 1)),
            14.0
        );
    }

    #[test]
    fn same_year_joiners_get_months_remaining() {
        // January joiner keeps the full quota
        assert_eq!(
            prorated_annual_quota(date(2026, 1, 10), date(2026, 6, 1)),
            14.0
        );
        // July joiner: 6 of 12 months left
        assert_eq!(
            prorated_annual_quota(date(2026, 7, 3), date(2026, 8, 1)),
            7.0
        );
        // December joiner: 1 month left, rounds to 1
        assert_eq!(
            prorated_annual_quota(date(2026, 12, 1), date(2026, 12, 15)),
            1.0
        );
    }

    #[test]
    fn annual_apply_then_reverse_preserves_invariant() {
        let mut b = balance();
        b.apply(LeaveType::Annual, 3.0);
        assert_eq!(b.annual_used, 3.0);
        assert_eq!(b.annual_remaining, 11.0);
        assert_eq!(b.annual_remaining, b.annual_quota - b.annual_used);

        b.apply(LeaveType::Annual, 1.5);
        b.reverse(LeaveType::Annual, 3.0);
        assert_eq!(b.annual_used, 1.5);
        assert_eq!(b.annual_remaining, b.annual_quota - b.annual_used);
    }

    #[test]
    fn sick_leave_never_touches_annual_remaining() {
        let mut b = balance();
        b.apply(LeaveType::Sick, 1.0);
        assert_eq!(b.sick_used, 1.0);
        assert_eq!(b.annual_remaining, 14.0);
    }

    #[test]
    fn non_annual_counters_are_reversed_too() {
        let mut b = balance();
        b.apply(LeaveType::Unpaid, 4.0);
        b.reverse(LeaveType::Unpaid, 4.0);
        assert_eq!(b.unpaid_used, 0.0);
    }

    #[test]
    fn reverse_clamps_at_zero() {
        let mut b = balance();
        b.reverse(LeaveType::Sick, 2.0);
        assert_eq!(b.sick_used, 0.0);
    }
}
