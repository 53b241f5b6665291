use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;

use crate::leave::workdays::{calendar_days, working_days, working_days_in_month};
use crate::model::employee::Gender;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{LeaveStatus, LeaveType};

/// Tolerance for fractional working-day comparisons.
const DAY_EPSILON: f64 = 0.1;
const MAX_REQUEST_WORKING_DAYS: f64 = 5.0;
const MONTHLY_ANNUAL_CAP: f64 = 5.0;
const UNPAID_YEARLY_CAP: f64 = 14.0;
const UNPAID_REQUEST_CAP: f64 = 10.0;
const MATERNITY_CALENDAR_DAYS: i64 = 90;
const MENSTRUAL_WINDOW_DAYS: i64 = 2;

/// Sibling leave request of the same employee, already PENDING or APPROVED.
#[derive(Debug, Clone)]
pub struct SiblingLeave {
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Read-only snapshot a proposed request is validated against. Built by the
/// lifecycle from the employee row, the ledger, and the sibling requests.
pub struct RuleContext<'a> {
    pub today: NaiveDate,
    pub gender: Option<Gender>,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: f64,
    pub balance: &'a LeaveBalance,
    pub siblings: &'a [SiblingLeave],
}

type Rule = fn(&RuleContext) -> Option<String>;

/// Rules applied to every leave type.
static COMMON_RULES: &[Rule] = &[
    date_order,
    gender_eligibility,
    not_in_past,
    day_count_matches,
    max_request_length,
    no_overlap,
];

/// Per-type rule table. Composition is explicit so each rule can be tested
/// in isolation.
static TYPE_RULES: Lazy<HashMap<LeaveType, Vec<Rule>>> = Lazy::new(|| {
    HashMap::from([
        (
            LeaveType::Annual,
            vec![monthly_annual_cap as Rule, annual_balance_sufficient as Rule],
        ),
        (
            LeaveType::Unpaid,
            vec![unpaid_yearly_cap as Rule, unpaid_request_cap as Rule],
        ),
        (LeaveType::Maternity, vec![maternity_span as Rule]),
        (
            LeaveType::Menstrual,
            vec![menstrual_window as Rule, menstrual_single_day as Rule],
        ),
    ])
});

/// Evaluates every applicable rule independently and collects all violations.
/// An empty result means the request is valid.
pub fn validate(ctx: &RuleContext) -> Vec<String> {
    let mut violations = Vec::new();
    for rule in COMMON_RULES {
        if let Some(v) = rule(ctx) {
            violations.push(v);
        }
    }
    if let Some(rules) = TYPE_RULES.get(&ctx.leave_type) {
        for rule in rules {
            if let Some(v) = rule(ctx) {
                violations.push(v);
            }
        }
    }
    violations
}

fn date_order(ctx: &RuleContext) -> Option<String> {
    (ctx.start_date > ctx.end_date).then(|| "start_date cannot be after end_date".to_string())
}

fn gender_eligibility(ctx: &RuleContext) -> Option<String> {
    if ctx.gender != Some(Gender::Male) {
        return None;
    }
    match ctx.leave_type {
        LeaveType::Maternity => {
            Some("Maternity leave is only available to female employees".to_string())
        }
        LeaveType::Menstrual => {
            Some("Menstrual leave is only available to female employees".to_string())
        }
        _ => None,
    }
}

// Menstrual leave has its own submission window instead of this check.
fn not_in_past(ctx: &RuleContext) -> Option<String> {
    if ctx.leave_type == LeaveType::Menstrual {
        return None;
    }
    (ctx.start_date < ctx.today).then(|| "Leave cannot start in the past".to_string())
}

fn day_count_matches(ctx: &RuleContext) -> Option<String> {
    if ctx.start_date > ctx.end_date {
        return None;
    }
    let counted = working_days(ctx.start_date, ctx.end_date);
    ((counted - ctx.total_days).abs() > DAY_EPSILON).then(|| {
        format!(
            "total_days ({}) does not match the working-day count ({})",
            ctx.total_days, counted
        )
    })
}

fn max_request_length(ctx: &RuleContext) -> Option<String> {
    if ctx.leave_type == LeaveType::Maternity {
        return None;
    }
    let counted = working_days(ctx.start_date, ctx.end_date);
    (counted > MAX_REQUEST_WORKING_DAYS + DAY_EPSILON)
        .then(|| "Maximum 5 working days per leave request".to_string())
}

fn no_overlap(ctx: &RuleContext) -> Option<String> {
    ctx.siblings
        .iter()
        .filter(|s| matches!(s.status, LeaveStatus::Pending | LeaveStatus::Approved))
        .find(|s| s.start_date <= ctx.end_date && s.end_date >= ctx.start_date)
        .map(|s| {
            format!(
                "Overlaps an existing {} leave request ({} to {})",
                s.leave_type, s.start_date, s.end_date
            )
        })
}

/// Annual leave taken inside the request's start month, across this request
/// and every sibling ANNUAL request clipped to that month, may not exceed
/// the monthly cap.
fn monthly_annual_cap(ctx: &RuleContext) -> Option<String> {
    let (year, month) = (ctx.start_date.year(), ctx.start_date.month());
    let own = working_days_in_month(ctx.start_date, ctx.end_date, year, month);
    let siblings: f64 = ctx
        .siblings
        .iter()
        .filter(|s| s.leave_type == LeaveType::Annual)
        .filter(|s| matches!(s.status, LeaveStatus::Pending | LeaveStatus::Approved))
        .map(|s| working_days_in_month(s.start_date, s.end_date, year, month))
        .sum();
    (own + siblings > MONTHLY_ANNUAL_CAP + DAY_EPSILON)
        .then(|| "Annual leave is capped at 5 working days per calendar month".to_string())
}

fn annual_balance_sufficient(ctx: &RuleContext) -> Option<String> {
    (ctx.total_days > ctx.balance.annual_remaining + DAY_EPSILON).then(|| {
        format!(
            "Insufficient annual leave balance (remaining: {})",
            ctx.balance.annual_remaining
        )
    })
}

fn unpaid_yearly_cap(ctx: &RuleContext) -> Option<String> {
    (ctx.balance.unpaid_used + ctx.total_days > UNPAID_YEARLY_CAP + DAY_EPSILON)
        .then(|| "Unpaid leave is capped at 14 days per year".to_string())
}

fn unpaid_request_cap(ctx: &RuleContext) -> Option<String> {
    let counted = working_days(ctx.start_date, ctx.end_date);
    (counted > UNPAID_REQUEST_CAP + DAY_EPSILON)
        .then(|| "Unpaid leave requests may not exceed 10 consecutive working days".to_string())
}

fn maternity_span(ctx: &RuleContext) -> Option<String> {
    (calendar_days(ctx.start_date, ctx.end_date) != MATERNITY_CALENDAR_DAYS)
        .then(|| "Maternity leave must span exactly 90 calendar days".to_string())
}

fn menstrual_window(ctx: &RuleContext) -> Option<String> {
    let latest = ctx.today + Duration::days(MENSTRUAL_WINDOW_DAYS);
    (ctx.start_date < ctx.today || ctx.start_date > latest)
        .then(|| "Menstrual leave must start between today and 2 days from now".to_string())
}

fn menstrual_single_day(ctx: &RuleContext) -> Option<String> {
    ((working_days(ctx.start_date, ctx.end_date) - 1.0).abs() > DAY_EPSILON)
        .then(|| "Menstrual leave is limited to exactly 1 working day".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn balance(remaining: f64, unpaid_used: f64) -> LeaveBalance {
        LeaveBalance {
            id: 1,
            employee_id: 1000,
            year: 2026,
            annual_quota: 14.0,
            annual_used: 14.0 - remaining,
            annual_remaining: remaining,
            sick_used: 0.0,
            menstrual_used: 0.0,
            unpaid_used,
            toil_balance: 0.0,
            toil_used: 0.0,
            toil_expired: 0.0,
        }
    }

    struct Setup {
        balance: LeaveBalance,
        siblings: Vec<SiblingLeave>,
    }

    impl Setup {
        fn new() -> Self {
            Self {
                balance: balance(10.0, 0.0),
                siblings: Vec::new(),
            }
        }

        fn ctx(
            &self,
            gender: Gender,
            leave_type: LeaveType,
            start: NaiveDate,
            end: NaiveDate,
            total_days: f64,
        ) -> RuleContext<'_> {
            RuleContext {
                // Monday
                today: date(2026, 1, 5),
                gender: Some(gender),
                leave_type,
                start_date: start,
                end_date: end,
                total_days,
                balance: &self.balance,
                siblings: &self.siblings,
            }
        }
    }

    #[test]
    fn valid_annual_request_has_no_violations() {
        let s = Setup::new();
        // Tue..Thu, 3 working days
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 6),
            date(2026, 1, 8),
            3.0,
        );
        assert!(validate(&ctx).is_empty());
    }

    #[test]
    fn male_menstrual_request_is_rejected() {
        let s = Setup::new();
        let ctx = s.ctx(
            Gender::Male,
            LeaveType::Menstrual,
            date(2026, 1, 6),
            date(2026, 1, 6),
            1.0,
        );
        let violations = validate(&ctx);
        assert!(
            violations
                .iter()
                .any(|v| v.contains("only available to female"))
        );
    }

    #[test]
    fn six_working_days_exceed_the_request_cap() {
        let s = Setup::new();
        // Tue 2026-01-06 .. Tue 2026-01-13 = 6 working days
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 6),
            date(2026, 1, 13),
            6.0,
        );
        let violations = validate(&ctx);
        assert!(
            violations
                .iter()
                .any(|v| v == "Maximum 5 working days per leave request")
        );
    }

    #[test]
    fn inverted_dates_are_a_violation() {
        let s = Setup::new();
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Sick,
            date(2026, 1, 8),
            date(2026, 1, 6),
            2.0,
        );
        assert!(
            validate(&ctx)
                .iter()
                .any(|v| v.contains("cannot be after"))
        );
    }

    #[test]
    fn past_start_date_rejected_except_menstrual() {
        let s = Setup::new();
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Sick,
            date(2026, 1, 2),
            date(2026, 1, 2),
            1.0,
        );
        assert!(validate(&ctx).iter().any(|v| v.contains("in the past")));
    }

    #[test]
    fn menstrual_window_is_today_plus_two() {
        let s = Setup::new();
        // today (Mon 5th) .. +2 allowed
        let ok = s.ctx(
            Gender::Female,
            LeaveType::Menstrual,
            date(2026, 1, 7),
            date(2026, 1, 7),
            1.0,
        );
        assert!(validate(&ok).is_empty());

        let late = s.ctx(
            Gender::Female,
            LeaveType::Menstrual,
            date(2026, 1, 8),
            date(2026, 1, 8),
            1.0,
        );
        assert!(
            validate(&late)
                .iter()
                .any(|v| v.contains("between today and 2 days"))
        );
    }

    #[test]
    fn menstrual_must_be_one_working_day() {
        let s = Setup::new();
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Menstrual,
            date(2026, 1, 6),
            date(2026, 1, 7),
            2.0,
        );
        assert!(
            validate(&ctx)
                .iter()
                .any(|v| v.contains("exactly 1 working day"))
        );
    }

    #[test]
    fn day_count_mismatch_is_flagged() {
        let s = Setup::new();
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 6),
            date(2026, 1, 8),
            2.0,
        );
        assert!(
            validate(&ctx)
                .iter()
                .any(|v| v.contains("does not match the working-day count"))
        );
    }

    #[test]
    fn overlap_with_pending_sibling_is_flagged() {
        let mut s = Setup::new();
        s.siblings.push(SiblingLeave {
            leave_type: LeaveType::Sick,
            status: LeaveStatus::Pending,
            start_date: date(2026, 1, 7),
            end_date: date(2026, 1, 9),
        });
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 8),
            date(2026, 1, 9),
            2.0,
        );
        assert!(validate(&ctx).iter().any(|v| v.contains("Overlaps")));
    }

    #[test]
    fn rejected_siblings_do_not_block() {
        let mut s = Setup::new();
        s.siblings.push(SiblingLeave {
            leave_type: LeaveType::Sick,
            status: LeaveStatus::Rejected,
            start_date: date(2026, 1, 7),
            end_date: date(2026, 1, 9),
        });
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 8),
            date(2026, 1, 9),
            2.0,
        );
        assert!(validate(&ctx).is_empty());
    }

    #[test]
    fn monthly_cap_counts_sibling_annual_days_in_month() {
        let mut s = Setup::new();
        // 3 approved annual working days already in January
        s.siblings.push(SiblingLeave {
            leave_type: LeaveType::Annual,
            status: LeaveStatus::Approved,
            start_date: date(2026, 1, 19),
            end_date: date(2026, 1, 21),
        });
        // 3 more in the same month exceeds 5
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 26),
            date(2026, 1, 28),
            3.0,
        );
        assert!(
            validate(&ctx)
                .iter()
                .any(|v| v.contains("capped at 5 working days per calendar month"))
        );
    }

    #[test]
    fn monthly_cap_ignores_sibling_days_in_other_months() {
        let mut s = Setup::new();
        s.siblings.push(SiblingLeave {
            leave_type: LeaveType::Annual,
            status: LeaveStatus::Approved,
            start_date: date(2026, 2, 16),
            end_date: date(2026, 2, 18),
        });
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 26),
            date(2026, 1, 28),
            3.0,
        );
        assert!(validate(&ctx).is_empty());
    }

    #[test]
    fn annual_request_beyond_remaining_balance() {
        let mut s = Setup::new();
        s.balance = balance(2.0, 0.0);
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Annual,
            date(2026, 1, 6),
            date(2026, 1, 8),
            3.0,
        );
        assert!(
            validate(&ctx)
                .iter()
                .any(|v| v.contains("Insufficient annual leave balance"))
        );
    }

    #[test]
    fn unpaid_caps_cumulative_and_per_request() {
        let mut s = Setup::new();
        s.balance = balance(10.0, 12.0);
        let ctx = s.ctx(
            Gender::Female,
            LeaveType::Unpaid,
            date(2026, 1, 6),
            date(2026, 1, 8),
            3.0,
        );
        assert!(
            validate(&ctx)
                .iter()
                .any(|v| v.contains("capped at 14 days per year"))
        );

        // 12 working days in one request (Mon 5th .. Tue 20th)
        let s2 = Setup::new();
        let long = s2.ctx(
            Gender::Female,
            LeaveType::Unpaid,
            date(2026, 1, 5),
            date(2026, 1, 20),
            12.0,
        );
        assert!(
            validate(&long)
                .iter()
                .any(|v| v.contains("10 consecutive working days"))
        );
    }

    #[test]
    fn maternity_span_must_be_ninety_calendar_days() {
        let s = Setup::new();
        let exact = s.ctx(
            Gender::Female,
            LeaveType::Maternity,
            date(2026, 1, 5),
            date(2026, 4, 4),
            65.0,
        );
        assert!(
            !validate(&exact)
                .iter()
                .any(|v| v.contains("90 calendar days"))
        );

        let short = s.ctx(
            Gender::Female,
            LeaveType::Maternity,
            date(2026, 1, 5),
            date(2026, 2, 5),
            24.0,
        );
        assert!(
            validate(&short)
                .iter()
                .any(|v| v.contains("90 calendar days"))
        );
    }
}
