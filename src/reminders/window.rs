//! Occasion look-ahead window.
//!
//! Occasions recur yearly, so matching is on month and day only. The window
//! `[as_of, as_of + window_days]` is inclusive at both ends and may span a
//! year boundary.

use chrono::{Datelike, Duration, NaiveDate};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::customer::Model as CustomerModel;
use crate::models::OccasionType;
use crate::repositories::CustomerRepository;

/// A customer whose occasion falls inside the window, with the concrete date
/// of that occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingOccasion {
    pub customer: CustomerModel,
    pub occasion: OccasionType,
    pub occurs_on: NaiveDate,
}

/// The first day in `[as_of, as_of + window_days]` on which `stored` recurs.
///
/// Feb 29 recurs on Feb 28 in non-leap years.
pub fn next_occurrence_within(
    stored: NaiveDate,
    as_of: NaiveDate,
    window_days: u32,
) -> Option<NaiveDate> {
    (0..=i64::from(window_days))
        .map(|offset| as_of + Duration::days(offset))
        .find(|day| recurs_on(stored, *day))
}

fn recurs_on(stored: NaiveDate, day: NaiveDate) -> bool {
    if stored.month() == day.month() && stored.day() == day.day() {
        return true;
    }
    stored.month() == 2
        && stored.day() == 29
        && day.month() == 2
        && day.day() == 28
        && !day.leap_year()
}

/// Filter customers down to those whose occasion falls in the window,
/// ordered by customer id.
pub fn select_upcoming(
    customers: Vec<CustomerModel>,
    occasion: OccasionType,
    as_of: NaiveDate,
    window_days: u32,
) -> Vec<UpcomingOccasion> {
    let mut upcoming: Vec<UpcomingOccasion> = customers
        .into_iter()
        .filter(|c| c.is_active)
        .filter_map(|customer| {
            let stored = customer.occasion_date(occasion)?;
            let occurs_on = next_occurrence_within(stored, as_of, window_days)?;
            Some(UpcomingOccasion {
                customer,
                occasion,
                occurs_on,
            })
        })
        .collect();

    upcoming.sort_by_key(|u| u.customer.id);
    upcoming
}

/// Finds customers with an upcoming occasion for one tenant.
#[derive(Debug, Clone)]
pub struct OccasionFinder {
    customers: CustomerRepository,
}

impl OccasionFinder {
    pub fn new(customers: CustomerRepository) -> Self {
        Self { customers }
    }

    pub async fn find_upcoming(
        &self,
        tenant_id: Uuid,
        occasion: OccasionType,
        as_of: NaiveDate,
        window_days: u32,
    ) -> Result<Vec<UpcomingOccasion>, RepositoryError> {
        let candidates = self
            .customers
            .list_with_occasion(tenant_id, occasion)
            .await?;
        Ok(select_upcoming(candidates, occasion, as_of, window_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn customer(birthday: Option<NaiveDate>, active: bool) -> CustomerModel {
        let now = Utc::now().into();
        CustomerModel {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            name: "Ana".to_string(),
            phone: "+15551234567".to_string(),
            email: None,
            birthday,
            anniversary: None,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn window_crosses_year_boundary() {
        let as_of = date(2025, 12, 30);

        for day in 1..=6 {
            assert_eq!(
                next_occurrence_within(date(1990, 1, day), as_of, 7),
                Some(date(2026, 1, day))
            );
        }
        assert_eq!(next_occurrence_within(date(1990, 1, 7), as_of, 7), None);
        assert_eq!(next_occurrence_within(date(1990, 12, 29), as_of, 7), None);
        assert_eq!(
            next_occurrence_within(date(1990, 12, 31), as_of, 7),
            Some(date(2025, 12, 31))
        );
    }

    #[test]
    fn both_ends_are_inclusive() {
        let as_of = date(2025, 3, 10);
        assert_eq!(
            next_occurrence_within(date(1980, 3, 10), as_of, 7),
            Some(as_of)
        );
        assert_eq!(
            next_occurrence_within(date(1980, 3, 17), as_of, 7),
            Some(date(2025, 3, 17))
        );
        assert_eq!(next_occurrence_within(date(1980, 3, 18), as_of, 7), None);
    }

    #[test]
    fn zero_day_window_is_today_only() {
        let as_of = date(2025, 6, 1);
        assert_eq!(next_occurrence_within(date(2000, 6, 1), as_of, 0), Some(as_of));
        assert_eq!(next_occurrence_within(date(2000, 6, 2), as_of, 0), None);
    }

    #[test]
    fn leap_day_is_observed_on_feb_28_in_common_years() {
        let leap_day = date(1992, 2, 29);

        assert_eq!(
            next_occurrence_within(leap_day, date(2025, 2, 25), 7),
            Some(date(2025, 2, 28))
        );
        assert_eq!(
            next_occurrence_within(leap_day, date(2028, 2, 25), 7),
            Some(date(2028, 2, 29))
        );
    }

    #[test]
    fn selection_excludes_inactive_and_undated_and_is_sorted() {
        let as_of = date(2025, 5, 1);
        let inside = date(1990, 5, 3);
        let customers = vec![
            customer(Some(inside), true),
            customer(Some(inside), false),
            customer(None, true),
            customer(Some(date(1990, 9, 1)), true),
            customer(Some(inside), true),
        ];

        let upcoming = select_upcoming(customers, OccasionType::Birthday, as_of, 7);

        assert_eq!(upcoming.len(), 2);
        assert!(upcoming[0].customer.id < upcoming[1].customer.id);
        assert!(upcoming.iter().all(|u| u.occurs_on == date(2025, 5, 3)));
    }
}
