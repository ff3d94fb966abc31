// ── Wall clock ──
//
// Net2 stores timestamps as local wall-clock time without an offset, so
// activity windows and expiry dates are computed on `NaiveDateTime`.

use std::fmt::Debug;

use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Source of the current local time.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Start of the day containing `now`.
pub fn midnight(now: NaiveDateTime) -> NaiveDateTime {
    now.date().and_time(NaiveTime::MIN)
}

/// 23:59:59 on `date`.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

/// End of the day after `now`.
pub fn tomorrow_end_of_day(now: NaiveDateTime) -> NaiveDateTime {
    let date = now.date();
    end_of_day(date.checked_add_days(Days::new(1)).unwrap_or(date))
}

/// End of the day before `now`.
pub fn yesterday_end_of_day(now: NaiveDateTime) -> NaiveDateTime {
    let date = now.date();
    end_of_day(date.checked_sub_days(Days::new(1)).unwrap_or(date))
}
