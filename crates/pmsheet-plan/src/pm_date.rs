//! PM due-date rules
//!
//! The schedule date of a device plus a keyword-dependent number of months
//! gives the next PM due date. Both dates are written as `Mon-YYYY`.

use chrono::{Days, Months, NaiveDate, NaiveDateTime};
use pmsheet_core::{CellValue, PmRule};
use thiserror::Error;

/// Display format of both PM dates
pub const MONTH_YEAR: &str = "%b-%Y";

/// Day 0 of the 1900 date system (serial 1 is 1900-01-01, past the leap-year bug)
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial Excel accepts (9999-12-31)
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    // Month-first wins; day-first only when the month would be invalid
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PmDateError {
    #[error("schedule date is empty")]
    Missing,

    #[error("schedule date {0:?} is not a recognised date")]
    Unparsable(String),

    #[error("PM due date out of range for schedule date {0}")]
    OutOfRange(NaiveDate),
}

/// Formatted PM dates of one device row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PmDates {
    pub schedule: String,
    pub due: String,
    pub offset_months: u32,
}

/// Parse a schedule-date cell
pub fn parse_schedule_date(value: &CellValue) -> Result<NaiveDate, PmDateError> {
    match value {
        CellValue::DateTime(dt) => Ok(dt.date()),
        CellValue::Int(n) => from_excel_serial(*n as f64)
            .ok_or_else(|| PmDateError::Unparsable(value.to_string())),
        CellValue::Float(f) if !f.is_nan() => {
            from_excel_serial(*f).ok_or_else(|| PmDateError::Unparsable(value.to_string()))
        }
        CellValue::Text(s) if !s.trim().is_empty() => {
            parse_date_text(s.trim()).ok_or_else(|| PmDateError::Unparsable(s.clone()))
        }
        CellValue::Bool(_) => Err(PmDateError::Unparsable(value.to_string())),
        _ => Err(PmDateError::Missing),
    }
}

fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Keyword rules plus a default interval
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PmDateEngine {
    rules: Vec<PmRule>,
    default_offset: u32,
}

impl PmDateEngine {
    pub fn new(rules: Vec<PmRule>, default_offset: u32) -> Self {
        Self {
            rules,
            default_offset,
        }
    }

    /// Months to add; first rule whose keyword occurs in the description
    /// (case-sensitive) wins
    pub fn offset_for(&self, description: &CellValue) -> u32 {
        let text = description.to_string();
        self.rules
            .iter()
            .find(|rule| !rule.keyword.is_empty() && text.contains(rule.keyword.as_str()))
            .map(|rule| rule.months)
            .unwrap_or(self.default_offset)
    }

    pub fn compute(
        &self,
        schedule: &CellValue,
        description: &CellValue,
    ) -> Result<PmDates, PmDateError> {
        let date = parse_schedule_date(schedule)?;
        let offset_months = self.offset_for(description);
        let due = date
            .checked_add_months(Months::new(offset_months))
            .ok_or(PmDateError::OutOfRange(date))?;
        Ok(PmDates {
            schedule: date.format(MONTH_YEAR).to_string(),
            due: due.format(MONTH_YEAR).to_string(),
            offset_months,
        })
    }
}

impl Default for PmDateEngine {
    fn default() -> Self {
        Self::new(PmRule::default_rules(), pmsheet_core::config::DEFAULT_PM_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defibrillator_is_six_months() {
        let engine = PmDateEngine::default();
        let schedule = CellValue::DateTime(date(2025, 1, 15).and_hms_opt(0, 0, 0).unwrap());
        let dates = engine
            .compute(&schedule, &CellValue::from("AED DEFIBRILLATOR"))
            .unwrap();
        assert_eq!(dates.schedule, "Jan-2025");
        assert_eq!(dates.due, "Jul-2025");
        assert_eq!(dates.offset_months, 6);
    }

    #[test]
    fn default_offset_is_twelve_months() {
        let engine = PmDateEngine::default();
        let dates = engine
            .compute(&CellValue::from("2025-01-15"), &CellValue::from("INFUSION PUMP"))
            .unwrap();
        assert_eq!(dates.due, "Jan-2026");
    }

    #[test]
    fn keyword_match_is_case_sensitive() {
        let engine = PmDateEngine::default();
        assert_eq!(engine.offset_for(&CellValue::from("defibrillator")), 12);
        assert_eq!(engine.offset_for(&CellValue::Empty), 12);
    }

    #[test]
    fn first_rule_wins() {
        let engine = PmDateEngine::new(
            vec![PmRule::new("MONITOR", 3), PmRule::new("PATIENT", 9)],
            12,
        );
        assert_eq!(engine.offset_for(&CellValue::from("PATIENT MONITOR")), 3);
    }

    #[test]
    fn month_end_is_clamped() {
        let engine = PmDateEngine::new(vec![], 1);
        let dates = engine
            .compute(&CellValue::from("2025-01-31"), &CellValue::Empty)
            .unwrap();
        assert_eq!(dates.due, "Feb-2025");
    }

    #[test]
    fn parses_supported_inputs() {
        let expected = date(2025, 1, 15);
        for text in [
            "2025-01-15",
            "2025-01-15 10:30:00",
            "2025-01-15T10:30:00",
            "2025/01/15",
            "15/01/2025",
            "15-Jan-2025",
            "Jan 15, 2025",
        ] {
            assert_eq!(
                parse_schedule_date(&CellValue::from(text)),
                Ok(expected),
                "{text}"
            );
        }
        // Excel serial for 2025-01-15
        assert_eq!(parse_schedule_date(&CellValue::Float(45672.0)), Ok(expected));
        assert_eq!(parse_schedule_date(&CellValue::Int(45672)), Ok(expected));
    }

    #[test]
    fn slash_dates_read_month_first() {
        let parse = |text: &str| parse_schedule_date(&CellValue::from(text));
        assert_eq!(parse("12/31/2025"), Ok(date(2025, 12, 31)));
        assert_eq!(parse("01/02/2025"), Ok(date(2025, 1, 2)));
        assert_eq!(parse("01/02/2025 08:00:00"), Ok(date(2025, 1, 2)));
        // Day-first only when month-first is impossible
        assert_eq!(parse("15/01/2025"), Ok(date(2025, 1, 15)));
        assert_eq!(parse("31/12/2025 08:00:00"), Ok(date(2025, 12, 31)));

        let engine = PmDateEngine::default();
        let dates = engine
            .compute(&CellValue::from("01/02/2025"), &CellValue::from("DEFIBRILLATOR"))
            .unwrap();
        assert_eq!(dates.schedule, "Jan-2025");
        assert_eq!(dates.due, "Jul-2025");
    }

    #[test]
    fn empty_and_garbage_are_errors() {
        assert_eq!(parse_schedule_date(&CellValue::Empty), Err(PmDateError::Missing));
        assert_eq!(parse_schedule_date(&CellValue::from("  ")), Err(PmDateError::Missing));
        assert!(matches!(
            parse_schedule_date(&CellValue::from("next week")),
            Err(PmDateError::Unparsable(_))
        ));
        assert!(matches!(
            parse_schedule_date(&CellValue::Int(-3)),
            Err(PmDateError::Unparsable(_))
        ));
    }
}
