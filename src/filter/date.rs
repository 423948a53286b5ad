// src/filter/date.rs

use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::common::error::AppError;

/// Como um `scheduledTo` só com data (sem hora) é interpretado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateBoundary {
    /// Meia-noite do dia, comparada com `<=` (só entra o que está exatamente à meia-noite).
    #[default]
    StartOfDay,
    /// O dia inteiro: `< meia-noite do dia seguinte`.
    EndOfDay,
}

impl FromStr for DateBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start_of_day" => Ok(DateBoundary::StartOfDay),
            "end_of_day" => Ok(DateBoundary::EndOfDay),
            other => Err(format!("limite de data inválido: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateParam {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

impl DateParam {
    /// Aceita RFC 3339 completo ou só `AAAA-MM-DD`.
    pub fn parse(field: &str, raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Ok(DateParam::Instant(at.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(DateParam::Day)
            .map_err(|_| {
                AppError::invalid_field(field, "Use uma data RFC 3339 ou AAAA-MM-DD.")
            })
    }

    fn midnight(day: NaiveDate) -> DateTime<Utc> {
        day.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Limite inferior (`>=`).
    pub fn lower_bound(&self) -> DateTime<Utc> {
        match *self {
            DateParam::Instant(at) => at,
            DateParam::Day(day) => Self::midnight(day),
        }
    }

    /// Limite superior, conforme a configuração para datas sem hora.
    pub fn upper_bound(&self, boundary: DateBoundary) -> UpperBound {
        match (*self, boundary) {
            (DateParam::Instant(at), _) => UpperBound { at, inclusive: true },
            (DateParam::Day(day), DateBoundary::StartOfDay) => UpperBound {
                at: Self::midnight(day),
                inclusive: true,
            },
            (DateParam::Day(day), DateBoundary::EndOfDay) => {
                let next = day.checked_add_days(Days::new(1)).unwrap_or(day);
                UpperBound { at: Self::midnight(next), inclusive: false }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpperBound {
    pub at: DateTime<Utc>,
    pub inclusive: bool,
}

impl UpperBound {
    pub fn admits(&self, value: DateTime<Utc>) -> bool {
        if self.inclusive { value <= self.at } else { value < self.at }
    }

    pub fn sql_operator(&self) -> &'static str {
        if self.inclusive { " <= " } else { " < " }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_both_formats() {
        let full = DateParam::parse("scheduledFrom", "2024-03-10T14:30:00-03:00").unwrap();
        assert_eq!(
            full.lower_bound(),
            Utc.with_ymd_and_hms(2024, 3, 10, 17, 30, 0).unwrap()
        );

        let day = DateParam::parse("scheduledFrom", "2024-03-10").unwrap();
        assert_eq!(day.lower_bound(), Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn invalid_date_is_a_field_error() {
        let err = DateParam::parse("scheduledTo", "10/03/2024").unwrap_err();
        assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "scheduledTo"));
    }

    #[test]
    fn start_of_day_excludes_later_times() {
        let day = DateParam::parse("scheduledTo", "2024-03-10").unwrap();
        let bound = day.upper_bound(DateBoundary::StartOfDay);

        assert!(bound.admits(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()));
        assert!(!bound.admits(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()));
    }

    #[test]
    fn end_of_day_includes_the_whole_day() {
        let day = DateParam::parse("scheduledTo", "2024-03-10").unwrap();
        let bound = day.upper_bound(DateBoundary::EndOfDay);

        assert!(bound.admits(Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap()));
        assert!(!bound.admits(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()));
        assert_eq!(bound.sql_operator(), " < ");
    }

    #[test]
    fn boundary_from_config() {
        assert_eq!("end_of_day".parse::<DateBoundary>(), Ok(DateBoundary::EndOfDay));
        assert_eq!("START_OF_DAY".parse::<DateBoundary>(), Ok(DateBoundary::StartOfDay));
        assert!("noon".parse::<DateBoundary>().is_err());
    }
}
