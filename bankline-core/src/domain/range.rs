//! Date window for transaction queries

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Inclusive booking-date window. A missing bound is open on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateRange {
    /// `[from, to]`, rejected when `from > to`
    pub fn bounded(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        Self::new(Some(from), Some(to))
    }

    /// The engine's full retrievable history
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(Error::InvalidRange { from, to });
            }
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn to(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
