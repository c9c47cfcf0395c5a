//! # Geo-category query builder
//!
//! Turns the search parameters of a list request into one structural
//! [`Predicate`] for the storage collaborator:
//!
//! - the facility location lies inside an inclusive bounding box,
//! - the facility type is in a category allowlist (hospital search only),
//! - the subject list mentions a specialty,
//! - the name carries the pediatric marker (`pedonly`),
//! - the day's opening window exists, and optionally contains "now".
//!
//! Building never fails. Parameter parsing ([`BoundingBox::from_params`]) is
//! the only step that rejects input, and it runs before any storage call.

use crate::constants::PEDIATRIC_NAME_MARKER;
use crate::hospital::fields;
use crate::schedule::{end_field, start_field};
use crate::{CoreError, CoreResult};
use moonlight_store::Predicate;
use moonlight_types::{ClockTime, DayKey};
use serde_json::Value;

/// Shape every stored window boundary must have to count as published.
/// ASCII digits only, matching what `ClockTime::parse` accepts.
const CLOCK_PATTERN: &str = r"^[0-9]{4}$";

/// An axis-aligned box given by its south-west and north-east corners.
///
/// Corners are used exactly as given. A box whose corners are swapped matches
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south_west: [f64; 2],
    pub north_east: [f64; 2],
}

impl BoundingBox {
    /// Parses the four `swlng`, `swlat`, `nelng`, `nelat` query values.
    pub fn from_params(
        swlng: Option<&str>,
        swlat: Option<&str>,
        nelng: Option<&str>,
        nelat: Option<&str>,
    ) -> CoreResult<Self> {
        Ok(Self {
            south_west: [coordinate("swlng", swlng)?, coordinate("swlat", swlat)?],
            north_east: [coordinate("nelng", nelng)?, coordinate("nelat", nelat)?],
        })
    }
}

fn coordinate(name: &str, raw: Option<&str>) -> CoreResult<f64> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(CoreError::InvalidInput(format!("missing {name} param")));
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(CoreError::InvalidInput(format!(
            "bad {name} param: {raw:?} is not finite"
        ))),
        Err(e) => Err(CoreError::InvalidInput(format!("bad {name} param: {e}"))),
    }
}

/// Openness filter requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusToken {
    /// Has a well-formed window for today's key.
    OpenToday,
    /// Has a well-formed window for today's key that contains now.
    OpenNow,
    /// Has a well-formed Sunday window, whatever today is.
    OpenSunday,
}

impl StatusToken {
    /// Unknown or empty tokens apply no time filter.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            Some("openToday") => Some(StatusToken::OpenToday),
            Some("openNow") => Some(StatusToken::OpenNow),
            Some("openSunday") => Some(StatusToken::OpenSunday),
            Some("") | None => None,
            Some(other) => {
                tracing::debug!("ignoring unknown status token {other:?}");
                None
            }
        }
    }
}

/// The composed filter of a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFilter {
    pub bbox: BoundingBox,
    pub categories: Vec<String>,
    pub specialty: Option<String>,
    pub pediatric_only: bool,
    pub status: Option<StatusToken>,
    pub day_key: DayKey,
    pub now: ClockTime,
}

/// Composes a [`GeoFilter`]. An empty category list means no restriction.
pub fn build_filter(
    bbox: BoundingBox,
    categories: &[&str],
    specialty: Option<&str>,
    pediatric_only: bool,
    status: Option<StatusToken>,
    day_key: DayKey,
    now: ClockTime,
) -> GeoFilter {
    GeoFilter {
        bbox,
        categories: categories.iter().map(|c| (*c).to_owned()).collect(),
        specialty: specialty
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        pediatric_only,
        status,
        day_key,
        now,
    }
}

impl GeoFilter {
    /// The key whose window a status token inspects.
    pub fn effective_day_key(&self) -> DayKey {
        match self.status {
            Some(StatusToken::OpenSunday) => DayKey::SUNDAY,
            _ => self.day_key,
        }
    }

    pub fn to_predicate(&self) -> Predicate {
        let mut parts = vec![Predicate::within_box(
            fields::LOCATION,
            self.bbox.south_west,
            self.bbox.north_east,
        )];

        if let Some(specialty) = &self.specialty {
            parts.push(Predicate::contains(fields::SUBJECTS, specialty.clone()));
        }
        if !self.categories.is_empty() {
            parts.push(Predicate::is_in(
                fields::CATEGORY_CODE,
                self.categories.iter().cloned(),
            ));
        }
        if self.pediatric_only {
            parts.push(Predicate::contains(fields::NAME, PEDIATRIC_NAME_MARKER));
        }

        if let Some(status) = self.status {
            let key = self.effective_day_key();
            let (start, end) = (start_field(key), end_field(key));
            parts.push(Predicate::matches(start.clone(), CLOCK_PATTERN));
            parts.push(Predicate::matches(end.clone(), CLOCK_PATTERN));
            if status == StatusToken::OpenNow {
                let now = Value::from(self.now.as_str());
                parts.push(Predicate::range(start, None, Some(now.clone())));
                parts.push(Predicate::range(end, Some(now), None));
            }
        }

        Predicate::and(parts)
    }
}
