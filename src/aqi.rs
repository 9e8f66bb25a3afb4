//! PM2.5 Air Quality Index calculation.
//!
//! Translates a PM2.5 concentration (µg/m³) into an AQI value and category
//! using piecewise-linear interpolation over a fixed breakpoint table, as
//! described in the EPA AQI reporting guidance.

use crate::errors::MeasurementError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Highest index the scale reports. Concentrations above the top breakpoint
/// saturate here.
pub const AQI_MAX: u16 = 500;

/// EPA colour associated with each AQI category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Yellow,
    Orange,
    Red,
    Purple,
    Maroon,
}

impl Color {
    pub fn hex(&self) -> &'static str {
        match self {
            Color::Green => "#00E400",
            Color::Yellow => "#FFFF00",
            Color::Orange => "#FF7E00",
            Color::Red => "#FF0000",
            Color::Purple => "#8F3F97",
            Color::Maroon => "#7E0023",
        }
    }
}

/// Health category of a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            AqiCategory::Good => Color::Green,
            AqiCategory::Moderate => Color::Yellow,
            AqiCategory::UnhealthyForSensitiveGroups => Color::Orange,
            AqiCategory::Unhealthy => Color::Red,
            AqiCategory::VeryUnhealthy => Color::Purple,
            AqiCategory::Hazardous => Color::Maroon,
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AqiCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One row of the breakpoint table: concentrations in
/// `conc_low..=conc_high` map linearly onto `index_low..=index_high`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AqiBand {
    pub conc_low: f64,
    pub conc_high: f64,
    pub index_low: u16,
    pub index_high: u16,
    pub category: AqiCategory,
}

impl AqiBand {
    const fn new(conc_low: f64, conc_high: f64, index_low: u16, index_high: u16, category: AqiCategory) -> Self {
        Self {
            conc_low,
            conc_high,
            index_low,
            index_high,
            category,
        }
    }

    /// Linear interpolation formula from the EPA technical assistance document:
    /// AQI = ((AQIhigh - AQIlow) / (PMhigh - PMlow)) * (PMactual - PMlow) + AQIlow
    fn interpolate(&self, pm25: f64) -> u16 {
        let slope = f64::from(self.index_high - self.index_low) / (self.conc_high - self.conc_low);
        let aqi = (slope * (pm25 - self.conc_low) + f64::from(self.index_low)).round();
        aqi.clamp(f64::from(self.index_low), f64::from(self.index_high)) as u16
    }
}

// PM2.5 breakpoints (µg/m³), one decimal of granularity. Adjacent bands
// differ by exactly 0.1 in concentration and 1 in index; 12.0 opens Moderate.
// https://document.airnow.gov/technical-assistance-document-for-the-reporting-of-daily-air-quailty.pdf
const PM25_BANDS: [AqiBand; 6] = [
    AqiBand::new(0.0, 11.9, 0, 49, AqiCategory::Good),
    AqiBand::new(12.0, 35.4, 50, 100, AqiCategory::Moderate),
    AqiBand::new(35.5, 55.4, 101, 150, AqiCategory::UnhealthyForSensitiveGroups),
    AqiBand::new(55.5, 150.4, 151, 200, AqiCategory::Unhealthy),
    AqiBand::new(150.5, 250.4, 201, 300, AqiCategory::VeryUnhealthy),
    AqiBand::new(250.5, 500.4, 301, 500, AqiCategory::Hazardous),
];

/// The process-wide PM2.5 table. Immutable; built at compile time.
pub static PM25_TABLE: BreakpointTable = BreakpointTable { bands: &PM25_BANDS };

/// Result of a table lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandMatch {
    /// The concentration lies inside (or in the rounding gap just above) this band.
    Within(&'static AqiBand),
    /// The concentration exceeds the top breakpoint; report the top of this band.
    Saturated(&'static AqiBand),
}

impl BandMatch {
    pub fn band(&self) -> &'static AqiBand {
        match self {
            BandMatch::Within(band) | BandMatch::Saturated(band) => band,
        }
    }
}

/// Ordered, contiguous concentration-to-index bands.
#[derive(Debug)]
pub struct BreakpointTable {
    bands: &'static [AqiBand],
}

impl BreakpointTable {
    pub fn bands(&self) -> &'static [AqiBand] {
        self.bands
    }

    /// Finds the band enclosing `pm25`.
    ///
    /// A value that falls in the 0.1 µg/m³ gap between two bands (for example
    /// 11.95) belongs to the lower band. Values above the top band saturate
    /// rather than fail; negative or NaN values are `OutOfDomain`.
    pub fn lookup(&self, pm25: f64) -> Result<BandMatch, MeasurementError> {
        let out_of_domain = MeasurementError::OutOfDomain { field: "pm25", value: pm25 };
        if pm25.is_nan() || pm25 < 0.0 {
            return Err(out_of_domain);
        }

        let top = self.bands.last().ok_or_else(|| out_of_domain.clone())?;
        if pm25 > top.conc_high {
            return Ok(BandMatch::Saturated(top));
        }

        self.bands
            .iter()
            .rev()
            .find(|band| band.conc_low <= pm25)
            .map(BandMatch::Within)
            .ok_or(out_of_domain)
    }

    /// Calculates the AQI for the provided PM2.5 concentration.
    pub fn compute(&self, pm25: f64) -> Result<AqiResult, MeasurementError> {
        let matched = self.lookup(pm25)?;
        let index = match matched {
            BandMatch::Within(band) => band.interpolate(pm25),
            BandMatch::Saturated(band) => band.index_high,
        };
        Ok(AqiResult {
            index,
            category: matched.band().category,
        })
    }
}

/// AQI value with the category of the band it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiResult {
    pub index: u16,
    #[serde(rename = "label")]
    pub category: AqiCategory,
}

impl AqiResult {
    pub fn label(&self) -> &'static str {
        self.category.label()
    }
}

/// Looks up `pm25` in the process-wide PM2.5 table.
pub fn lookup(pm25: f64) -> Result<BandMatch, MeasurementError> {
    PM25_TABLE.lookup(pm25)
}

/// Calculates the AQI for the provided PM2.5 concentration.
///
/// # Examples
///
/// ```
/// use aq_pipeline::aqi::compute;
///
/// let result = compute(41.0).unwrap();
/// assert_eq!(result.index, 115);
/// assert_eq!(result.label(), "Unhealthy for Sensitive Groups");
///
/// assert!(compute(-1.0).is_err());
/// ```
pub fn compute(pm25: f64) -> Result<AqiResult, MeasurementError> {
    PM25_TABLE.compute(pm25)
}
