//! The four measured facilities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four occupancy series reported by the facility API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    /// Sports pool ("sportowa").
    Sport,
    /// Family pool ("rodzinna").
    Family,
    /// Small pool ("kameralna").
    Small,
    /// Ice rink ("lodowisko").
    Ice,
}

impl Series {
    /// All series in storage order.
    pub const ALL: [Series; 4] = [Series::Sport, Series::Family, Series::Small, Series::Ice];

    /// Column / config name of the series.
    pub fn as_str(&self) -> &'static str {
        match self {
            Series::Sport => "sport",
            Series::Family => "family",
            Series::Small => "small",
            Series::Ice => "ice",
        }
    }

    /// Human readable facility name used by the chart layer.
    pub fn display_name(&self) -> &'static str {
        match self {
            Series::Sport => "Sportowa",
            Series::Family => "Rodzinna",
            Series::Small => "Kameralna",
            Series::Ice => "Lodowisko",
        }
    }

    /// Nominal capacity in people, used only for percentage display.
    pub fn capacity(&self) -> u32 {
        match self {
            Series::Sport => 105,
            Series::Family => 150,
            Series::Small => 30,
            Series::Ice => 300,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Series::Sport => 0,
            Series::Family => 1,
            Series::Small => 2,
            Series::Ice => 3,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Series {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sport" => Ok(Series::Sport),
            "family" => Ok(Series::Family),
            "small" => Ok(Series::Small),
            "ice" => Ok(Series::Ice),
            _ => Err(format!("Unknown series: {}", s)),
        }
    }
}

/// A value for each of the four series, indexable by [`Series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeriesValues<T> {
    pub sport: T,
    pub family: T,
    pub small: T,
    pub ice: T,
}

impl<T: Copy> SeriesValues<T> {
    pub fn new(sport: T, family: T, small: T, ice: T) -> Self {
        Self {
            sport,
            family,
            small,
            ice,
        }
    }

    pub fn get(&self, series: Series) -> T {
        self.to_array()[series.index()]
    }

    pub fn to_array(&self) -> [T; 4] {
        [self.sport, self.family, self.small, self.ice]
    }

    pub fn from_array(values: [T; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }
}

impl SeriesValues<i32> {
    /// First series (in storage order) holding a negative value.
    pub fn first_negative(&self) -> Option<Series> {
        Series::ALL.into_iter().find(|s| self.get(*s) < 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_from_str() {
        assert_eq!("family".parse::<Series>().unwrap(), Series::Family);
        assert_eq!(" ICE ".parse::<Series>().unwrap(), Series::Ice);
        assert!("pool".parse::<Series>().is_err());
    }

    #[test]
    fn test_get_reads_named_field() {
        let values = SeriesValues::new(1, 2, 3, 4);
        assert_eq!(values.get(Series::Sport), 1);
        assert_eq!(values.get(Series::Family), 2);
        assert_eq!(values.get(Series::Small), 3);
        assert_eq!(values.get(Series::Ice), 4);
    }

    #[test]
    fn test_first_negative() {
        assert_eq!(SeriesValues::new(1, 0, 2, 3).first_negative(), None);
        assert_eq!(
            SeriesValues::new(1, -1, 2, -3).first_negative(),
            Some(Series::Family)
        );
    }
}
