use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fixed fare parameters for one cab type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CabRates {
    pub display_name: &'static str,
    pub base_fare: f64,
    pub per_km: f64,
    pub per_min: f64,
    pub capacity: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CabType {
    Mini,
    Sedan,
    Suv,
    Luxury,
}

impl CabType {
    pub const ALL: [CabType; 4] = [CabType::Mini, CabType::Sedan, CabType::Suv, CabType::Luxury];

    pub fn rates(self) -> CabRates {
        match self {
            CabType::Mini => CabRates {
                display_name: "Mini",
                base_fare: 50.0,
                per_km: 12.0,
                per_min: 2.0,
                capacity: 4,
            },
            CabType::Sedan => CabRates {
                display_name: "Sedan",
                base_fare: 80.0,
                per_km: 15.0,
                per_min: 2.5,
                capacity: 4,
            },
            CabType::Suv => CabRates {
                display_name: "SUV",
                base_fare: 120.0,
                per_km: 20.0,
                per_min: 3.0,
                capacity: 6,
            },
            CabType::Luxury => CabRates {
                display_name: "Luxury",
                base_fare: 200.0,
                per_km: 30.0,
                per_min: 5.0,
                capacity: 4,
            },
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            CabType::Mini => "MINI",
            CabType::Sedan => "SEDAN",
            CabType::Suv => "SUV",
            CabType::Luxury => "LUXURY",
        }
    }
}

impl fmt::Display for CabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CabType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CabType::ALL
            .into_iter()
            .find(|cab_type| cab_type.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let valid: Vec<&str> = CabType::ALL.iter().map(|c| c.code()).collect();
                AppError::InvalidInput(format!(
                    "invalid cab type `{wanted}`, must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::CabType;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("sedan".parse::<CabType>().unwrap(), CabType::Sedan);
        assert_eq!(" SUV ".parse::<CabType>().unwrap(), CabType::Suv);
        assert_eq!("Luxury".parse::<CabType>().unwrap(), CabType::Luxury);
    }

    #[test]
    fn unknown_cab_type_lists_valid_names() {
        let err = "rickshaw".parse::<CabType>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("MINI, SEDAN, SUV, LUXURY"));
    }

    #[test]
    fn serializes_upper_case() {
        let json = serde_json::to_string(&CabType::Suv).unwrap();
        assert_eq!(json, "\"SUV\"");
    }
}
