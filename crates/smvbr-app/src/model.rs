// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Serialize, Serializer};
use std::fmt;

use crate::ids::VehicleId;

pub const NOT_APPLICABLE: &str = "N/A";

/// A canonical field value: either resolved or explicitly not applicable.
/// Renders as `N/A` when absent so raw sentinels never reach a screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Value(T),
    NotApplicable,
}

impl<T> Field<T> {
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::NotApplicable => None,
        }
    }

    pub const fn is_applicable(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotApplicable, Self::Value)
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => value.fmt(f),
            Self::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringKind {
    Hydraulic,
    Electric,
    ElectroHydraulic,
    Mechanical,
}

impl SteeringKind {
    pub const ALL: [Self; 4] = [
        Self::Hydraulic,
        Self::Electric,
        Self::ElectroHydraulic,
        Self::Mechanical,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Hydraulic => "H",
            Self::Electric => "E",
            Self::ElectroHydraulic => "H-E",
            Self::Mechanical => "M",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Hydraulic => "Hydraulic",
            Self::Electric => "Electric",
            Self::ElectroHydraulic => "Electro-hydraulic",
            Self::Mechanical => "Mechanical",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "H" => Some(Self::Hydraulic),
            "E" => Some(Self::Electric),
            "H-E" => Some(Self::ElectroHydraulic),
            "M" => Some(Self::Mechanical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelKind {
    Gasoline,
    Ethanol,
    Diesel,
    Flex,
}

impl FuelKind {
    pub const ALL: [Self; 4] = [Self::Gasoline, Self::Ethanol, Self::Diesel, Self::Flex];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Gasoline => "G",
            Self::Ethanol => "E",
            Self::Diesel => "D",
            Self::Flex => "F",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Gasoline => "Gasoline",
            Self::Ethanol => "Ethanol",
            Self::Diesel => "Diesel",
            Self::Flex => "Flex",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "G" => Some(Self::Gasoline),
            "E" => Some(Self::Ethanol),
            "D" => Some(Self::Diesel),
            "F" => Some(Self::Flex),
            _ => None,
        }
    }
}

/// A categorical code as sent by the API plus its display label.
/// Unknown codes keep the raw code as their label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coded {
    pub code: String,
    pub label: String,
}

impl Coded {
    pub fn steering(raw: &str) -> Self {
        let code = raw.trim().to_owned();
        let label = SteeringKind::parse(&code)
            .map_or_else(|| code.clone(), |kind| kind.label().to_owned());
        Self { code, label }
    }

    pub fn fuel(raw: &str) -> Self {
        let code = raw.trim().to_owned();
        let label = FuelKind::parse(&code)
            .map_or_else(|| code.clone(), |kind| kind.label().to_owned());
        Self { code, label }
    }

    /// Matches either the raw code or the translated label.
    pub fn matches(&self, wanted: &str) -> bool {
        let wanted = wanted.trim();
        self.code.eq_ignore_ascii_case(wanted) || self.label.to_lowercase() == wanted.to_lowercase()
    }
}

impl fmt::Display for Coded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emissions {
    pub nmhc: Field<f64>,
    pub co: Field<f64>,
    pub nox: Field<f64>,
    pub co2: Field<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelYields {
    pub ethanol_city: Field<f64>,
    pub ethanol_highway: Field<f64>,
    pub gasoline_city: Field<f64>,
    pub gasoline_highway: Field<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Key used by the favorite toggle endpoint.
    pub code: String,
    pub display_name: Field<String>,
    pub brand: Field<String>,
    pub model: Field<String>,
    pub version: Field<String>,
    pub year: Field<String>,
    pub category: Field<String>,
    pub engine: Field<String>,
    pub transmission: Field<String>,
    pub air_conditioning: Field<bool>,
    pub power_steering: Field<Coded>,
    pub fuel_type: Field<Coded>,
    pub emissions: Emissions,
    pub yields: FuelYields,
    pub energy_consumption: Field<f64>,
    pub image_url: String,
    pub score: Field<f64>,
}

impl Vehicle {
    pub fn title(&self) -> String {
        match &self.display_name {
            Field::Value(name) => name.clone(),
            Field::NotApplicable => format!("vehicle #{}", self.id),
        }
    }

    pub fn air_conditioning_label(&self) -> &'static str {
        match self.air_conditioning {
            Field::Value(true) => "Yes",
            Field::Value(false) => "No",
            Field::NotApplicable => NOT_APPLICABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Coded, Field, FuelKind, SteeringKind};

    #[test]
    fn steering_codes_translate_to_labels() {
        assert_eq!(Coded::steering("H").label, "Hydraulic");
        assert_eq!(Coded::steering("E").label, "Electric");
        assert_eq!(Coded::steering("H-E").label, "Electro-hydraulic");
        assert_eq!(Coded::steering("m").label, "Mechanical");
    }

    #[test]
    fn unknown_codes_pass_through() {
        let steering = Coded::steering("X");
        assert_eq!(steering.code, "X");
        assert_eq!(steering.label, "X");

        let fuel = Coded::fuel("Hybrid");
        assert_eq!(fuel.label, "Hybrid");
    }

    #[test]
    fn fuel_codes_round_trip_through_parse() {
        for kind in FuelKind::ALL {
            assert_eq!(FuelKind::parse(kind.code()), Some(kind));
        }
        for kind in SteeringKind::ALL {
            assert_eq!(SteeringKind::parse(kind.code()), Some(kind));
        }
    }

    #[test]
    fn coded_matches_code_or_label() {
        let fuel = Coded::fuel("F");
        assert!(fuel.matches("f"));
        assert!(fuel.matches("flex"));
        assert!(!fuel.matches("Diesel"));
    }

    #[test]
    fn not_applicable_renders_marker() {
        let missing: Field<f64> = Field::NotApplicable;
        assert_eq!(missing.to_string(), "N/A");
        assert_eq!(Field::Value(0.5).to_string(), "0.5");
    }

    #[test]
    fn not_applicable_serializes_as_marker() -> anyhow::Result<()> {
        let encoded = serde_json::to_string(&vec![Field::Value(1.5), Field::NotApplicable])?;
        assert_eq!(encoded, r#"[1.5,"N/A"]"#);
        Ok(())
    }
}
