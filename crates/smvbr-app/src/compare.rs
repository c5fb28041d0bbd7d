// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use thiserror::Error;

use crate::model::{Field, Vehicle};
use crate::normalize::{Normalizer, RecordError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    #[error("comparison payload has no {0} -- the server response is incomplete")]
    MissingSide(&'static str),
    #[error("comparison {side} is unusable: {source}")]
    Record {
        side: &'static str,
        #[source]
        source: RecordError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Co,
    Co2,
    Nox,
    Nmhc,
    CityYield,
    HighwayYield,
    EthanolCityYield,
    EthanolHighwayYield,
    EnergyConsumption,
    Score,
}

impl Metric {
    pub const ALL: [Self; 10] = [
        Self::Co,
        Self::Co2,
        Self::Nox,
        Self::Nmhc,
        Self::CityYield,
        Self::HighwayYield,
        Self::EthanolCityYield,
        Self::EthanolHighwayYield,
        Self::EnergyConsumption,
        Self::Score,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Co => "CO (g/km)",
            Self::Co2 => "CO2 (g/km)",
            Self::Nox => "NOx (g/km)",
            Self::Nmhc => "NMHC (g/km)",
            Self::CityYield => "City yield (km/l)",
            Self::HighwayYield => "Highway yield (km/l)",
            Self::EthanolCityYield => "Ethanol city yield (km/l)",
            Self::EthanolHighwayYield => "Ethanol highway yield (km/l)",
            Self::EnergyConsumption => "Energy consumption (MJ/km)",
            Self::Score => "Final score",
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::CityYield
            | Self::HighwayYield
            | Self::EthanolCityYield
            | Self::EthanolHighwayYield => Direction::HigherIsBetter,
            Self::Co
            | Self::Co2
            | Self::Nox
            | Self::Nmhc
            | Self::EnergyConsumption
            | Self::Score => Direction::LowerIsBetter,
        }
    }

    pub fn value(self, vehicle: &Vehicle) -> Field<f64> {
        match self {
            Self::Co => vehicle.emissions.co.clone(),
            Self::Co2 => vehicle.emissions.co2.clone(),
            Self::Nox => vehicle.emissions.nox.clone(),
            Self::Nmhc => vehicle.emissions.nmhc.clone(),
            Self::CityYield => vehicle.yields.gasoline_city.clone(),
            Self::HighwayYield => vehicle.yields.gasoline_highway.clone(),
            Self::EthanolCityYield => vehicle.yields.ethanol_city.clone(),
            Self::EthanolHighwayYield => vehicle.yields.ethanol_highway.clone(),
            Self::EnergyConsumption => vehicle.energy_consumption.clone(),
            Self::Score => vehicle.score.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Better,
    Worse,
    Tie,
    Unavailable,
}

impl Verdict {
    pub const fn color(self) -> Option<&'static str> {
        match self {
            Self::Better => Some("#4CAF50"),
            Self::Worse => Some("#F44336"),
            Self::Tie => Some("#FFC107"),
            Self::Unavailable => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Better => "better",
            Self::Worse => "worse",
            Self::Tie => "tie",
            Self::Unavailable => "n/a",
        }
    }
}

/// Verdicts for (left, right).
pub fn judge(left: &Field<f64>, right: &Field<f64>, direction: Direction) -> (Verdict, Verdict) {
    let (Some(left), Some(right)) = (left.value(), right.value()) else {
        return (Verdict::Unavailable, Verdict::Unavailable);
    };
    if left == right {
        return (Verdict::Tie, Verdict::Tie);
    }
    let left_wins = match direction {
        Direction::LowerIsBetter => left < right,
        Direction::HigherIsBetter => left > right,
    };
    if left_wins {
        (Verdict::Better, Verdict::Worse)
    } else {
        (Verdict::Worse, Verdict::Better)
    }
}

/// Bar width for `value` relative to the larger of the pair, in percent.
pub fn bar_percentage(value: &Field<f64>, other: &Field<f64>) -> f64 {
    let Some(value) = value.value().copied() else {
        return 0.0;
    };
    let max = other.value().copied().map_or(value, |other| value.max(other));
    if max <= 0.0 {
        return 0.0;
    }
    value / max * 100.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub metric: Metric,
    pub left: Field<f64>,
    pub right: Field<f64>,
    pub left_verdict: Verdict,
    pub right_verdict: Verdict,
    pub left_bar: f64,
    pub right_bar: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub left: Vehicle,
    pub right: Vehicle,
    pub rows: Vec<MetricRow>,
}

impl ComparisonReport {
    pub fn build(left: Vehicle, right: Vehicle) -> Self {
        let rows = Metric::ALL
            .into_iter()
            .map(|metric| {
                let left_value = metric.value(&left);
                let right_value = metric.value(&right);
                let (left_verdict, right_verdict) =
                    judge(&left_value, &right_value, metric.direction());
                MetricRow {
                    metric,
                    left_bar: bar_percentage(&left_value, &right_value),
                    right_bar: bar_percentage(&right_value, &left_value),
                    left: left_value,
                    right: right_value,
                    left_verdict,
                    right_verdict,
                }
            })
            .collect();
        Self { left, right, rows }
    }

    /// Builds a report from the `{carro1, carro2}` comparison payload.
    pub fn from_payload(normalizer: &Normalizer, payload: &Value) -> Result<Self, CompareError> {
        let side = |key: &'static str| -> Result<Vehicle, CompareError> {
            let raw = payload
                .get(key)
                .filter(|value| !value.is_null())
                .ok_or(CompareError::MissingSide(key))?;
            normalizer
                .normalize(raw)
                .map_err(|source| CompareError::Record { side: key, source })
        };
        Ok(Self::build(side("carro1")?, side("carro2")?))
    }

    pub fn row(&self, metric: Metric) -> Option<&MetricRow> {
        self.rows.iter().find(|row| row.metric == metric)
    }

    /// Count of metrics each side wins.
    pub fn tally(&self) -> (usize, usize) {
        self.rows.iter().fold((0, 0), |(left, right), row| {
            (
                left + usize::from(row.left_verdict == Verdict::Better),
                right + usize::from(row.right_verdict == Verdict::Better),
            )
        })
    }
}
