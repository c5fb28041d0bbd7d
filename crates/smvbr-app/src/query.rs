// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::VehicleId;
use crate::model::{Coded, Field, Vehicle};

/// Structured filter criteria. `None` imposes no constraint; a set
/// criterion never matches a vehicle whose field is `N/A`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    pub year: Option<String>,
    pub group: Option<String>,
    pub brand: Option<String>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub air_conditioning: Option<bool>,
    pub power_steering: Option<String>,
    pub fuel_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEdit {
    Year(Option<String>),
    Group(Option<String>),
    Brand(Option<String>),
    Engine(Option<String>),
    Transmission(Option<String>),
    AirConditioning(Option<bool>),
    PowerSteering(Option<String>),
    FuelType(Option<String>),
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn active_count(&self) -> usize {
        [
            &self.year,
            &self.group,
            &self.brand,
            &self.engine,
            &self.transmission,
            &self.power_steering,
            &self.fuel_type,
        ]
        .into_iter()
        .filter(|value| value.is_some())
        .count()
            + usize::from(self.air_conditioning.is_some())
    }

    pub fn apply(&mut self, edit: FilterEdit) {
        match edit {
            FilterEdit::Year(value) => self.year = value,
            FilterEdit::Group(value) => self.group = value,
            FilterEdit::Brand(value) => self.brand = value,
            FilterEdit::Engine(value) => self.engine = value,
            FilterEdit::Transmission(value) => self.transmission = value,
            FilterEdit::AirConditioning(value) => self.air_conditioning = value,
            FilterEdit::PowerSteering(value) => self.power_steering = value,
            FilterEdit::FuelType(value) => self.fuel_type = value,
        }
    }

    /// Trims every text criterion and unsets the blank ones.
    pub fn normalized(&self) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_owned)
        };
        Self {
            year: clean(&self.year),
            group: clean(&self.group),
            brand: clean(&self.brand),
            engine: clean(&self.engine),
            transmission: clean(&self.transmission),
            air_conditioning: self.air_conditioning,
            power_steering: clean(&self.power_steering),
            fuel_type: clean(&self.fuel_type),
        }
    }

    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        equals(self.year.as_deref(), &vehicle.year)
            && equals(self.group.as_deref(), &vehicle.category)
            && contains(self.brand.as_deref(), &vehicle.brand)
            && contains(self.engine.as_deref(), &vehicle.engine)
            && contains(self.transmission.as_deref(), &vehicle.transmission)
            && flag(self.air_conditioning, &vehicle.air_conditioning)
            && coded(self.power_steering.as_deref(), &vehicle.power_steering)
            && coded(self.fuel_type.as_deref(), &vehicle.fuel_type)
    }

    /// Set criteria as query parameters for the server-side filter endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let normalized = self.normalized();
        let mut pairs = Vec::new();
        let texts = [
            ("year", normalized.year),
            ("group", normalized.group),
            ("brand", normalized.brand),
            ("engine", normalized.engine),
            ("transmission", normalized.transmission),
        ];
        for (name, value) in texts {
            if let Some(value) = value {
                pairs.push((name, value));
            }
        }
        if let Some(value) = normalized.air_conditioning {
            pairs.push(("air_conditioning", value.to_string()));
        }
        for (name, value) in [
            ("power_steering", normalized.power_steering),
            ("fuel_type", normalized.fuel_type),
        ] {
            if let Some(value) = value {
                pairs.push((name, value));
            }
        }
        pairs
    }
}

fn equals(wanted: Option<&str>, field: &Field<String>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    field
        .value()
        .is_some_and(|value| value.trim().to_lowercase() == wanted.trim().to_lowercase())
}

fn contains(wanted: Option<&str>, field: &Field<String>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    let needle = wanted.trim().to_lowercase();
    field
        .value()
        .is_some_and(|value| value.to_lowercase().contains(&needle))
}

fn flag(wanted: Option<bool>, field: &Field<bool>) -> bool {
    wanted.is_none_or(|wanted| field.value() == Some(&wanted))
}

fn coded(wanted: Option<&str>, field: &Field<Coded>) -> bool {
    wanted.is_none_or(|wanted| field.value().is_some_and(|coded| coded.matches(wanted)))
}

/// Case-folds and trims a free-text query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Matches a normalized query against brand, model, display name and year.
pub fn matches_text(vehicle: &Vehicle, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [
        &vehicle.brand,
        &vehicle.model,
        &vehicle.display_name,
        &vehicle.year,
    ]
    .into_iter()
    .filter_map(Field::value)
    .any(|value| value.to_lowercase().contains(needle))
}

/// Positions of the matching vehicles, in input order.
pub fn filter_vehicles(vehicles: &[Vehicle], query: &str, criteria: &FilterCriteria) -> Vec<usize> {
    let needle = normalize_query(query);
    let criteria = criteria.normalized();
    vehicles
        .iter()
        .enumerate()
        .filter(|(_, vehicle)| matches_text(vehicle, &needle) && criteria.matches(vehicle))
        .map(|(index, _)| index)
        .collect()
}

/// The fetched vehicles plus a revision that changes on every replace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleList {
    revision: u64,
    items: Vec<Vehicle>,
}

impl VehicleList {
    pub fn new(items: Vec<Vehicle>) -> Self {
        Self { revision: 1, items }
    }

    pub fn replace(&mut self, items: Vec<Vehicle>) {
        self.items = items;
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn items(&self) -> &[Vehicle] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.items.iter().find(|vehicle| vehicle.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueryKey {
    revision: u64,
    query: String,
    criteria: FilterCriteria,
}

/// Memoized filter results. Recomputes only when the list revision, the
/// normalized query or the criteria change, and bumps `generation` each
/// time it does.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    key: Option<QueryKey>,
    indices: Vec<usize>,
    generation: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, list: &VehicleList, query: &str, criteria: &FilterCriteria) -> &[usize] {
        let key = QueryKey {
            revision: list.revision(),
            query: normalize_query(query),
            criteria: criteria.normalized(),
        };
        if self.key.as_ref() != Some(&key) {
            self.indices = filter_vehicles(list.items(), &key.query, &key.criteria);
            self.generation += 1;
            tracing::debug!(
                generation = self.generation,
                matched = self.indices.len(),
                total = list.len(),
                "recomputed filtered vehicle set"
            );
            self.key = Some(key);
        }
        &self.indices
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The first `limit` cached matches resolved against `list`.
    pub fn resolve<'a>(&self, list: &'a VehicleList, limit: usize) -> Vec<&'a Vehicle> {
        self.indices
            .iter()
            .take(limit)
            .filter_map(|index| list.items().get(*index))
            .collect()
    }
}
