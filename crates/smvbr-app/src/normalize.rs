// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Number, Value};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::ids::VehicleId;
use crate::model::{Coded, Emissions, Field, FuelYields, Vehicle};

pub const ALIAS_TABLE_VERSION: u32 = 3;
pub const FALLBACK_IMAGE_URL: &str = "https://cdn-icons-png.flaticon.com/512/744/744465.png";

const SENTINEL_STRINGS: [&str; 5] = ["nan", "none", "null", "n/a", "undefined"];
const PLACEHOLDER_IMAGE_TOKEN: &str = "nan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    VehicleId,
    Code,
    DisplayName,
    Brand,
    Model,
    Version,
    Year,
    Category,
    Engine,
    Transmission,
    AirConditioning,
    PowerSteering,
    FuelType,
    Nmhc,
    Co,
    Nox,
    Co2,
    EthanolCity,
    EthanolHighway,
    GasolineCity,
    GasolineHighway,
    EnergyConsumption,
    ImageDatabase,
    ImageSpreadsheet,
    Score,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub field: CanonicalField,
    /// Lowercase keys, tried in order.
    pub aliases: &'static [&'static str],
}

/// Every key spelling the API has used for each canonical field. Raw keys
/// are lowercased and trimmed before lookup, so uppercase variants
/// (`MARCA`, `ANO`) resolve through the lowercase entries.
pub const FIELD_ALIASES: [FieldAliases; 25] = [
    FieldAliases {
        field: CanonicalField::VehicleId,
        aliases: &["veiculo_id", "vehicle_id", "id_veiculo", "id"],
    },
    FieldAliases {
        field: CanonicalField::Code,
        aliases: &["codigo", "código", "code"],
    },
    FieldAliases {
        field: CanonicalField::DisplayName,
        aliases: &["nome", "name"],
    },
    FieldAliases {
        field: CanonicalField::Brand,
        aliases: &["marca", "brand"],
    },
    FieldAliases {
        field: CanonicalField::Model,
        aliases: &["modelo", "model"],
    },
    FieldAliases {
        field: CanonicalField::Version,
        aliases: &["versao", "versão", "version"],
    },
    FieldAliases {
        field: CanonicalField::Year,
        aliases: &["ano", "ano modelo", "year"],
    },
    FieldAliases {
        field: CanonicalField::Category,
        aliases: &["categoria", "grupo", "category", "group"],
    },
    FieldAliases {
        field: CanonicalField::Engine,
        aliases: &["motor", "engine"],
    },
    FieldAliases {
        field: CanonicalField::Transmission,
        aliases: &["transmissao", "transmissão", "transmission"],
    },
    FieldAliases {
        field: CanonicalField::AirConditioning,
        aliases: &[
            "ar_condicionado",
            "ar-condicionado",
            "ar condicionado",
            "air_conditioning",
        ],
    },
    FieldAliases {
        field: CanonicalField::PowerSteering,
        aliases: &[
            "direcao_assistida",
            "direcao assistida",
            "direção assistida",
            "power_steering",
        ],
    },
    FieldAliases {
        field: CanonicalField::FuelType,
        aliases: &["combustivel", "combustível", "fuel_type", "fuel"],
    },
    FieldAliases {
        field: CanonicalField::Nmhc,
        aliases: &["emissao_nmhc", "emissão de nmhc (g/km)", "nmhc"],
    },
    FieldAliases {
        field: CanonicalField::Co,
        aliases: &["emissao_co", "emissão de co (g/km)", "co"],
    },
    FieldAliases {
        field: CanonicalField::Nox,
        aliases: &["emissao_nox", "emissão de nox (g/km)", "nox"],
    },
    FieldAliases {
        field: CanonicalField::Co2,
        aliases: &[
            "emissao_co2",
            "emissão de co2 (g/km)",
            "emissão de co₂ (g/km)",
            "co2",
        ],
    },
    FieldAliases {
        field: CanonicalField::EthanolCity,
        aliases: &[
            "rendimento_etanol_cidade",
            "rendimento do etanol na cidade (km/l)",
            "rendimento_cidade",
        ],
    },
    FieldAliases {
        field: CanonicalField::EthanolHighway,
        aliases: &[
            "rendimento_etanol_estrada",
            "rendimento do etanol na estrada (km/l)",
            "rendimento_estrada",
        ],
    },
    FieldAliases {
        field: CanonicalField::GasolineCity,
        aliases: &[
            "rendimento_gasolina_cidade",
            "rendimento da gasolina ou diesel na cidade (km/l)",
            "rendimento_cidade",
        ],
    },
    FieldAliases {
        field: CanonicalField::GasolineHighway,
        aliases: &[
            "rendimento_gasolina_estrada",
            "rendimento da gasolina ou diesel estrada (km/l)",
            "rendimento da gasolina ou diesel na estrada (km/l)",
            "rendimento_estrada",
        ],
    },
    FieldAliases {
        field: CanonicalField::EnergyConsumption,
        aliases: &[
            "consumo_energetico",
            "consumo energético (mj/km)",
            "consumo energetico (mj/km)",
        ],
    },
    FieldAliases {
        field: CanonicalField::ImageDatabase,
        aliases: &["imagem_url", "image_url"],
    },
    FieldAliases {
        field: CanonicalField::ImageSpreadsheet,
        aliases: &["imagem_planilha", "imagem", "image"],
    },
    FieldAliases {
        field: CanonicalField::Score,
        aliases: &["scorefinal", "score_final", "score final", "score"],
    },
];

pub fn aliases_for(field: CanonicalField) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|entry| entry.field == field)
        .map(|entry| entry.aliases)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no vehicle id under any known alias")]
    MissingIdentity,
    #[error("vehicle id {0:?} is not an integer")]
    InvalidIdentity(String),
    #[error("vehicle id {0} appears more than once")]
    DuplicateIdentity(VehicleId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub index: usize,
    pub error: RecordError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedBatch {
    pub vehicles: Vec<Vehicle>,
    pub rejected: Vec<RejectedRecord>,
}

/// Maps raw API records onto [`Vehicle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    base_url: String,
    fallback_image: String,
}

impl Normalizer {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            fallback_image: FALLBACK_IMAGE_URL.to_owned(),
        }
    }

    pub fn with_fallback_image(mut self, url: &str) -> Self {
        if !url.trim().is_empty() {
            self.fallback_image = url.trim().to_owned();
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_image(&self) -> &str {
        &self.fallback_image
    }

    pub fn normalize(&self, raw: &Value) -> Result<Vehicle, RecordError> {
        let object = raw.as_object().ok_or(RecordError::NotAnObject)?;
        self.normalize_map(object)
    }

    pub fn normalize_map(&self, raw: &Map<String, Value>) -> Result<Vehicle, RecordError> {
        let record = KeyIndex::new(raw);
        let id = record.identity()?;

        let brand: Field<String> = record.text(CanonicalField::Brand).into();
        let model: Field<String> = record.text(CanonicalField::Model).into();
        let display_name = match record.text(CanonicalField::DisplayName) {
            Some(name) => Field::Value(name),
            None => compose_name(&brand, &model).into(),
        };
        let code = record
            .text(CanonicalField::Code)
            .unwrap_or_else(|| id.to_string());

        let database_image = record.image(CanonicalField::ImageDatabase);
        let spreadsheet_image = record.image(CanonicalField::ImageSpreadsheet);

        Ok(Vehicle {
            id,
            code,
            display_name,
            brand,
            model,
            version: record.text(CanonicalField::Version).into(),
            year: record.year().into(),
            category: record.text(CanonicalField::Category).into(),
            engine: record.text(CanonicalField::Engine).into(),
            transmission: record.text(CanonicalField::Transmission).into(),
            air_conditioning: record.flag(CanonicalField::AirConditioning).into(),
            power_steering: record
                .text(CanonicalField::PowerSteering)
                .map(|raw| Coded::steering(&raw))
                .into(),
            fuel_type: record
                .text(CanonicalField::FuelType)
                .map(|raw| Coded::fuel(&raw))
                .into(),
            emissions: Emissions {
                nmhc: record.number(CanonicalField::Nmhc).into(),
                co: record.number(CanonicalField::Co).into(),
                nox: record.number(CanonicalField::Nox).into(),
                co2: record.number(CanonicalField::Co2).into(),
            },
            yields: FuelYields {
                ethanol_city: record.number(CanonicalField::EthanolCity).into(),
                ethanol_highway: record.number(CanonicalField::EthanolHighway).into(),
                gasoline_city: record.number(CanonicalField::GasolineCity).into(),
                gasoline_highway: record.number(CanonicalField::GasolineHighway).into(),
            },
            energy_consumption: record.number(CanonicalField::EnergyConsumption).into(),
            image_url: self.resolve_image(database_image.as_deref(), spreadsheet_image.as_deref()),
            score: record.number(CanonicalField::Score).into(),
        })
    }

    /// Normalizes every record it can; a bad record is reported and skipped.
    pub fn normalize_all(&self, raw: &[Value]) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        let mut seen = BTreeSet::new();

        for (index, value) in raw.iter().enumerate() {
            let outcome = self.normalize(value).and_then(|vehicle| {
                if seen.insert(vehicle.id) {
                    Ok(vehicle)
                } else {
                    Err(RecordError::DuplicateIdentity(vehicle.id))
                }
            });

            match outcome {
                Ok(vehicle) => batch.vehicles.push(vehicle),
                Err(error) => {
                    tracing::warn!(
                        index,
                        alias_table = ALIAS_TABLE_VERSION,
                        %error,
                        "dropping malformed vehicle record"
                    );
                    batch.rejected.push(RejectedRecord { index, error });
                }
            }
        }

        tracing::debug!(
            alias_table = ALIAS_TABLE_VERSION,
            accepted = batch.vehicles.len(),
            rejected = batch.rejected.len(),
            "normalized vehicle batch"
        );
        batch
    }

    /// Picks the first usable image candidate and makes it absolute.
    pub fn resolve_image(&self, database: Option<&str>, spreadsheet: Option<&str>) -> String {
        [database, spreadsheet]
            .into_iter()
            .flatten()
            .find(|candidate| !is_placeholder_image(candidate))
            .map_or_else(
                || self.fallback_image.clone(),
                |winner| join_url(&self.base_url, winner.trim()),
            )
    }

    /// Decodes a record handed over as a serialized (optionally
    /// percent-encoded) JSON parameter. Returns `None` on any failure.
    pub fn decode_record_param(&self, raw: &str) -> Option<Vehicle> {
        let parsed = serde_json::from_str::<Value>(raw).or_else(|_| {
            let decoded = urlencoding::decode(raw).map_err(|error| error.to_string())?;
            serde_json::from_str::<Value>(&decoded).map_err(|error| error.to_string())
        });

        let value = match parsed {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "cannot decode vehicle parameter");
                return None;
            }
        };

        match self.normalize(&value) {
            Ok(vehicle) => Some(vehicle),
            Err(error) => {
                tracing::warn!(%error, "vehicle parameter is not a usable record");
                None
            }
        }
    }
}

/// True for empty values and for any value carrying the `nan` placeholder,
/// in any casing and anywhere in the text (`imgs/nan`, `/imgs/NaN-1.jpg`).
pub fn is_placeholder_image(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.is_empty() || trimmed.to_lowercase().contains(PLACEHOLDER_IMAGE_TOKEN)
}

pub fn join_url(base_url: &str, path: &str) -> String {
    let lowered = path.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return path.to_owned();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn compose_name(brand: &Field<String>, model: &Field<String>) -> Option<String> {
    let parts: Vec<&str> = [brand.value(), model.value()]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn is_sentinel(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed.is_empty()
                || SENTINEL_STRINGS
                    .iter()
                    .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
        }
        _ => false,
    }
}

fn number_text(number: &Number) -> String {
    if let Some(int) = number.as_i64() {
        return int.to_string();
    }
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => format!("{float:.0}"),
        _ => number.to_string(),
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let parsed: f64 = raw.trim().replace(',', ".").parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15).then_some(value as i64)
}

struct KeyIndex<'a> {
    by_key: HashMap<String, &'a Value>,
}

impl<'a> KeyIndex<'a> {
    fn new(raw: &'a Map<String, Value>) -> Self {
        let mut by_key: HashMap<String, &'a Value> = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let folded = key.trim().to_lowercase();
            let replace = by_key.get(&folded).is_none_or(|existing| is_sentinel(existing));
            if replace {
                by_key.insert(folded, value);
            }
        }
        Self { by_key }
    }

    fn first_match(&self, field: CanonicalField, accept: impl Fn(&Value) -> bool) -> Option<&'a Value> {
        aliases_for(field)
            .iter()
            .filter_map(|alias| self.by_key.get(*alias).copied())
            .find(|&value| !is_sentinel(value) && accept(value))
    }

    fn text(&self, field: CanonicalField) -> Option<String> {
        let value = self.first_match(field, |value| {
            matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
        })?;
        match value {
            Value::String(text) => Some(text.trim().to_owned()),
            Value::Number(number) => Some(number_text(number)),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    fn number(&self, field: CanonicalField) -> Option<f64> {
        let value = self.first_match(field, |value| match value {
            Value::Number(_) => true,
            Value::String(text) => parse_decimal(text).is_some(),
            _ => false,
        })?;
        match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => parse_decimal(text),
            _ => None,
        }
    }

    fn year(&self) -> Option<String> {
        let text = self.text(CanonicalField::Year)?;
        match parse_decimal(&text).and_then(integral) {
            Some(year) => Some(year.to_string()),
            None => Some(text),
        }
    }

    fn flag(&self, field: CanonicalField) -> Option<bool> {
        let parse = |value: &Value| match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => match number.as_f64() {
                Some(n) if n == 0.0 => Some(false),
                Some(n) if n == 1.0 => Some(true),
                _ => None,
            },
            Value::String(text) => match text.trim().to_lowercase().as_str() {
                "sim" | "s" | "yes" | "y" | "true" | "1" => Some(true),
                "não" | "nao" | "n" | "no" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        self.first_match(field, |value| parse(value).is_some())
            .and_then(parse)
    }

    fn image(&self, field: CanonicalField) -> Option<String> {
        self.first_match(field, |value| {
            value
                .as_str()
                .is_some_and(|text| !is_placeholder_image(text))
        })
        .and_then(Value::as_str)
        .map(|text| text.trim().to_owned())
    }

    fn identity(&self) -> Result<VehicleId, RecordError> {
        let value = self
            .first_match(CanonicalField::VehicleId, |_| true)
            .ok_or(RecordError::MissingIdentity)?;
        let id = match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().and_then(integral)),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| parse_decimal(text).and_then(integral)),
            _ => None,
        };
        id.map(VehicleId::new)
            .ok_or_else(|| RecordError::InvalidIdentity(value.to_string()))
    }
}
