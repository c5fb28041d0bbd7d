// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

const MAKES: [(&str, [&str; 4]); 8] = [
    ("Toyota", ["Corolla", "Yaris", "Hilux", "Etios"]),
    ("Fiat", ["Mobi", "Argo", "Cronos", "Toro"]),
    ("Volkswagen", ["Gol", "Polo", "Virtus", "T-Cross"]),
    ("Chevrolet", ["Onix", "Tracker", "S10", "Spin"]),
    ("Hyundai", ["HB20", "Creta", "HB20S", "Tucson"]),
    ("Renault", ["Kwid", "Sandero", "Logan", "Duster"]),
    ("Honda", ["City", "Civic", "HR-V", "Fit"]),
    ("Jeep", ["Renegade", "Compass", "Commander", "Wrangler"]),
];

const CATEGORIES: [&str; 6] = [
    "Compacto",
    "Médio",
    "Grande",
    "Utilitário esportivo compacto",
    "Picape",
    "Minivan",
];
const VERSIONS: [&str; 6] = ["1.0 MT", "1.0 AT", "Sense", "Drive", "Comfortline", "Limited"];
const ENGINES: [&str; 5] = ["1.0", "1.0 Turbo", "1.3", "1.6", "2.0 Turbo Diesel"];
const TRANSMISSIONS: [&str; 4] = ["Manual", "Automática", "CVT", "Automatizada"];
const STEERING_CODES: [&str; 4] = ["H", "E", "H-E", "M"];
const FUEL_CODES: [&str; 4] = ["G", "E", "D", "F"];
const SENTINELS: [&str; 4] = ["nan", "NaN", "", "None"];

pub const FIRST_MODEL_YEAR: i64 = 2012;
pub const LAST_MODEL_YEAR: i64 = 2025;

/// Key spellings the API has used over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Database rows: lowercase snake_case keys.
    Legacy,
    /// Spreadsheet export: accented labels with units, uppercase id columns.
    Spreadsheet,
    /// English keys.
    English,
}

impl Dialect {
    pub const ALL: [Self; 3] = [Self::Legacy, Self::Spreadsheet, Self::English];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Spreadsheet => "spreadsheet",
            Self::English => "english",
        }
    }

    const fn keys(self) -> &'static DialectKeys {
        match self {
            Self::Legacy => &LEGACY_KEYS,
            Self::Spreadsheet => &SPREADSHEET_KEYS,
            Self::English => &ENGLISH_KEYS,
        }
    }
}

struct DialectKeys {
    id: &'static str,
    brand: &'static str,
    model: &'static str,
    version: &'static str,
    year: &'static str,
    category: &'static str,
    engine: &'static str,
    transmission: &'static str,
    air_conditioning: &'static str,
    steering: &'static str,
    fuel: &'static str,
    nmhc: &'static str,
    co: &'static str,
    nox: &'static str,
    co2: &'static str,
    ethanol_city: &'static str,
    ethanol_highway: &'static str,
    gasoline_city: &'static str,
    gasoline_highway: &'static str,
    energy: &'static str,
    image: &'static str,
    score: &'static str,
}

const LEGACY_KEYS: DialectKeys = DialectKeys {
    id: "veiculo_id",
    brand: "marca",
    model: "modelo",
    version: "versao",
    year: "ano",
    category: "categoria",
    engine: "motor",
    transmission: "transmissao",
    air_conditioning: "ar_condicionado",
    steering: "direcao_assistida",
    fuel: "combustivel",
    nmhc: "emissao_nmhc",
    co: "emissao_co",
    nox: "emissao_nox",
    co2: "emissao_co2",
    ethanol_city: "rendimento_etanol_cidade",
    ethanol_highway: "rendimento_etanol_estrada",
    gasoline_city: "rendimento_gasolina_cidade",
    gasoline_highway: "rendimento_gasolina_estrada",
    energy: "consumo_energetico",
    image: "imagem_url",
    score: "scoreFinal",
};

const SPREADSHEET_KEYS: DialectKeys = DialectKeys {
    id: "VEICULO_ID",
    brand: "MARCA",
    model: "MODELO",
    version: "Versão",
    year: "ANO",
    category: "Categoria",
    engine: "Motor",
    transmission: "Transmissão",
    air_conditioning: "Ar-condicionado",
    steering: "Direção assistida",
    fuel: "Combustível",
    nmhc: "Emissão de NMHC (g/km)",
    co: "Emissão de CO (g/km)",
    nox: "Emissão de NOx (g/km)",
    co2: "Emissão de CO2 (g/km)",
    ethanol_city: "Rendimento do etanol na cidade (km/l)",
    ethanol_highway: "Rendimento do etanol na estrada (km/l)",
    gasoline_city: "Rendimento da gasolina ou diesel na cidade (km/l)",
    gasoline_highway: "Rendimento da gasolina ou diesel estrada (km/l)",
    energy: "Consumo energético (MJ/km)",
    image: "imagem_planilha",
    score: "Score final",
};

const ENGLISH_KEYS: DialectKeys = DialectKeys {
    id: "vehicle_id",
    brand: "brand",
    model: "model",
    version: "version",
    year: "year",
    category: "category",
    engine: "engine",
    transmission: "transmission",
    air_conditioning: "air_conditioning",
    steering: "power_steering",
    fuel: "fuel_type",
    nmhc: "nmhc",
    co: "co",
    nox: "nox",
    co2: "co2",
    ethanol_city: "rendimento_etanol_cidade",
    ethanol_highway: "rendimento_etanol_estrada",
    gasoline_city: "rendimento_gasolina_cidade",
    gasoline_highway: "rendimento_gasolina_estrada",
    energy: "consumo_energetico",
    image: "image_url",
    score: "score",
};

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

/// Seeded generator of raw vehicle records as the API returns them.
/// Brand, model and year are always present; everything else may be
/// blanked with a sentinel when gaps are enabled.
#[derive(Debug, Clone)]
pub struct VehicleFaker {
    rng: DeterministicRng,
    seed: u64,
    gap_percent: u64,
}

impl VehicleFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            gap_percent: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Blanks optional fields with sentinels roughly `percent`% of the time.
    pub fn with_gaps(mut self, percent: u64) -> Self {
        self.gap_percent = percent.min(100);
        self
    }

    pub fn record(&mut self, id: i64, dialect: Dialect) -> Value {
        let keys = dialect.keys();
        let (brand, models) = MAKES[self.rng.int_n(MAKES.len())];
        let model = self.pick(&models);
        let year = FIRST_MODEL_YEAR + self.rng.int_n((LAST_MODEL_YEAR - FIRST_MODEL_YEAR + 1) as usize) as i64;

        let mut record = Map::new();
        record.insert(keys.id.to_owned(), json!(id));
        record.insert(keys.brand.to_owned(), json!(brand));
        record.insert(keys.model.to_owned(), json!(model));
        record.insert(
            keys.year.to_owned(),
            match dialect {
                Dialect::Spreadsheet => json!(year.to_string()),
                Dialect::Legacy | Dialect::English => json!(year),
            },
        );

        let version = self.pick(&VERSIONS);
        self.optional(&mut record, keys.version, json!(version));
        let category = self.pick(&CATEGORIES);
        self.optional(&mut record, keys.category, json!(category));
        let engine = self.pick(&ENGINES);
        self.optional(&mut record, keys.engine, json!(engine));
        let transmission = self.pick(&TRANSMISSIONS);
        self.optional(&mut record, keys.transmission, json!(transmission));

        let air_conditioning = self.rng.chance(80);
        let air_conditioning = match dialect {
            Dialect::Spreadsheet => json!(if air_conditioning { "Sim" } else { "Não" }),
            Dialect::Legacy | Dialect::English => json!(air_conditioning),
        };
        self.optional(&mut record, keys.air_conditioning, air_conditioning);
        let steering = self.pick(&STEERING_CODES);
        self.optional(&mut record, keys.steering, json!(steering));
        let fuel = self.pick(&FUEL_CODES);
        self.optional(&mut record, keys.fuel, json!(fuel));

        for key in [keys.nmhc, keys.co, keys.nox] {
            let value = self.measure(1, 500);
            self.optional(&mut record, key, json!(value));
        }
        let co2 = self.measure(80_000, 250_000);
        self.optional(&mut record, keys.co2, json!(co2));

        for key in [keys.ethanol_city, keys.ethanol_highway] {
            let value = self.measure(5_000, 11_000);
            self.optional(&mut record, key, json!(value));
        }
        for key in [keys.gasoline_city, keys.gasoline_highway] {
            let value = self.measure(8_000, 17_000);
            self.optional(&mut record, key, json!(value));
        }
        let energy = self.measure(1_000, 3_000);
        self.optional(&mut record, keys.energy, json!(energy));
        let score = self.measure(500, 5_000);
        self.optional(&mut record, keys.score, json!(score));

        let slug = format!("{}-{}", brand.to_lowercase(), model.to_lowercase());
        let image = match dialect {
            Dialect::Legacy => json!(format!("/imgs/{slug}.jpg")),
            Dialect::Spreadsheet => json!(format!("fotos/{slug}.png")),
            Dialect::English => json!(format!("https://cdn.example.com/{slug}.webp")),
        };
        self.optional(&mut record, keys.image, image);

        Value::Object(record)
    }

    /// `count` records with ids `1..=count`, cycling through every dialect.
    pub fn catalog(&mut self, count: usize) -> Vec<Value> {
        (0..count)
            .map(|index| {
                let dialect = Dialect::ALL[index % Dialect::ALL.len()];
                self.record(index as i64 + 1, dialect)
            })
            .collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    /// A value with three decimals, drawn from `[min, max]` thousandths.
    fn measure(&mut self, min: u64, max: u64) -> f64 {
        let span = max.saturating_sub(min) + 1;
        let thousandths = min + self.rng.next_u64() % span;
        thousandths as f64 / 1000.0
    }

    fn optional(&mut self, record: &mut Map<String, Value>, key: &str, value: Value) {
        let value = if self.gap_percent > 0 && self.rng.chance(self.gap_percent) {
            match self.rng.int_n(SENTINELS.len() + 1) {
                0 => Value::Null,
                index => json!(SENTINELS[index - 1]),
            }
        } else {
            value
        };
        record.insert(key.to_owned(), value);
    }
}

/// The record used across the suite to exercise mixed dialects and a
/// placeholder database image.
pub fn corolla_record() -> Value {
    json!({
        "veiculo_id": 7,
        "MARCA": "Toyota",
        "modelo": "Corolla",
        "ANO": "2023",
        "imagem_url": "imgs/nan",
        "imagem_planilha": "/fotos/corolla.jpg",
    })
}

pub fn comparison_payload(left: Value, right: Value) -> Value {
    json!({ "carro1": left, "carro2": right })
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}

pub fn temp_session_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("session.toml");
    Ok((dir, path))
}

pub fn brands() -> Vec<&'static str> {
    MAKES.iter().map(|(brand, _)| *brand).collect()
}

#[cfg(test)]
mod tests {
    use super::{
        Dialect, FIRST_MODEL_YEAR, LAST_MODEL_YEAR, VehicleFaker, brands, comparison_payload,
        corolla_record, temp_config_path,
    };
    use serde_json::Value;

    #[test]
    fn same_seed_same_catalog() {
        let mut left = VehicleFaker::new(42);
        let mut right = VehicleFaker::new(42);
        assert_eq!(left.catalog(12), right.catalog(12));

        let mut other = VehicleFaker::new(43);
        assert_ne!(VehicleFaker::new(42).catalog(12), other.catalog(12));
    }

    #[test]
    fn zero_seed_is_normalized() {
        assert_eq!(VehicleFaker::new(0).seed(), 1);
    }

    #[test]
    fn catalog_cycles_dialects_with_sequential_ids() {
        let mut faker = VehicleFaker::new(7);
        let catalog = faker.catalog(6);

        assert_eq!(catalog[0]["veiculo_id"], 1);
        assert_eq!(catalog[1]["VEICULO_ID"], 2);
        assert_eq!(catalog[2]["vehicle_id"], 3);
        assert_eq!(catalog[3]["veiculo_id"], 4);
        assert!(catalog[1]["ANO"].is_string());
    }

    #[test]
    fn every_dialect_carries_brand_model_and_year() {
        let mut faker = VehicleFaker::new(3).with_gaps(100);
        for dialect in Dialect::ALL {
            let record = faker.record(1, dialect);
            let object = record.as_object().expect("record is an object");
            let (brand_key, model_key, year_key) = match dialect {
                Dialect::Legacy => ("marca", "modelo", "ano"),
                Dialect::Spreadsheet => ("MARCA", "MODELO", "ANO"),
                Dialect::English => ("brand", "model", "year"),
            };
            let brand = object[brand_key].as_str().expect("brand is text");
            assert!(brands().contains(&brand), "{}", dialect.as_str());
            assert!(object[model_key].is_string());
            let year = match &object[year_key] {
                Value::Number(number) => number.as_i64().expect("integer year"),
                Value::String(text) => text.parse().expect("numeric year"),
                other => panic!("unexpected year {other}"),
            };
            assert!((FIRST_MODEL_YEAR..=LAST_MODEL_YEAR).contains(&year));
        }
    }

    #[test]
    fn full_gaps_blank_every_optional_field() {
        let mut faker = VehicleFaker::new(11).with_gaps(100);
        let record = faker.record(1, Dialect::Legacy);
        for key in ["versao", "motor", "emissao_co", "imagem_url", "scoreFinal"] {
            let value = &record[key];
            let blank = value.is_null()
                || value
                    .as_str()
                    .is_some_and(|text| ["nan", "NaN", "", "None"].contains(&text));
            assert!(blank, "{key} = {value}");
        }
    }

    #[test]
    fn fixtures_have_expected_shape() -> anyhow::Result<()> {
        let payload = comparison_payload(corolla_record(), corolla_record());
        assert_eq!(payload["carro1"]["MARCA"], "Toyota");
        assert_eq!(payload["carro2"]["imagem_url"], "imgs/nan");

        let (_dir, path) = temp_config_path()?;
        assert!(path.ends_with("config.toml"));
        assert!(!path.exists());
        Ok(())
    }
}
