// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                raw.trim().parse().map(Self)
            }
        }
    };
}

// Identity of a catalog entry, as sent in `veiculo_id`/`id`.
entity_id!(VehicleId);
// Identity of a signed-in account, as sent in `usuario_id`.
entity_id!(UserId);

#[cfg(test)]
mod tests {
    use super::{UserId, VehicleId};

    #[test]
    fn ids_parse_trimmed_integers() {
        assert_eq!(" 42 ".parse::<VehicleId>(), Ok(VehicleId::new(42)));
        assert!("4.2".parse::<VehicleId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_value(UserId::new(3)).ok(), Some(serde_json::json!(3)));
        assert_eq!(VehicleId::new(7).to_string(), "7");
    }
}
