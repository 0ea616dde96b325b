//! Convertible - conversione bidirezionale tra DTO e record tramite mappe JSON
//!
//! Ogni DTO e ogni entity implementa [`Convertible`]: si converte in una mappa
//! `String -> Value` e si ricostruisce da una mappa. Le chiavi sconosciute vengono
//! scartate (con un log di debug), i campi obbligatori mancanti o con il tipo
//! sbagliato producono un [`ConversionError`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Rappresentazione intermedia di un oggetto convertibile
pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("{target} failed validation: {source}")]
    Invalid {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{target} cannot be represented as a map of fields")]
    NotAnObject { target: &'static str },
}

pub trait Convertible: Serialize + DeserializeOwned + Sized {
    /// Nomi dei campi conosciuti dal tipo, nell'ordine di dichiarazione
    const FIELDS: &'static [&'static str];

    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Converte l'oggetto in una mappa di campi.
    ///
    /// Con `exclude_unset = true` i campi [`MaybeSet::Unset`] non compaiono;
    /// altrimenti ogni nome in `FIELDS` è presente, eventualmente come `null`.
    fn to_dict(&self, exclude_unset: bool) -> Result<Fields, ConversionError> {
        let value = serde_json::to_value(self).map_err(|source| ConversionError::Invalid {
            target: Self::type_name(),
            source,
        })?;

        let Value::Object(mut fields) = value else {
            return Err(ConversionError::NotAnObject {
                target: Self::type_name(),
            });
        };

        if !exclude_unset {
            for name in Self::FIELDS {
                fields.entry(name.to_string()).or_insert(Value::Null);
            }
        }

        Ok(fields)
    }

    /// Costruisce un'istanza a partire da una mappa, ignorando le chiavi sconosciute
    fn from_dict(value: Fields) -> Result<Self, ConversionError> {
        let mut dropped = Vec::new();
        let mut filtered = Fields::new();

        for (key, field) in value {
            if Self::FIELDS.contains(&key.as_str()) {
                filtered.insert(key, field);
            } else {
                dropped.push(key);
            }
        }

        if !dropped.is_empty() {
            debug!(target_type = Self::type_name(), ?dropped, "Dropping unknown keys");
        }

        serde_json::from_value(Value::Object(filtered)).map_err(|source| ConversionError::Invalid {
            target: Self::type_name(),
            source,
        })
    }

    /// Converte da un altro convertibile, sovrascrivendo i campi in `overrides`
    fn convert_from<S: Convertible>(source: &S, overrides: Fields) -> Result<Self, ConversionError> {
        let mut value = source.to_dict(false)?;
        value.extend(overrides);
        Self::from_dict(value)
    }

    /// Unisce `self` con `source`.
    ///
    /// Il risultato ha il tipo di `source`: parte dai campi di `self` e applica
    /// sopra ogni campo di `source`.
    fn merge<S: Convertible>(&self, source: &S) -> Result<S, ConversionError> {
        S::convert_from(self, source.to_dict(false)?)
    }
}

/// Valore di un campo che distingue "non impostato" da "impostato (anche a null)".
///
/// Va dichiarato con `#[serde(default, skip_serializing_if = "MaybeSet::is_unset")]`
/// così che un campo omesso resti fuori da `to_dict(true)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MaybeSet<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> MaybeSet<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, MaybeSet::Unset)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            MaybeSet::Set(value) => Some(value),
            MaybeSet::Unset => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            MaybeSet::Set(value) => Some(value),
            MaybeSet::Unset => None,
        }
    }
}

impl<T> From<T> for MaybeSet<T> {
    fn from(value: T) -> Self {
        MaybeSet::Set(value)
    }
}

impl<T: Serialize> Serialize for MaybeSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MaybeSet::Set(value) => value.serialize(serializer),
            MaybeSet::Unset => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for MaybeSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(MaybeSet::Set)
    }
}
