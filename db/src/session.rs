use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A session as handed over by the session middleware.
///
/// The store only looks at [`Cookie::max_age`] to work out when the session
/// expires. Every other field is kept verbatim and round-trips through the
/// `data` column as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub cookie: Cookie,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// The cookie sub-structure of a [`Session`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie lifetime in milliseconds. Kept as a raw JSON value since
    /// middlewares are free to put anything here; only numbers count.
    #[serde(
        rename = "maxAge",
        default,
        deserialize_with = "keep_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Value>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// An explicit `null` stays `Some(Value::Null)` so it is written back as is.
fn keep_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a session whose cookie carries the given max-age in milliseconds.
    pub fn with_max_age(max_age_millis: i64) -> Self {
        Self {
            cookie: Cookie {
                max_age: Some(Value::from(max_age_millis)),
                ..Cookie::default()
            },
            data: Map::new(),
        }
    }

    /// Sets a top-level field of the session, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

impl Cookie {
    /// The max-age in milliseconds, if one is set and is a number.
    ///
    /// Fractional values are truncated towards zero.
    pub fn max_age_millis(&self) -> Option<i64> {
        let max_age = self.max_age.as_ref()?;
        max_age
            .as_i64()
            .or_else(|| max_age.as_f64().map(|millis| millis as i64))
    }
}
