use std::{collections::BTreeMap, fmt};

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

/// Variables of one environment, keyed by variable name.
pub type Variables = BTreeMap<String, String>;

/// In-memory form of a `.gogo.yaml` file.
///
/// Whether the values in `envs` are plaintext or hex ciphertext is decided only by `encrypted`;
/// a configuration is never observed with a mix of both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default, deserialize_with = "deserialize_envs")]
    pub envs: BTreeMap<String, Variables>,
}

impl Configuration {
    /// Fresh plaintext configuration declaring a single empty environment.
    pub fn bootstrap(environment: &str) -> Self {
        let mut envs = BTreeMap::new();
        envs.insert(environment.to_string(), Variables::new());
        Self {
            encrypted: false,
            envs,
        }
    }

    pub fn state(&self) -> EncryptionState {
        if self.encrypted {
            EncryptionState::Encrypted
        } else {
            EncryptionState::Plaintext
        }
    }

    /// Total number of stored values across all environments.
    pub fn value_count(&self) -> usize {
        self.envs.values().map(BTreeMap::len).sum()
    }
}

/// The two states a configuration moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionState {
    Plaintext,
    Encrypted,
}

impl fmt::Display for EncryptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionState::Plaintext => f.write_str("plaintext"),
            EncryptionState::Encrypted => f.write_str("encrypted"),
        }
    }
}

/// Outcome of an `encrypt` or `decrypt` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Every value was encrypted and the file rewritten.
    Encrypted { values: usize },
    /// Every value was decrypted and the file rewritten.
    Decrypted { values: usize },
    /// Nothing to do; the file was not touched.
    AlreadyEncrypted,
    /// Nothing to do; the file was not touched.
    AlreadyPlaintext,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Encrypted { values } => write!(f, "Encryption done ({values} values)"),
            Transition::Decrypted { values } => write!(f, "Decryption done ({values} values)"),
            Transition::AlreadyEncrypted => f.write_str("Already encrypted"),
            Transition::AlreadyPlaintext => f.write_str("Already decrypted"),
        }
    }
}

// Hand-edited files commonly contain `envs: ~`, environments without a body (`dev:`) and
// unquoted numbers or booleans. All of them load as strings or empty maps.
fn deserialize_envs<'de, D>(deserializer: D) -> Result<BTreeMap<String, Variables>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<BTreeMap<String, ScalarString>>>> =
        Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(env, vars)| {
            let vars = vars
                .unwrap_or_default()
                .into_iter()
                .map(|(name, value)| (name, value.0))
                .collect();
            (env, vars)
        })
        .collect())
}

struct ScalarString(String);

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = ScalarString;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(ScalarString(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ScalarString(String::new()))
    }
}
