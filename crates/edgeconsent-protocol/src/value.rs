//! Two-state consent value with its canonical wire strings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use edgeconsent_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentValue {
    #[serde(rename = "y")]
    Yes,
    #[serde(rename = "n")]
    No,
}

impl ConsentValue {
    /// Permissive lookup: anything other than `"y"` or `"n"` is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "y" => Some(Self::Yes),
            "n" => Some(Self::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "y",
            Self::No => "n",
        }
    }
}

impl std::fmt::Display for ConsentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidValue(format!("unknown consent value {:?}", s)))
    }
}

impl AsRef<str> for ConsentValue {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
