#![deny(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// An 8-digit statistical product (cube) identifier, e.g. `46100027`.
///
/// The first two digits are the subject classification of the product.
/// Dashed table numbers such as `46-10-0027-01` are accepted and reduced to
/// the 8-digit form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(u32);

impl ProductId {
    pub fn new(value: u32) -> Result<Self, ModelError> {
        if !(10_000_000..=99_999_999).contains(&value) {
            return Err(ModelError::InvalidProductId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_i64(self) -> i64 {
        i64::from(self.0)
    }

    /// Subject classification: the leading two digits.
    pub fn subject(self) -> SubjectCode {
        SubjectCode((self.0 / 1_000_000) as u8)
    }
}

impl FromStr for ProductId {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let digits: String = raw.trim().chars().filter(|ch| *ch != '-').collect();
        // Table numbers carry a two-digit view suffix after the product id.
        let digits = if digits.len() == 10 { &digits[..8] } else { digits.as_str() };
        if digits.len() != 8 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(ModelError::InvalidProductId(raw.to_string()));
        }
        let value = digits
            .parse::<u32>()
            .map_err(|_| ModelError::InvalidProductId(raw.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<String> for ProductId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductId> for String {
    fn from(value: ProductId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subject classification of a product (leading two digits of its id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectCode(pub u8);

impl SubjectCode {
    pub const HEALTH: Self = Self(13);
    pub const JUSTICE: Self = Self(35);
    pub const HOUSING: Self = Self(46);

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SubjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Publication frequency of a cube, from the source's frequency code set.
///
/// Indicator codes are year-grained, so only yearly and multi-year
/// frequencies are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Frequency {
    Annual,
    EveryTwoYears,
    EveryThreeYears,
    EveryFourYears,
    EveryFiveYears,
    EveryTenYears,
}

impl Frequency {
    pub fn from_code(code: u32) -> Result<Self, ModelError> {
        match code {
            12 => Ok(Self::Annual),
            13 => Ok(Self::EveryTwoYears),
            14 => Ok(Self::EveryThreeYears),
            15 => Ok(Self::EveryFourYears),
            16 => Ok(Self::EveryFiveYears),
            17 => Ok(Self::EveryTenYears),
            other => Err(ModelError::UnsupportedFrequency(other)),
        }
    }

    pub fn year_step(self) -> i32 {
        match self {
            Self::Annual => 1,
            Self::EveryTwoYears => 2,
            Self::EveryThreeYears => 3,
            Self::EveryFourYears => 4,
            Self::EveryFiveYears => 5,
            Self::EveryTenYears => 10,
        }
    }
}
