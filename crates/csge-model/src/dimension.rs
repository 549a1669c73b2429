use serde::{Deserialize, Serialize};

/// How the presentation layer uses a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionType {
    Filter,
    Value,
}

impl DimensionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "Filter",
            Self::Value => "Value",
        }
    }
}

/// One discrete value on a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionMember {
    /// Member id as used in the source coordinate.
    pub member_id: u32,
    pub name_en: String,
    pub name_fr: String,
    /// Unit-of-measure code carried by the member, if any.
    pub uom_code: Option<u32>,
}

/// One classification axis of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// 1-based position in the source coordinate.
    pub position: u32,
    pub name_en: String,
    pub name_fr: String,
    pub members: Vec<DimensionMember>,
}

impl Dimension {
    pub fn is_geography(&self) -> bool {
        self.name_en.trim().eq_ignore_ascii_case("geography")
    }

    /// True when at least one member carries a unit-of-measure code.
    pub fn carries_units(&self) -> bool {
        self.members.iter().any(|m| m.uom_code.is_some())
    }
}

/// Unit-of-measure text in both languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    pub code: Option<u32>,
    pub en: String,
    pub fr: String,
}
