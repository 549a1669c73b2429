//! Catalogue of the relational tables the loader reads and writes.
//!
//! Column names match the presentation database so frames can be bulk
//! inserted without renaming.

use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}

/// A column definition: name plus storage class.
pub type ColumnDef = (&'static str, ColumnKind);

pub mod columns {
    pub const THEME_ID: &str = "IndicatorThemeId";
    pub const THEME_EN: &str = "IndicatorTheme_EN";
    pub const THEME_FR: &str = "IndicatorTheme_FR";
    pub const PARENT_THEME_ID: &str = "ParentThemeId";
    pub const SURVEY_CODE: &str = "SurveyCode";

    pub const DIMENSION_ID: &str = "DimensionId";
    pub const DIMENSION_EN: &str = "Dimension_EN";
    pub const DIMENSION_FR: &str = "Dimension_FR";
    pub const DISPLAY_ORDER: &str = "DisplayOrder";
    pub const DIMENSION_TYPE: &str = "DimensionType";

    pub const DIMENSION_VALUE_ID: &str = "DimensionValueId";
    pub const DISPLAY_EN: &str = "Display_EN";
    pub const DISPLAY_FR: &str = "Display_FR";
    pub const VALUE_DISPLAY_ORDER: &str = "ValueDisplayOrder";
    pub const VALUE_DISPLAY_PARENT: &str = "ValueDisplayParent";

    pub const INDICATOR_ID: &str = "IndicatorId";
    pub const INDICATOR_NAME_EN: &str = "IndicatorName_EN";
    pub const INDICATOR_NAME_FR: &str = "IndicatorName_FR";
    pub const RELEASE_DATE: &str = "ReleaseIndicatorDate";
    pub const REFERENCE_PERIOD: &str = "ReferencePeriod";
    pub const INDICATOR_CODE: &str = "IndicatorCode";
    pub const INDICATOR_DISPLAY_EN: &str = "IndicatorDisplay_EN";
    pub const INDICATOR_DISPLAY_FR: &str = "IndicatorDisplay_FR";
    pub const UOM_EN: &str = "UOM_EN";
    pub const UOM_FR: &str = "UOM_FR";
    pub const VECTOR: &str = "Vector";
    pub const INDICATOR_NAME_LONG_EN: &str = "IndicatorNameLong_EN";
    pub const INDICATOR_NAME_LONG_FR: &str = "IndicatorNameLong_FR";

    pub const INDICATOR_VALUE_ID: &str = "IndicatorValueId";
    pub const VALUE: &str = "Value";
    pub const NULL_REASON_ID: &str = "NullReasonId";
    pub const INDICATOR_VALUE_CODE: &str = "IndicatorValueCode";

    pub const GEOGRAPHIC_LEVEL_ID: &str = "GeographicLevelId";
    pub const GEOGRAPHY_REFERENCE_ID: &str = "GeographyReferenceId";

    pub const METADATA_ID: &str = "MetaDataId";
    pub const FIELD_ALIAS_EN: &str = "FieldAlias_EN";
    pub const FIELD_ALIAS_FR: &str = "FieldAlias_FR";
    pub const DATA_FORMAT_ID: &str = "DataFormatId";
    pub const BREAKS_ALGORITHM_ID: &str = "DefaultBreaksAlgorithmId";
    pub const DEFAULT_BREAKS: &str = "DefaultBreaks";
    pub const PRIMARY_CHART_TYPE_ID: &str = "PrimaryChartTypeId";
    pub const PRIMARY_QUERY: &str = "PrimaryQuery";
    pub const COLOR_TO: &str = "ColorTo";
    pub const COLOR_FROM: &str = "ColorFrom";
    pub const DIMENSION_UNIQUE_KEY: &str = "DimensionUniqueKey";
    pub const DEFAULT_RELATED_CHART_ID: &str = "DefaultRelatedChartId";

    pub const RELATED_CHART_ID: &str = "RelatedChartId";
    pub const CHART_TITLE_EN: &str = "ChartTitle_EN";
    pub const CHART_TITLE_FR: &str = "ChartTitle_FR";
    pub const QUERY: &str = "Query";
    pub const DEFAULT_CHART_TYPE_ID: &str = "DefaultChartTypeId";
    pub const RELATED_INDICATOR_IDS: &str = "RelatedIndicatorIds";

    pub const DISPLAY_NAME_EN: &str = "DisplayNameLong_EN";
    pub const DISPLAY_NAME_FR: &str = "DisplayNameLong_FR";

    pub const SYMBOL: &str = "Symbol";
    pub const DESCRIPTION_EN: &str = "Description_EN";
    pub const DESCRIPTION_FR: &str = "Description_FR";
}

use columns as c;
use ColumnKind::{Float, Int, Text};

/// Every table known to the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    IndicatorTheme,
    Dimensions,
    DimensionValues,
    Indicator,
    IndicatorValues,
    GeographicLevelForIndicator,
    GeographyReferenceForIndicator,
    IndicatorMetaData,
    RelatedCharts,
    GeographyReference,
    IndicatorNullReason,
}

impl Table {
    pub const ALL: [Table; 11] = [
        Table::IndicatorTheme,
        Table::Dimensions,
        Table::DimensionValues,
        Table::Indicator,
        Table::IndicatorValues,
        Table::GeographicLevelForIndicator,
        Table::GeographyReferenceForIndicator,
        Table::IndicatorMetaData,
        Table::RelatedCharts,
        Table::GeographyReference,
        Table::IndicatorNullReason,
    ];

    /// Derived tables in the order a product rebuild must delete them.
    pub const DELETE_ORDER: [Table; 6] = [
        Table::RelatedCharts,
        Table::IndicatorMetaData,
        Table::IndicatorValues,
        Table::GeographyReferenceForIndicator,
        Table::GeographicLevelForIndicator,
        Table::Indicator,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::IndicatorTheme => "IndicatorTheme",
            Self::Dimensions => "Dimensions",
            Self::DimensionValues => "DimensionValues",
            Self::Indicator => "Indicator",
            Self::IndicatorValues => "IndicatorValues",
            Self::GeographicLevelForIndicator => "GeographicLevelForIndicator",
            Self::GeographyReferenceForIndicator => "GeographyReferenceForIndicator",
            Self::IndicatorMetaData => "IndicatorMetaData",
            Self::RelatedCharts => "RelatedCharts",
            Self::GeographyReference => "GeographyReference",
            Self::IndicatorNullReason => "IndicatorNullReason",
        }
    }

    /// Column holding the table's numeric surrogate key, if it has one.
    pub fn id_column(self) -> Option<&'static str> {
        match self {
            Self::IndicatorTheme => Some(c::THEME_ID),
            Self::Dimensions => Some(c::DIMENSION_ID),
            Self::DimensionValues => Some(c::DIMENSION_VALUE_ID),
            Self::Indicator => Some(c::INDICATOR_ID),
            Self::IndicatorValues => Some(c::INDICATOR_VALUE_ID),
            Self::IndicatorMetaData => Some(c::METADATA_ID),
            Self::RelatedCharts => Some(c::RELATED_CHART_ID),
            Self::IndicatorNullReason => Some(c::NULL_REASON_ID),
            Self::GeographicLevelForIndicator
            | Self::GeographyReferenceForIndicator
            | Self::GeographyReference => None,
        }
    }

    /// True for reference tables the loader only reads.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::GeographyReference | Self::IndicatorNullReason)
    }

    pub fn columns(self) -> &'static [ColumnDef] {
        match self {
            Self::IndicatorTheme => &[
                (c::THEME_ID, Int),
                (c::THEME_EN, Text),
                (c::THEME_FR, Text),
                (c::PARENT_THEME_ID, Int),
                (c::SURVEY_CODE, Int),
            ],
            Self::Dimensions => &[
                (c::DIMENSION_ID, Int),
                (c::THEME_ID, Int),
                (c::DIMENSION_EN, Text),
                (c::DIMENSION_FR, Text),
                (c::DISPLAY_ORDER, Int),
                (c::DIMENSION_TYPE, Text),
            ],
            Self::DimensionValues => &[
                (c::DIMENSION_VALUE_ID, Int),
                (c::DIMENSION_ID, Int),
                (c::DISPLAY_EN, Text),
                (c::DISPLAY_FR, Text),
                (c::VALUE_DISPLAY_ORDER, Int),
                (c::VALUE_DISPLAY_PARENT, Int),
            ],
            Self::Indicator => &[
                (c::INDICATOR_ID, Int),
                (c::INDICATOR_NAME_EN, Text),
                (c::INDICATOR_NAME_FR, Text),
                (c::THEME_ID, Int),
                (c::RELEASE_DATE, Text),
                (c::REFERENCE_PERIOD, Text),
                (c::INDICATOR_CODE, Text),
                (c::INDICATOR_DISPLAY_EN, Text),
                (c::INDICATOR_DISPLAY_FR, Text),
                (c::UOM_EN, Text),
                (c::UOM_FR, Text),
                (c::VECTOR, Int),
                (c::INDICATOR_NAME_LONG_EN, Text),
                (c::INDICATOR_NAME_LONG_FR, Text),
            ],
            Self::IndicatorValues => &[
                (c::INDICATOR_VALUE_ID, Int),
                (c::VALUE, Float),
                (c::NULL_REASON_ID, Int),
                (c::INDICATOR_VALUE_CODE, Text),
            ],
            Self::GeographicLevelForIndicator => {
                &[(c::INDICATOR_ID, Int), (c::GEOGRAPHIC_LEVEL_ID, Text)]
            }
            Self::GeographyReferenceForIndicator => &[
                (c::GEOGRAPHY_REFERENCE_ID, Text),
                (c::INDICATOR_ID, Int),
                (c::INDICATOR_VALUE_ID, Int),
                (c::REFERENCE_PERIOD, Text),
            ],
            Self::IndicatorMetaData => &[
                (c::METADATA_ID, Int),
                (c::INDICATOR_ID, Int),
                (c::FIELD_ALIAS_EN, Text),
                (c::FIELD_ALIAS_FR, Text),
                (c::DATA_FORMAT_ID, Int),
                (c::BREAKS_ALGORITHM_ID, Int),
                (c::DEFAULT_BREAKS, Int),
                (c::PRIMARY_CHART_TYPE_ID, Int),
                (c::PRIMARY_QUERY, Text),
                (c::COLOR_TO, Text),
                (c::COLOR_FROM, Text),
                (c::DIMENSION_UNIQUE_KEY, Text),
                (c::DEFAULT_RELATED_CHART_ID, Int),
            ],
            Self::RelatedCharts => &[
                (c::RELATED_CHART_ID, Int),
                (c::CHART_TITLE_EN, Text),
                (c::CHART_TITLE_FR, Text),
                (c::QUERY, Text),
                (c::DEFAULT_CHART_TYPE_ID, Int),
                (c::INDICATOR_ID, Int),
                (c::RELATED_INDICATOR_IDS, Text),
            ],
            Self::GeographyReference => &[
                (c::GEOGRAPHY_REFERENCE_ID, Text),
                (c::GEOGRAPHIC_LEVEL_ID, Text),
                (c::DISPLAY_NAME_EN, Text),
                (c::DISPLAY_NAME_FR, Text),
            ],
            Self::IndicatorNullReason => &[
                (c::NULL_REASON_ID, Int),
                (c::SYMBOL, Text),
                (c::DESCRIPTION_EN, Text),
                (c::DESCRIPTION_FR, Text),
            ],
        }
    }

    pub fn column_names(self) -> Vec<&'static str> {
        self.columns().iter().map(|(name, _)| *name).collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|table| table.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownTable(s.to_string()))
    }
}
