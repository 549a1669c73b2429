use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProductId;

/// Role of a product within the merge-group registry.
///
/// A product is exactly one of these. Masters own the published identity
/// (indicators, metadata, related charts); siblings only contribute values
/// under the master's product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeRole {
    Standalone,
    Master { siblings: Vec<ProductId> },
    Sibling { master: ProductId },
}

impl MergeRole {
    /// Product id the derived rows are published under.
    pub fn functional_product_id(&self, product_id: ProductId) -> ProductId {
        match self {
            Self::Sibling { master } => *master,
            Self::Standalone | Self::Master { .. } => product_id,
        }
    }

    /// True when the role writes Indicator, IndicatorMetaData and RelatedCharts rows.
    pub fn owns_indicators(&self) -> bool {
        !self.is_sibling()
    }

    pub fn is_sibling(&self) -> bool {
        matches!(self, Self::Sibling { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Master { .. } => "master",
            Self::Sibling { .. } => "sibling",
        }
    }
}

impl fmt::Display for MergeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sibling { master } => write!(f, "sibling of {master}"),
            other => f.write_str(other.label()),
        }
    }
}
