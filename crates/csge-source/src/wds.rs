//! Web Data Service client.
//!
//! Wraps the three metadata calls the loader needs: cube metadata, the list
//! of cubes changed on a date, and the shared code sets. Requests are
//! blocking and never retried; a failure propagates to the caller.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use csge_model::ProductId;

use crate::MetadataProvider;
use crate::error::{Result, SourceError};

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://www150.statcan.gc.ca/t1/wds/rest/";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A code that the service sometimes encodes as a string and sometimes as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeValue {
    Number(i64),
    Text(String),
}

impl CodeValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for CodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One member of a cube dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WdsMember {
    pub member_id: u32,
    #[serde(default)]
    pub parent_member_id: Option<u32>,
    #[serde(default)]
    pub member_name_en: String,
    #[serde(default)]
    pub member_name_fr: String,
    #[serde(default)]
    pub member_uom_code: Option<u32>,
}

/// One dimension of a cube, as returned by `getCubeMetadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WdsDimension {
    pub dimension_position_id: u32,
    #[serde(default)]
    pub dimension_name_en: String,
    #[serde(default)]
    pub dimension_name_fr: String,
    #[serde(default)]
    pub member: Vec<WdsMember>,
}

/// Cube metadata payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeMetadata {
    pub product_id: CodeValue,
    #[serde(default)]
    pub cube_title_en: String,
    #[serde(default)]
    pub cube_title_fr: String,
    #[serde(default)]
    pub cube_start_date: Option<String>,
    #[serde(default)]
    pub cube_end_date: Option<String>,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub frequency_code: Option<u32>,
    #[serde(default)]
    pub subject_code: Vec<CodeValue>,
    #[serde(default)]
    pub survey_code: Vec<CodeValue>,
    #[serde(default)]
    pub dimension: Vec<WdsDimension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UomCode {
    pub member_uom_code: u32,
    #[serde(default)]
    pub member_uom_en: String,
    #[serde(default)]
    pub member_uom_fr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyEntry {
    pub frequency_code: u32,
    #[serde(default)]
    pub frequency_desc_en: String,
    #[serde(default)]
    pub frequency_desc_fr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectEntry {
    pub subject_code: CodeValue,
    #[serde(default)]
    pub subject_en: String,
    #[serde(default)]
    pub subject_fr: String,
}

/// The subset of `getCodeSets` the loader uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeSets {
    #[serde(default)]
    pub uom: Vec<UomCode>,
    #[serde(default)]
    pub frequency: Vec<FrequencyEntry>,
    #[serde(default)]
    pub subject: Vec<SubjectEntry>,
}

impl CodeSets {
    pub fn uom(&self, code: u32) -> Option<&UomCode> {
        self.uom.iter().find(|u| u.member_uom_code == code)
    }

    pub fn frequency(&self, code: u32) -> Option<&FrequencyEntry> {
        self.frequency.iter().find(|f| f.frequency_code == code)
    }

    pub fn subject(&self, code: &str) -> Option<&SubjectEntry> {
        self.subject
            .iter()
            .find(|s| s.subject_code.to_string() == code)
    }
}

/// Response envelope shared by every service call.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    object: serde_json::Value,
}

impl Envelope {
    fn into_object<T: DeserializeOwned>(self, request: &str) -> Result<T> {
        if self.status != "SUCCESS" {
            return Err(SourceError::NotSuccess {
                request: request.to_string(),
                status: self.status,
            });
        }
        serde_json::from_value(self.object).map_err(|source| SourceError::Decode {
            request: request.to_string(),
            source,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductRequest {
    product_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangedCube {
    product_id: CodeValue,
}

/// Blocking client for the Web Data Service.
pub struct WdsClient {
    client: Client,
    base_url: String,
    code_sets: RefCell<Option<CodeSets>>,
}

impl WdsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| SourceError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            base_url,
            code_sets: RefCell::new(None),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}{method}", self.base_url)
    }

    fn get(&self, url: &str) -> Result<Envelope> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent())
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;
        decode(url, response)
    }

    fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Vec<Envelope>> {
        debug!(url, "POST");
        let response = self
            .client
            .post(url)
            .header(USER_AGENT, user_agent())
            .json(body)
            .send()
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;
        decode(url, response)
    }
}

fn user_agent() -> String {
    format!("csge-loader/{}", env!("CARGO_PKG_VERSION"))
}

fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.json().map_err(|source| SourceError::Http {
        url: url.to_string(),
        source,
    })
}

impl MetadataProvider for WdsClient {
    fn cube_metadata(&self, product_id: ProductId) -> Result<CubeMetadata> {
        let url = self.url("getCubeMetadata");
        info!(%product_id, "Retrieving cube metadata");
        let body = [ProductRequest {
            product_id: product_id.get(),
        }];
        let envelope = self
            .post(&url, &body)?
            .into_iter()
            .next()
            .ok_or(SourceError::UnknownProduct(product_id))?;
        envelope.into_object(&format!("getCubeMetadata({product_id})"))
    }

    fn changed_cube_list(&self, date: NaiveDate) -> Result<Vec<ProductId>> {
        let day = date.format("%Y-%m-%d").to_string();
        let url = self.url(&format!("getChangedCubeList/{day}"));
        info!(%day, "Looking for changed cubes");
        let cubes: Vec<ChangedCube> = self
            .get(&url)?
            .into_object(&format!("getChangedCubeList({day})"))?;
        Ok(cubes
            .into_iter()
            .filter_map(|cube| cube.product_id.to_string().parse().ok())
            .collect())
    }

    fn code_sets(&self) -> Result<CodeSets> {
        if let Some(cached) = self.code_sets.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let url = self.url("getCodeSets");
        info!("Retrieving code sets");
        let sets: CodeSets = self.get(&url)?.into_object("getCodeSets")?;
        *self.code_sets.borrow_mut() = Some(sets.clone());
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_metadata_decodes_service_payload() {
        let payload = r#"{
            "status": "SUCCESS",
            "object": {
                "productId": "46100027",
                "cubeTitleEn": "Residential properties",
                "cubeTitleFr": "Propriétés résidentielles",
                "cubeStartDate": "2018-01-01",
                "cubeEndDate": "2020-01-01",
                "releaseTime": "2020-10-28T08:30",
                "frequencyCode": 12,
                "subjectCode": ["4610"],
                "surveyCode": [5257],
                "dimension": [{
                    "dimensionPositionId": 1,
                    "dimensionNameEn": "Geography",
                    "dimensionNameFr": "Géographie",
                    "member": [{"memberId": 1, "memberNameEn": "Canada", "memberNameFr": "Canada"}]
                }]
            }
        }"#;
        let envelope: Envelope = serde_json::from_str(payload).unwrap();
        let metadata: CubeMetadata = envelope.into_object("getCubeMetadata").unwrap();
        assert_eq!(metadata.product_id.to_string(), "46100027");
        assert_eq!(metadata.frequency_code, Some(12));
        assert_eq!(metadata.survey_code[0].as_i64(), Some(5257));
        assert_eq!(metadata.dimension[0].member[0].member_uom_code, None);
    }

    #[test]
    fn test_failed_status_is_an_error() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"status": "FAILED", "object": "Product not found"}"#).unwrap();
        let err = envelope.into_object::<CubeMetadata>("getCubeMetadata").unwrap_err();
        assert!(matches!(err, SourceError::NotSuccess { .. }));
    }

    #[test]
    fn test_code_value_accepts_text_and_numbers() {
        let values: Vec<CodeValue> = serde_json::from_str(r#"["13", 46]"#).unwrap();
        assert_eq!(values[0].as_i64(), Some(13));
        assert_eq!(values[1].to_string(), "46");
    }
}
