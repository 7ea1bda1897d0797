use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::StoreError;
use crate::valuation::domain::{AccountNumber, Grade, Property};

// land + building + extras may drift from the appraised total by rounding only
const TOTAL_VALUE_TOLERANCE: f64 = 1.0;

/// Reads a merged assessor export into validated [`Property`] records.
///
/// Headers may use either the API field names (`account_number`, `building_area`, ...) or the
/// assessor's raw column names (`acct`, `bld_ar`, `accrued_depr_pct`, `qa_cd`, ...). Columns
/// the engine does not use are ignored.
pub struct PropertyLoader;

impl PropertyLoader {
    /// Tab-delimited for `.txt`/`.tsv` exports, comma-delimited otherwise.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Property>, StoreError> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("tsv") => {
                b'\t'
            }
            _ => b',',
        };
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Property>, StoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut properties = Vec::new();

        for result in csv_reader.records() {
            let record = result?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let row: PropertyRow = record.deserialize(Some(&headers))?;
            properties.push(row.into_property(line)?);
        }

        Ok(properties)
    }
}

#[derive(Debug, Deserialize)]
struct PropertyRow {
    #[serde(alias = "acct")]
    account_number: String,
    #[serde(alias = "site_addr_1", default)]
    street_address: String,
    #[serde(alias = "yr_impr", default, deserialize_with = "empty_string_as_none")]
    year_built: Option<String>,
    #[serde(
        alias = "accrued_depr_pct",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    cdu: Option<String>,
    #[serde(alias = "qa_cd", default, deserialize_with = "empty_string_as_none")]
    grade: Option<String>,
    #[serde(alias = "bld_ar", default, deserialize_with = "empty_string_as_none")]
    building_area: Option<String>,
    #[serde(alias = "tot_appr_val", default, deserialize_with = "empty_string_as_none")]
    total_appraised_value: Option<String>,
    #[serde(alias = "bld_val", default, deserialize_with = "empty_string_as_none")]
    building_value: Option<String>,
    #[serde(
        alias = "x_features_val",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    extra_features_value: Option<String>,
    #[serde(
        alias = "Neighborhood_Code",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    neighborhood_code: Option<String>,
    #[serde(alias = "land_ar", default, deserialize_with = "empty_string_as_none")]
    land_area: Option<String>,
    #[serde(alias = "land_val", default, deserialize_with = "empty_string_as_none")]
    land_value: Option<String>,
}

impl PropertyRow {
    fn into_property(self, line: u64) -> Result<Property, StoreError> {
        let account_number = AccountNumber::new(&self.account_number);
        let malformed = |reason: String| StoreError::Malformed {
            line,
            account: account_number.to_string(),
            reason,
        };

        if account_number.is_empty() {
            return Err(malformed("missing account number".to_string()));
        }

        let required = |field: &str, raw: Option<&str>| -> Result<f64, StoreError> {
            let raw = raw.ok_or_else(|| malformed(format!("missing {field}")))?;
            parse_number(raw).ok_or_else(|| malformed(format!("invalid {field} '{raw}'")))
        };
        let optional = |field: &str, raw: Option<&str>| -> Result<Option<f64>, StoreError> {
            raw.map(|value| {
                parse_number(value).ok_or_else(|| malformed(format!("invalid {field} '{value}'")))
            })
            .transpose()
        };

        let building_area = required("building_area", self.building_area.as_deref())?;
        let building_value = required("building_value", self.building_value.as_deref())?;
        let total_appraised_value =
            required("total_appraised_value", self.total_appraised_value.as_deref())?;
        let cdu = required("cdu", self.cdu.as_deref())?;
        let extra_features_value =
            optional("extra_features_value", self.extra_features_value.as_deref())?
                .unwrap_or(0.0);
        let land_value = optional("land_value", self.land_value.as_deref())?;
        let land_area = optional("land_area", self.land_area.as_deref())?;
        let year_built = optional("year_built", self.year_built.as_deref())?
            .filter(|year| *year > 0.0)
            .map(|year| year as i32);

        for (field, value) in [
            ("building_value", Some(building_value)),
            ("total_appraised_value", Some(total_appraised_value)),
            ("extra_features_value", Some(extra_features_value)),
            ("land_value", land_value),
        ] {
            if value.is_some_and(|amount| amount < 0.0) {
                return Err(malformed(format!("{field} must not be negative")));
            }
        }

        if let Some(land) = land_value {
            let components = land + building_value + extra_features_value;
            if (components - total_appraised_value).abs() > TOTAL_VALUE_TOLERANCE {
                return Err(malformed(format!(
                    "land + building + extras ({components:.2}) does not match total appraised value ({total_appraised_value:.2})"
                )));
            }
        }

        Ok(Property {
            account_number,
            street_address: self.street_address,
            year_built,
            cdu,
            grade: self.grade.as_deref().map(Grade::new),
            building_area,
            total_appraised_value,
            building_value,
            extra_features_value,
            neighborhood_code: self.neighborhood_code,
            land_area,
            land_value,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Parses assessor numerics, which may carry thousands separators.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|ch| *ch != ',').collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
