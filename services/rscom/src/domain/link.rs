/// rstyle link record as returned by the Hyperlink API
///
/// The record is stored denormalized in the `links` column-store table, so
/// the nested product and publisher objects are flattened on write.
use serde::{Deserialize, Deserializer, Serialize};

/// Product metadata attached to a link (`item` in the API response)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkProduct {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub product_id_v2: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sku: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
}

/// Publisher that owns the link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPublisher {
    /// The API spells this field `Id`
    #[serde(rename = "Id", default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
}

/// A single rstyle link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(deserialize_with = "required_string_or_number")]
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub version: Option<i32>,
    #[serde(default)]
    pub item: LinkProduct,
    #[serde(default)]
    pub publisher: LinkPublisher,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Integer(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }
    }
}

/// Hyperlink IDs are sometimes JSON numbers and sometimes strings
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

fn required_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrNumber::deserialize(deserializer)?.into())
}
