/// Entities owned by the collaboration-service database
use chrono::NaiveDateTime;

/// Links a post to a campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obligation {
    pub id: i64,
    pub post_id: String,
    pub campaign_id: i64,
    pub collaboration_id: i64,
}

/// A campaign and its contractual window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub id: i64,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

/// One row of `obligations JOIN campaigns`, keyed by the obligation's post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCampaign {
    pub post_id: String,
    pub campaign: Campaign,
}

/// A brand and the advertiser IDs it owns
///
/// `advertiser_ids` is stored as a single delimited string in the
/// `brand_advertisers` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandAdvertiser {
    pub brand_id: String,
    pub advertiser_ids: String,
}

impl BrandAdvertiser {
    /// Split the stored list on commas, trimming blanks
    pub fn advertiser_id_list(&self) -> Vec<&str> {
        self.advertiser_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// Whether `advertiser_id` is one of this brand's IDs (exact match)
    pub fn owns(&self, advertiser_id: &str) -> bool {
        self.advertiser_id_list().contains(&advertiser_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand(ids: &str) -> BrandAdvertiser {
        BrandAdvertiser {
            brand_id: "brand-1".to_string(),
            advertiser_ids: ids.to_string(),
        }
    }

    #[test]
    fn test_advertiser_id_list_splits_and_trims() {
        let brand = brand("101, 202 ,303");
        assert_eq!(brand.advertiser_id_list(), vec!["101", "202", "303"]);
    }

    #[test]
    fn test_advertiser_id_list_skips_empty_entries() {
        let brand = brand("101,,202,");
        assert_eq!(brand.advertiser_id_list(), vec!["101", "202"]);
    }

    #[test]
    fn test_owns_requires_exact_match() {
        let brand = brand("1010,202");
        assert!(brand.owns("202"));
        // substring of another ID must not match
        assert!(!brand.owns("101"));
    }
}
