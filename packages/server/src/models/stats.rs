use std::collections::BTreeMap;

use serde::Serialize;

/// Catalog totals for the admin dashboard.
#[derive(Serialize, Debug, Default, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_assets: u64,
    pub free_assets: u64,
    pub premium_assets: u64,
    /// Sum of free-download counters.
    pub total_downloads: i64,
    /// One entry per category, sorted by name.
    pub categories: Vec<CategoryStats>,
}

#[derive(Serialize, Debug, PartialEq, utoipa::ToSchema)]
pub struct CategoryStats {
    #[schema(example = "graphics")]
    pub category: String,
    pub assets: u64,
    pub downloads: i64,
}

impl StatsResponse {
    /// Fold `(category, is_premium, downloads)` rows into totals.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, bool, i64)>) -> Self {
        let mut stats = StatsResponse::default();
        let mut per_category: BTreeMap<String, (u64, i64)> = BTreeMap::new();

        for (category, is_premium, downloads) in rows {
            stats.total_assets += 1;
            if is_premium {
                stats.premium_assets += 1;
            } else {
                stats.free_assets += 1;
            }
            stats.total_downloads += downloads;

            let entry = per_category.entry(category).or_default();
            entry.0 += 1;
            entry.1 += downloads;
        }

        stats.categories = per_category
            .into_iter()
            .map(|(category, (assets, downloads))| CategoryStats {
                category,
                assets,
                downloads,
            })
            .collect();
        stats
    }
}
