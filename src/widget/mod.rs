/// Widget wire types.
///
/// A widget is one structured UI visualization (chart, table, card) rendered
/// from assistant-generated data. The union is closed and serde-tagged on
/// `type` so adding a variant forces every dispatch site to be revisited at
/// compile time instead of failing in duck-typed branching at runtime.
pub mod mapper;

pub use mapper::{extract_widget_from_event, extract_widget_from_text, map_upstream_widget};

use serde::{Deserialize, Serialize};

/// Closed union of renderable widget payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetData {
    PriceChart(PriceChartData),
    CompareTable(CompareTableData),
    ComplexCard(ComplexCardData),
    StatsChart(StatsChartData),
    RankingsTable(RankingsTableData),
    BarChart(BarChartData),
    PieChart(PieChartData),
}

/// Price-over-time chart for one apartment complex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChartData {
    pub complex_name: String,
    pub data: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    /// 만원 단위
    pub price: f64,
    /// 전용면적 (㎡)
    pub area: f64,
}

/// Side-by-side comparison of several complexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareTableData {
    pub items: Vec<CompareItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareItem {
    pub name: String,
    pub avg_price: f64,
    pub price_per_pyeong: f64,
    pub total_units: u64,
    pub build_year: u32,
}

/// Detail card for a single complex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexCardData {
    pub name: String,
    pub address: String,
    pub total_units: u64,
    pub build_year: u32,
    pub avg_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_transaction: Option<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub price: f64,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsChartData {
    pub title: String,
    pub data: Vec<LabelValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
    pub value: f64,
}

/// TOP-N ranking table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingsTableData {
    pub title: String,
    pub metric: RankingMetric,
    pub items: Vec<RankingItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingMetric {
    Price,
    Volume,
    Growth,
    Yield,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingItem {
    pub rank: u64,
    pub name: String,
    pub value: f64,
    /// 변화율 (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChartData {
    pub title: String,
    pub data: Vec<BarItem>,
    /// '억', '%', '건' 등
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarItem {
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChartData {
    pub title: String,
    pub data: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub percentage: f64,
}

/// The upstream api-catalog chart discriminants this proxy understands.
///
/// Payloads arrive loosely shaped; only the discriminant is closed. The
/// mapping to [`WidgetData`] variants is fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamChartType {
    PriceTrend,
    RegionCompare,
    Rankings,
    AreaDistribution,
}

impl UpstreamChartType {
    /// Parse an upstream discriminant string, `None` for anything unknown.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "price_trend" => Some(UpstreamChartType::PriceTrend),
            "region_compare" => Some(UpstreamChartType::RegionCompare),
            "rankings" => Some(UpstreamChartType::Rankings),
            "area_distribution" => Some(UpstreamChartType::AreaDistribution),
            _ => None,
        }
    }

    /// The target widget discriminant this upstream type maps to.
    #[must_use]
    pub fn target(self) -> &'static str {
        match self {
            UpstreamChartType::PriceTrend => "price_chart",
            UpstreamChartType::RegionCompare => "compare_table",
            UpstreamChartType::Rankings => "rankings_table",
            UpstreamChartType::AreaDistribution => "bar_chart",
        }
    }
}
