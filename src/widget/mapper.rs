/// Normalization of upstream api-catalog chart payloads into [`WidgetData`].
///
/// Upstream records are loosely shaped: the same logical field arrives under
/// several names depending on which catalog endpoint produced it. Each target
/// field pulls from an ordered alias list — first present wins — and falls
/// back to a documented default. Nothing on this path ever fails the caller:
/// unknown types and unparseable JSON log a warning and degrade to "no
/// widget, show the text as-is".
use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::Value;

use super::{
    BarChartData, BarItem, CompareItem, CompareTableData, PriceChartData, PricePoint,
    RankingItem, RankingMetric, RankingsTableData, UpstreamChartType, WidgetData,
};

/// Status sentinel marking a streamed event that carries chart data.
pub const CHART_DATA_STATUS: &str = "chart_data";

/// Fallback 전용면적 when a price point omits it (the most common unit size).
const DEFAULT_AREA: f64 = 84.0;
const DEFAULT_BUILD_YEAR: f64 = 2020.0;
/// Rough 평 conversion used when `pricePerPyeong` is absent.
const PYEONG_DIVISOR: f64 = 30.0;

/// Map one upstream chart-data record into a typed widget.
///
/// Returns `None` when `type` is missing or not an upstream discriminant.
/// That is reportable but non-fatal: a warning is logged and the caller
/// renders no widget.
#[must_use]
pub fn map_upstream_widget(input: &Value) -> Option<WidgetData> {
    let raw_type = input.get("type").and_then(Value::as_str).unwrap_or("");
    let Some(chart_type) = UpstreamChartType::parse(raw_type) else {
        tracing::warn!(widget_type = raw_type, "unknown upstream widget type");
        return None;
    };

    let rows = input
        .get("data")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);

    Some(match chart_type {
        UpstreamChartType::PriceTrend => WidgetData::PriceChart(map_price_trend(input, rows)),
        UpstreamChartType::RegionCompare => {
            WidgetData::CompareTable(map_region_compare(rows))
        }
        UpstreamChartType::Rankings => WidgetData::RankingsTable(map_rankings(input, rows)),
        UpstreamChartType::AreaDistribution => {
            WidgetData::BarChart(map_area_distribution(input, rows))
        }
    })
}

fn map_price_trend(input: &Value, rows: &[Value]) -> PriceChartData {
    PriceChartData {
        complex_name: title_or(input, "가격 추이"),
        data: rows
            .iter()
            .map(|row| PricePoint {
                date: text_field(row, &["date", "month"]),
                price: num_field(row, &["price", "avgPrice"], 0.0),
                area: num_field(row, &["area"], DEFAULT_AREA),
            })
            .collect(),
    }
}

fn map_region_compare(rows: &[Value]) -> CompareTableData {
    CompareTableData {
        items: rows
            .iter()
            .map(|row| CompareItem {
                name: text_field(row, &["region", "name"]),
                avg_price: num_field(row, &["avgPrice", "price"], 0.0),
                price_per_pyeong: num_field(
                    row,
                    &["pricePerPyeong"],
                    (num_field(row, &["avgPrice"], 0.0) / PYEONG_DIVISOR).round(),
                ),
                total_units: num_field(row, &["count", "totalUnits"], 0.0) as u64,
                build_year: num_field(row, &["buildYear"], DEFAULT_BUILD_YEAR) as u32,
            })
            .collect(),
    }
}

fn map_rankings(input: &Value, rows: &[Value]) -> RankingsTableData {
    RankingsTableData {
        title: title_or(input, "순위"),
        metric: RankingMetric::Price,
        items: rows
            .iter()
            .enumerate()
            .map(|(index, row)| RankingItem {
                // Missing ranks are synthesized from sequence position.
                rank: num_field(row, &["rank"], (index + 1) as f64) as u64,
                name: text_field(row, &["region", "name"]),
                value: num_field(row, &["avgPrice", "value"], 0.0),
                change: opt_num_field(row, &["change", "changeRate"]),
            })
            .collect(),
    }
}

fn map_area_distribution(input: &Value, rows: &[Value]) -> BarChartData {
    BarChartData {
        title: title_or(input, "면적별 분포"),
        unit: Some("건".to_string()),
        data: rows
            .iter()
            .map(|row| BarItem {
                label: text_field(row, &["area", "label"]),
                value: num_field(row, &["count", "value"], 0.0),
                color: None,
            })
            .collect(),
    }
}

static WIDGET_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(?s)```widget\n(.*?)\n```").expect("widget block pattern is valid")
});

/// Extract a widget from a fenced ```` ```widget ```` block in message text.
///
/// Returns the content with the block removed (whitespace-trimmed) and the
/// resolved widget. The first block wins. JSON parse failure is logged and
/// treated as "no widget found": the original content comes back unmodified.
#[must_use]
pub fn extract_widget_from_text(content: &str) -> (String, Option<WidgetData>) {
    let Some(captures) = WIDGET_BLOCK.captures(content) else {
        return (content.to_string(), None);
    };
    let Some(block) = captures.get(0) else {
        return (content.to_string(), None);
    };
    let raw_json = captures.get(1).map_or("", |m| m.as_str());

    let parsed: Value = match serde_json::from_str(raw_json) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!("failed to parse widget block: {err}");
            return (content.to_string(), None);
        }
    };

    let mut text = String::with_capacity(content.len().saturating_sub(block.len()));
    text.push_str(&content[..block.start()]);
    text.push_str(&content[block.end()..]);
    let text = text.trim().to_string();

    (text, resolve_widget(parsed))
}

/// Extract a widget from one streamed status event.
///
/// A `chart_data` status with an attached `chartData` payload routes the
/// payload; an event that itself carries an upstream discriminant routes the
/// event. No fenced-block parsing happens here — this path is for discrete
/// structured events, not embedded text.
#[must_use]
pub fn extract_widget_from_event(event: &Value) -> Option<WidgetData> {
    if event.get("status").and_then(Value::as_str) == Some(CHART_DATA_STATUS) {
        if let Some(chart) = event.get("chartData") {
            return map_upstream_widget(chart);
        }
    }

    if event
        .get("type")
        .and_then(Value::as_str)
        .and_then(UpstreamChartType::parse)
        .is_some()
    {
        return map_upstream_widget(event);
    }

    None
}

/// Upstream-typed payloads get mapped; already-target-typed payloads pass
/// through unchanged.
fn resolve_widget(parsed: Value) -> Option<WidgetData> {
    let is_upstream = parsed
        .get("type")
        .and_then(Value::as_str)
        .and_then(UpstreamChartType::parse)
        .is_some();
    if is_upstream {
        return map_upstream_widget(&parsed);
    }

    match serde_json::from_value::<WidgetData>(parsed) {
        Ok(widget) => Some(widget),
        Err(err) => {
            tracing::warn!("widget block does not match any known widget shape: {err}");
            None
        }
    }
}

fn title_or(input: &Value, default: &str) -> String {
    input
        .get("title")
        .and_then(Value::as_str)
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

/// First present alias wins; numbers are stringified; else empty.
fn text_field(row: &Value, aliases: &[&str]) -> String {
    for name in aliases {
        match row.get(*name) {
            Some(Value::String(text)) => return text.clone(),
            Some(Value::Number(number)) => return number.to_string(),
            _ => {}
        }
    }
    String::new()
}

fn num_field(row: &Value, aliases: &[&str], default: f64) -> f64 {
    opt_num_field(row, aliases).unwrap_or(default)
}

fn opt_num_field(row: &Value, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .find_map(|name| row.get(*name).and_then(Value::as_f64))
}
