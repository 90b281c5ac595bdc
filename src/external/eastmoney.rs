use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::external::nav_provider::{http_client, ExternalNavPoint, NavProvider, NavProviderError, ProviderHistory};
use crate::models::{FundKind, FundMetadata, HistoryRequest};

const BASE_URL: &str = "https://fund.eastmoney.com/pingzhongdata";
/// Trend timestamps are China (UTC+8) midnights expressed as UTC milliseconds
const CHINA_OFFSET_MS: i64 = 8 * 3600 * 1000;

/// Open-end fund NAV history from the Eastmoney `pingzhongdata` script.
///
/// The endpoint returns a JavaScript file of `var X = ...;` assignments; the
/// few we need are cut out with regexes and parsed as JSON.
pub struct EastmoneyFundProvider {
    client: reqwest::Client,
    base_url: String,
    patterns: ScriptPatterns,
}

impl EastmoneyFundProvider {
    pub fn new(timeout: Duration) -> Result<Self, NavProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: BASE_URL.to_string(),
            patterns: ScriptPatterns::compile().map_err(|e| NavProviderError::Parse(e.to_string()))?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TrendPoint {
    x: i64,
    y: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Manager {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Scale {
    #[serde(default)]
    series: Vec<ScalePoint>,
}

#[derive(Debug, Deserialize)]
struct ScalePoint {
    y: Option<f64>,
}

fn assignment(name: &str, open: char, close: char) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?s){}\s*=\s*(\{}.*?\{})\s*;",
        regex::escape(name),
        open,
        close
    ))
}

/// Compiled extractors for the script variables we read.
pub(crate) struct ScriptPatterns {
    trend: Regex,
    manager: Regex,
    scale: Regex,
    name: Regex,
}

impl ScriptPatterns {
    pub(crate) fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            trend: assignment("Data_netWorthTrend", '[', ']')?,
            manager: assignment("Data_currentFundManager", '[', ']')?,
            scale: assignment("Data_fluctuationScale", '{', '}')?,
            name: Regex::new(r#"fS_name\s*=\s*"([^"]*)""#)?,
        })
    }
}

fn captured<'a>(re: &Regex, body: &'a str) -> Option<&'a str> {
    re.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn timestamp_to_date(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms + CHINA_OFFSET_MS).map(|dt| dt.date_naive())
}

/// Parses the script body. A body without a NAV trend means the code is unknown.
pub(crate) fn parse_pingzhongdata(
    patterns: &ScriptPatterns,
    code: &str,
    body: &str,
) -> Result<ProviderHistory, NavProviderError> {
    let trend_json =
        captured(&patterns.trend, body).ok_or_else(|| NavProviderError::NotFound(code.to_string()))?;

    let trend: Vec<TrendPoint> =
        serde_json::from_str(trend_json).map_err(|e| NavProviderError::Parse(format!("Data_netWorthTrend: {}", e)))?;

    let points: Vec<ExternalNavPoint> = trend
        .into_iter()
        .filter_map(|p| {
            Some(ExternalNavPoint {
                date: timestamp_to_date(p.x)?,
                nav: p.y?,
            })
        })
        .collect();

    let name = captured(&patterns.name, body)
        .map(|m| m.trim().to_string())
        .filter(|s| !s.is_empty());

    // Metadata is best effort: a malformed block only loses that field
    let manager = captured(&patterns.manager, body)
        .and_then(|m| serde_json::from_str::<Vec<Manager>>(m).ok())
        .and_then(|managers| managers.into_iter().next())
        .and_then(|m| m.name);

    let size = captured(&patterns.scale, body)
        .and_then(|m| serde_json::from_str::<Scale>(m).ok())
        .and_then(|scale| scale.series.last().and_then(|p| p.y))
        .map(|y| format!("{:.2}亿元", y));

    let inception_date = points.iter().map(|p| p.date).min();

    Ok(ProviderHistory {
        kind: FundKind::OpenEnd,
        metadata: FundMetadata {
            name,
            category: None,
            inception_date,
            manager,
            size,
        },
        points,
    })
}

#[async_trait]
impl NavProvider for EastmoneyFundProvider {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError> {
        let url = format!("{}/{}.js", self.base_url, request.code);
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::REFERER, "https://fund.eastmoney.com/")
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::NOT_FOUND => return Err(NavProviderError::NotFound(request.code.clone())),
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(NavProviderError::RateLimited),
            status if !status.is_success() => {
                return Err(NavProviderError::BadResponse(format!("HTTP {}", status)));
            }
            _ => {}
        }

        let body = resp.text().await?;
        Ok(parse_pingzhongdata(&self.patterns, &request.code, &body)?.within(request))
    }
}
