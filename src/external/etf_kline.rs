use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::external::nav_provider::{http_client, ExternalNavPoint, NavProvider, NavProviderError, ProviderHistory};
use crate::models::{FundKind, FundMetadata, HistoryRequest};

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// Exchange-traded fund history from daily close klines. The close is used
/// as the NAV.
pub struct EtfKlineProvider {
    client: reqwest::Client,
}

impl EtfKlineProvider {
    pub fn new(timeout: Duration) -> Result<Self, NavProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    name: Option<String>,
    #[serde(default)]
    klines: Vec<String>,
}

/// Shanghai listings (5xxxxx/6xxxxx) use market 1, Shenzhen uses 0.
pub(crate) fn secid(code: &str) -> String {
    let market = if code.starts_with('5') || code.starts_with('6') { 1 } else { 0 };
    format!("{}.{}", market, code)
}

/// Each kline is `"YYYY-MM-DD,close"`.
fn parse_kline(line: &str) -> Result<ExternalNavPoint, NavProviderError> {
    let mut fields = line.split(',');
    let (Some(date), Some(close)) = (fields.next(), fields.next()) else {
        return Err(NavProviderError::Parse(format!("malformed kline '{}'", line)));
    };

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| NavProviderError::Parse(format!("kline date '{}': {}", date, e)))?;
    let nav = close
        .trim()
        .parse::<f64>()
        .map_err(|e| NavProviderError::Parse(format!("kline close '{}': {}", close, e)))?;

    Ok(ExternalNavPoint { date, nav })
}

fn parse_response(code: &str, body: KlineResponse) -> Result<ProviderHistory, NavProviderError> {
    let data = body.data.ok_or_else(|| NavProviderError::NotFound(code.to_string()))?;
    let points = data
        .klines
        .iter()
        .map(|line| parse_kline(line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProviderHistory {
        kind: FundKind::ExchangeTraded,
        metadata: FundMetadata {
            name: data.name,
            category: Some("ETF".to_string()),
            inception_date: points.first().map(|p| p.date),
            manager: None,
            size: None,
        },
        points,
    })
}

#[async_trait]
impl NavProvider for EtfKlineProvider {
    fn name(&self) -> &'static str {
        "etf-kline"
    }

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError> {
        let beg = request.start.map_or_else(|| "0".to_string(), |d| d.format("%Y%m%d").to_string());
        let end = request.end.map_or_else(|| "20500101".to_string(), |d| d.format("%Y%m%d").to_string());
        let secid = secid(&request.code);
        debug!("GET {} secid={} beg={} end={}", KLINE_URL, secid, beg, end);

        let resp = self
            .client
            .get(KLINE_URL)
            .query(&[
                ("secid", secid.as_str()),
                ("fields1", "f1,f2,f3"),
                ("fields2", "f51,f53"),
                ("klt", "101"),
                ("fqt", "0"),
                ("beg", beg.as_str()),
                ("end", end.as_str()),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NavProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(NavProviderError::BadResponse(format!("HTTP {}", resp.status())));
        }

        let body = resp.json::<KlineResponse>().await?;
        Ok(parse_response(&request.code, body)?.within(request))
    }
}
