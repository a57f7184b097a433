use std::sync::LazyLock;

use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.result-row").unwrap());
static INFO_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.result-info").unwrap());
static TIME_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("time").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static PRICE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.result-meta > span.result-price").unwrap());
static HOOD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.result-meta > span.result-hood").unwrap());
static HOUSING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.result-meta > span.housing").unwrap());
static NEXT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[title="next page"]"#).unwrap());

/// Posting timestamps come zone-less, local to the listing's region.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One matched search-result row. `pid`, timestamp, permalink and title are
/// required; the rest is whatever the poster filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub pid: String,
    pub posted_at: NaiveDateTime,
    /// Timestamp exactly as printed on the page; written to the output verbatim.
    pub posted_raw: String,
    /// Site-relative permalink until the crawl loop absolutizes it.
    pub url: String,
    pub title: String,
    pub price: Option<String>,
    pub neighb: Option<String>,
    /// Square footage. Written as 0 when absent, matching the historical
    /// output format which never told "no size given" apart from zero.
    pub sqft: Option<u32>,
}

/// Everything the crawl loop needs from one search-results page.
/// Extraction failures stay per-row so the caller can skip and continue.
#[derive(Debug)]
pub struct SearchPage {
    pub listings: Vec<Result<Listing, ExtractError>>,
    pub next_page: Option<String>,
}

/// Parse a search-results page into its listing rows and next-page link.
pub fn parse_search_page(html: &str) -> SearchPage {
    let doc = Html::parse_document(html);
    let listings = doc.select(&ROW_SEL).map(extract_listing).collect();
    let next_page = doc
        .select(&NEXT_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);
    SearchPage { listings, next_page }
}

/// Extract the flat field record from one listing row. Pure: the same
/// fragment always yields the same values.
pub fn extract_listing(row: ElementRef<'_>) -> Result<Listing, ExtractError> {
    let pid = row
        .value()
        .attr("data-pid")
        .ok_or(ExtractError::MissingPid)?
        .to_string();

    let info = row
        .select(&INFO_SEL)
        .next()
        .ok_or_else(|| ExtractError::MissingInfo(pid.clone()))?;

    let posted_raw = info
        .select(&TIME_SEL)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .ok_or_else(|| ExtractError::MissingTimestamp(pid.clone()))?
        .to_string();
    let posted_at =
        NaiveDateTime::parse_from_str(&posted_raw, TS_FORMAT).map_err(|source| {
            ExtractError::BadTimestamp {
                pid: pid.clone(),
                raw: posted_raw.clone(),
                source,
            }
        })?;

    let link = info
        .select(&LINK_SEL)
        .next()
        .ok_or_else(|| ExtractError::MissingPermalink(pid.clone()))?;
    let url = link
        .value()
        .attr("href")
        .ok_or_else(|| ExtractError::MissingPermalink(pid.clone()))?
        .to_string();
    let title = link.text().collect::<String>().trim().to_string();
    if title.is_empty() {
        return Err(ExtractError::MissingTitle(pid));
    }

    let price = info
        .select(&PRICE_SEL)
        .next()
        .map(|el| el.text().collect::<String>().trim().trim_start_matches('$').to_string());

    let neighb = info.select(&HOOD_SEL).next().map(|el| {
        el.text()
            .collect::<String>()
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .to_string()
    });

    let sqft = info
        .select(&HOUSING_SEL)
        .next()
        .and_then(|el| int_prefix(&el.text().collect::<String>(), "ft"));

    Ok(Listing {
        pid,
        posted_at,
        posted_raw,
        url,
        title,
        price,
        neighb,
        sqft,
    })
}

/// Bedrooms and square footage arrive as one blob, "1br - 450ft2 -".
/// Pick out the token carrying `marker` and parse its numeric prefix.
fn int_prefix(blob: &str, marker: &str) -> Option<u32> {
    blob.split_whitespace()
        .find(|tok| tok.contains(marker))
        .and_then(|tok| tok.split(marker).next())
        .and_then(|num| num.parse().ok())
}
