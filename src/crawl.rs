use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::error::{FetchError, RegionError};
use crate::fetch::{build_client, fetch_page};
use crate::parser::detail::{
    parse_amenities, parse_body_text, parse_coordinates, Amenities, Coordinates,
};
use crate::parser::listing::parse_search_page;
use crate::sink::CsvSink;

static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://([^./]+)\.").unwrap());

/// Where a listing's timestamp falls relative to the crawl window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// Inside (earliest, latest]; keep and enrich.
    Keep,
    /// Newer than the window (a bumped repost); skip, keep scanning the page.
    SkipNewer,
    /// Older than the window. Results are newest-first, so everything from
    /// here on — this page and all later ones — is out of range too.
    StopOlder,
}

/// The (earliest, latest] bounds, local to the listing site. A timestamp
/// equal to `earliest` is still kept; only strictly-older stops the region.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub earliest: NaiveDateTime,
    pub latest: NaiveDateTime,
}

impl TimeWindow {
    pub fn classify(&self, ts: NaiveDateTime) -> WindowDecision {
        if ts > self.latest {
            WindowDecision::SkipNewer
        } else if ts < self.earliest {
            WindowDecision::StopOlder
        } else {
            WindowDecision::Keep
        }
    }
}

/// Counters a finished region reports back to the driver.
#[derive(Debug, Default)]
pub struct RegionStats {
    pub region: String,
    pub pages: usize,
    pub listings_seen: usize,
    pub ts_skipped: usize,
    pub rows_written: usize,
}

struct Enrichment {
    coords: Option<Coordinates>,
    body_text: String,
    amenities: Amenities,
}

/// Crawl one region to completion: open its sink, walk the paginated search
/// results newest-first, enrich every in-window listing from its detail
/// page, and append rows as they complete.
///
/// Page-level failures (search fetch after the one retry, dead pagination)
/// end the region quietly, keeping whatever was already written. Only
/// configuration-level problems come back as errors.
pub async fn run_region(config: &ScraperConfig, domain: &str) -> Result<RegionStats, RegionError> {
    let region =
        region_name(domain).ok_or_else(|| RegionError::BadDomain(domain.to_string()))?;
    let root = site_root(domain);

    let fname = format!("{}-{}{}.csv", config.fname_base, region, config.run_ts);
    let mut sink = CsvSink::create(&config.out_dir.join(fname))?;

    let window = TimeWindow {
        earliest: config.earliest_ts,
        latest: config.latest_ts,
    };
    let mut client = build_client(config.proxy.as_ref(), config.request_timeout)?;
    let mut stats = RegionStats {
        region: region.clone(),
        ..RegionStats::default()
    };
    let mut search_url = domain.to_string();

    info!("[{}] beginning new region", region);

    loop {
        info!("[{}] fetching {}", region, search_url);
        let page = match fetch_search_with_retry(&mut client, &search_url, config).await {
            Ok(body) => body,
            Err(err) => {
                info!("[{}] failed to fetch search page: {}", region, err);
                break;
            }
        };

        let parsed = parse_search_page(&page);
        stats.pages += 1;

        if parsed.listings.is_empty() && stats.listings_seen == 0 {
            info!("[{}] no listings retrieved", region);
        }

        let mut reached_cutoff = false;
        for extracted in parsed.listings {
            stats.listings_seen += 1;
            let mut listing = match extracted {
                Ok(listing) => listing,
                Err(err) => {
                    warn!("[{}] skipping listing: {}", region, err);
                    continue;
                }
            };

            match window.classify(listing.posted_at) {
                WindowDecision::SkipNewer => {
                    stats.ts_skipped += 1;
                    continue;
                }
                WindowDecision::StopOlder => {
                    stats.ts_skipped += 1;
                    if stats.listings_seen == 1 {
                        info!("[{}] no listings before timestamp cutoff", region);
                    } else {
                        info!("[{}] reached timestamp cutoff", region);
                    }
                    reached_cutoff = true;
                    break;
                }
                WindowDecision::Keep => {}
            }

            // Permalinks are site-relative; resolve against the site root.
            listing.url = format!("{root}{}", listing.url);
            info!("[{}] {}", region, listing.url);

            match enrich_listing(&client, &listing.url).await {
                Ok(enrichment) => {
                    sink.write_row(
                        &listing,
                        enrichment.coords.as_ref(),
                        &enrichment.body_text,
                        &enrichment.amenities,
                    )?;
                    stats.rows_written += 1;
                }
                Err(err) => {
                    warn!("[{}] skipping listing {}: {}", region, listing.pid, err);
                    continue;
                }
            }
        }

        if reached_cutoff {
            break;
        }
        match parsed.next_page {
            Some(next) => search_url = format!("{root}{next}"),
            None => {
                info!("[{}] no next page", region);
                break;
            }
        }
    }

    info!(
        "[{}] region complete: {} rows, {} seen, {} outside window",
        region, stats.rows_written, stats.listings_seen, stats.ts_skipped
    );
    Ok(stats)
}

/// Fetch a search-results page. A timeout earns one retry on a fresh client
/// (the session may be wedged); any other failure, or a failed retry, is
/// terminal for the region.
async fn fetch_search_with_retry(
    client: &mut Client,
    url: &str,
    config: &ScraperConfig,
) -> Result<String, FetchError> {
    match fetch_page(client, url).await {
        Err(err) if err.is_timeout() => {
            warn!("search page {} timed out, retrying with a fresh session", url);
            if let Ok(fresh) = build_client(config.proxy.as_ref(), config.request_timeout) {
                *client = fresh;
            }
            fetch_page(client, url).await
        }
        other => other,
    }
}

/// The three detail-page enrichments, each over its own GET. Any failure
/// skips the whole listing so a partial row never reaches the sink.
async fn enrich_listing(client: &Client, url: &str) -> Result<Enrichment, FetchError> {
    let coords = parse_coordinates(&fetch_page(client, url).await?)?;
    let body_text = parse_body_text(&fetch_page(client, url).await?)?;
    let amenities = parse_amenities(&fetch_page(client, url).await?);
    Ok(Enrichment {
        coords,
        body_text,
        amenities,
    })
}

/// "http://sfbay.example.org/search/roo" → "sfbay".
fn region_name(domain: &str) -> Option<String> {
    REGION_RE
        .captures(domain)
        .map(|caps| caps[1].to_string())
}

/// Everything before the search path is the root that site-relative
/// permalinks and next-page links resolve against.
fn site_root(domain: &str) -> &str {
    domain
        .split_once("/search")
        .map_or(domain, |(root, _)| root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow {
            earliest: ts("2025-01-15 10:00"),
            latest: ts("2025-01-15 12:00"),
        }
    }

    #[test]
    fn inside_window_is_kept() {
        assert_eq!(window().classify(ts("2025-01-15 11:00")), WindowDecision::Keep);
    }

    #[test]
    fn boundaries_are_kept() {
        // == earliest stays in: only strictly-older stops the region.
        assert_eq!(window().classify(ts("2025-01-15 10:00")), WindowDecision::Keep);
        assert_eq!(window().classify(ts("2025-01-15 12:00")), WindowDecision::Keep);
    }

    #[test]
    fn newer_than_window_skips_but_continues() {
        assert_eq!(
            window().classify(ts("2025-01-15 13:30")),
            WindowDecision::SkipNewer
        );
    }

    #[test]
    fn older_than_window_stops_the_region() {
        assert_eq!(
            window().classify(ts("2025-01-15 09:59")),
            WindowDecision::StopOlder
        );
    }

    #[test]
    fn region_name_from_domain() {
        assert_eq!(
            region_name("http://losangeles.example.org/search/roo").as_deref(),
            Some("losangeles")
        );
        assert_eq!(
            region_name("https://sfbay.example.org/search/roo").as_deref(),
            Some("sfbay")
        );
        assert_eq!(region_name("not a url"), None);
    }

    #[test]
    fn site_root_strips_search_path() {
        assert_eq!(
            site_root("http://sfbay.example.org/search/roo?s=120"),
            "http://sfbay.example.org"
        );
        assert_eq!(site_root("http://sfbay.example.org"), "http://sfbay.example.org");
    }
}
