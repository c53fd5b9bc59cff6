//! Pagination metadata parsing and the sequential page-walking loop.
//!
//! Providers expose the last page in different ways:
//! - GitHub: `Link` header with `rel="last"` / `rel="next"` URLs
//! - GitLab: `x-total-pages` header
//!
//! A missing or unparseable hint means "this is the only page".

use std::future::Future;
use std::time::Duration;

use url::Url;

use crate::http::HttpHeaders;
use crate::http::header_get;

use super::errors::Result;

/// Pagination hints extracted from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Last page number, if the provider announced it.
    pub total_pages: Option<u32>,
    /// Next page number, if the provider announced it.
    pub next_page: Option<u32>,
}

impl PaginationInfo {
    /// Read whichever pagination hint the response carries.
    pub fn from_headers(headers: &HttpHeaders) -> Self {
        if let Some(link) = header_get(headers, "link") {
            let info = parse_link_header(link);
            if info.total_pages.is_some() || info.next_page.is_some() {
                return info;
            }
        }

        Self {
            total_pages: header_get(headers, "x-total-pages").and_then(parse_page_number),
            next_page: header_get(headers, "x-next-page").and_then(parse_page_number),
        }
    }
}

/// Parse an RFC 8288 `Link` header.
///
/// `<https://api.github.com/repos/o/r/commits?per_page=100&page=2>; rel="next", <...&page=7>; rel="last"`
pub fn parse_link_header(link_header: &str) -> PaginationInfo {
    let mut info = PaginationInfo::default();

    for part in link_header.split(',') {
        let mut target = None;
        let mut rel = None;

        for segment in part.split(';').map(str::trim) {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                target = Some(inner);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"'));
            }
        }

        let (Some(target), Some(rel)) = (target, rel) else {
            continue;
        };
        let Some(page) = page_param(target) else {
            continue;
        };

        match rel {
            "last" => info.total_pages = Some(page),
            "next" => info.next_page = Some(page),
            _ => {}
        }
    }

    info
}

fn page_param(target: &str) -> Option<u32> {
    let url = Url::parse(target).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| parse_page_number(&v))
}

fn parse_page_number(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|p| *p > 0)
}

/// Largest page size either provider accepts.
pub(crate) const MAX_PAGE_SIZE: usize = 100;

/// Collect up to `limit` items from a `(page, per_page)` endpoint.
///
/// `per_page` stays fixed at `min(limit, MAX_PAGE_SIZE)` so page offsets line
/// up; a short page ends the walk and any surplus is truncated.
pub(crate) async fn fetch_up_to<T, F, Fut>(limit: usize, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let per_page = limit.min(MAX_PAGE_SIZE);
    let mut items = Vec::with_capacity(limit);
    let mut page = 1u32;

    while items.len() < limit {
        let batch = fetch_page(page, per_page).await?;
        let short = batch.len() < per_page;
        items.extend(batch);
        if short {
            break;
        }
        page += 1;
    }

    items.truncate(limit);
    Ok(items)
}

/// One decoded page plus its pagination hints.
#[derive(Debug)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

/// Fetch pages 1..=last sequentially.
///
/// The last page is taken from the first response's hint; without a hint only
/// page 1 is fetched. `page_delay` is slept between consecutive requests. An
/// empty page also ends the walk so a stale hint cannot cause a run of empty
/// requests.
pub(crate) async fn fetch_all_pages<T, F, Fut>(
    page_delay: Duration,
    mut fetch_page: F,
) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1u32;
    let mut last_page = 1u32;

    loop {
        let fetched = fetch_page(page).await?;
        let count = fetched.items.len();
        items.extend(fetched.items);

        if page == 1 {
            last_page = fetched.pagination.total_pages.unwrap_or(1);
            tracing::debug!(last_page, "pagination hint from first page");
        }

        tracing::debug!(page, count, total_so_far = items.len(), "fetched page");

        if page >= last_page || count == 0 {
            break;
        }

        page += 1;
        if !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }
    }

    Ok(items)
}
