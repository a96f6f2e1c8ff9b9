// Async client for the compras.gov.br open-data API.
//
// The paging contract of the API: every list endpoint takes `pagina` and
// answers with a `resultado` array plus `totalPaginas`. The loop below stops
// on the reported total, on an empty page, or at a hard ceiling, whichever
// comes first, so it terminates even when the source misreports its
// pagination metadata. Failures surface as a single error; there is no
// automatic retry.
use crate::types::{PeriodWindow, RawContract};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://dadosabertos.compras.gov.br";
/// Hard ceiling on page requests per query.
pub const MAX_PAGES: u32 = 60;
const PAGE_SIZE: u32 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("a requisição excedeu o tempo limite")]
    Timeout,
    #[error("erro de rede: {0}")]
    Network(reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e)
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new", rename = "resultado")]
    pub records: Vec<T>,
    #[serde(rename = "totalPaginas")]
    pub total_pages: Option<u32>,
}

/// Drive `fetch_page` from page 1 until the source reports completion, a
/// page comes back empty, or `max_pages` requests have been issued.
pub async fn fetch_all_pages<T, F, Fut>(
    mut fetch_page: F,
    max_pages: u32,
) -> Result<Vec<T>, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, FetchError>>,
{
    let mut out = Vec::new();
    let mut page = 1u32;
    loop {
        let envelope = fetch_page(page).await?;
        let batch_len = envelope.records.len();
        out.extend(envelope.records);
        // A source that omits totalPaginas gets exactly one request, same
        // as reporting the current page as the last one.
        let reported_total = envelope.total_pages.unwrap_or(page);
        if page >= reported_total || batch_len == 0 || page >= max_pages {
            break;
        }
        page += 1;
    }
    Ok(out)
}

/// Records gathered for a period window, plus the first error hit along the
/// way. Pages and years fetched before the failure are preserved.
#[derive(Debug)]
pub struct WindowFetch {
    pub records: Vec<RawContract>,
    pub error: Option<FetchError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UasgInfo {
    #[serde(rename = "nomeUasg")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgencyInfo {
    #[serde(rename = "codigoOrgao")]
    pub code: Option<serde_json::Value>,
    #[serde(rename = "nomeOrgao")]
    pub name: Option<String>,
}

impl AgencyInfo {
    /// The agency code arrives as a number from some deployments and a
    /// string from others.
    pub fn code_string(&self) -> Option<String> {
        crate::util::json_string(self.code.as_ref())
    }
}

pub struct PncpClient {
    http: reqwest::Client,
    base_url: String,
}

impl PncpClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::from_reqwest)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>, FetchError> {
        debug!(url, "GET");
        let resp = self
            .http
            .get(url)
            .header("accept", "*/*")
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }
        resp.json::<Page<T>>().await.map_err(FetchError::from_reqwest)
    }

    /// Resolve the unit's display name.
    pub async fn fetch_uasg(&self, uasg: &str) -> Result<Option<UasgInfo>, FetchError> {
        let url = format!(
            "{}/modulo-uasg/1_consultarUasg?codigoUasg={}&statusUasg=true&pagina=1",
            self.base_url, uasg
        );
        let page: Page<UasgInfo> = self.get_page(&url).await?;
        Ok(page.records.into_iter().next())
    }

    /// Resolve the agency record (its `codigoOrgao` keys the contract query).
    pub async fn fetch_agency(&self, cnpj: &str) -> Result<Option<AgencyInfo>, FetchError> {
        let url = format!(
            "{}/modulo-uasg/2_consultarOrgao?cnpjCpfOrgao={}&statusOrgao=true&pagina=1",
            self.base_url, cnpj
        );
        let page: Page<AgencyInfo> = self.get_page(&url).await?;
        Ok(page.records.into_iter().next())
    }

    /// All contracts whose validity starts in the given year, across pages.
    pub async fn fetch_contracts_year(
        &self,
        agency_code: &str,
        year: i32,
    ) -> Result<Vec<RawContract>, FetchError> {
        let base = format!(
            "{}/modulo-contratos/1_consultarContratos?codigoOrgao={}\
             &dataVigenciaInicialMin={year}-01-01&dataVigenciaInicialMax={year}-12-31\
             &tamanhoPagina={PAGE_SIZE}",
            self.base_url, agency_code
        );
        fetch_all_pages(
            |page| {
                let url = format!("{base}&pagina={page}");
                async move { self.get_page(&url).await }
            },
            MAX_PAGES,
        )
        .await
    }

    /// One paged query per year of the window. On failure the records
    /// already fetched are returned alongside the error, never discarded.
    pub async fn fetch_contracts_window(
        &self,
        agency_code: &str,
        window: PeriodWindow,
    ) -> WindowFetch {
        let mut records = Vec::new();
        for year in window.start..=window.end {
            match self.fetch_contracts_year(agency_code, year).await {
                Ok(batch) => {
                    debug!(year, count = batch.len(), "fetched contracts");
                    records.extend(batch);
                }
                Err(e) => {
                    warn!(year, error = %e, "contract fetch failed, keeping partial results");
                    return WindowFetch {
                        records,
                        error: Some(e),
                    };
                }
            }
        }
        WindowFetch {
            records,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(records: Vec<u32>, total_pages: Option<u32>) -> Page<u32> {
        Page {
            records,
            total_pages,
        }
    }

    #[tokio::test]
    async fn paging_stops_at_reported_total() {
        let mut calls = 0u32;
        let out = fetch_all_pages(
            |p| {
                calls += 1;
                async move { Ok(page(vec![p], Some(3))) }
            },
            MAX_PAGES,
        )
        .await
        .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn paging_stops_on_empty_page() {
        let mut calls = 0u32;
        let out = fetch_all_pages(
            |p| {
                calls += 1;
                let records = if p < 2 { vec![p] } else { Vec::new() };
                async move { Ok(page(records, Some(10))) }
            },
            MAX_PAGES,
        )
        .await
        .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(out, vec![1]);
    }

    #[tokio::test]
    async fn paging_hits_the_hard_ceiling() {
        let mut calls = 0u32;
        // A source that always claims there is more.
        let out = fetch_all_pages(
            |p| {
                calls += 1;
                async move { Ok(page(vec![p], Some(u32::MAX))) }
            },
            5,
        )
        .await
        .unwrap();
        assert_eq!(calls, 5);
        assert_eq!(out.len(), 5);
    }

    #[tokio::test]
    async fn missing_total_means_single_request() {
        let mut calls = 0u32;
        let out = fetch_all_pages(
            |p| {
                calls += 1;
                async move { Ok(page(vec![p], None)) }
            },
            MAX_PAGES,
        )
        .await
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(out, vec![1]);
    }

    #[tokio::test]
    async fn paging_propagates_the_first_error() {
        let mut calls = 0u32;
        let result: Result<Vec<u32>, FetchError> = fetch_all_pages(
            |p| {
                calls += 1;
                async move {
                    if p == 2 {
                        Err(FetchError::Timeout)
                    } else {
                        Ok(page(vec![p], Some(5)))
                    }
                }
            },
            MAX_PAGES,
        )
        .await;
        assert!(matches!(result, Err(FetchError::Timeout)));
        assert_eq!(calls, 2);
    }
}
