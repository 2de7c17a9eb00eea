#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use dart_persistence::CorpCodeEntry;
use dart_persistence::Disclosure;
use dart_persistence::FinancialStatementRow;
use dart_persistence::FsDivision;
use dart_persistence::ReportCode;
use dart_persistence::StatementDivision;
use thiserror::Error;
use tracing::Instrument;
use tracing::debug_span;
use tracing::warn;

mod archive;
mod rate_limiter;
mod wire;

pub use crate::rate_limiter::RateLimiter;

pub type EdsResult<T> = Result<T, EdsClientError>;

#[derive(Debug, Error)]
pub enum EdsClientError {
    #[error("external source error: {0}")]
    ExternalSourceError(String),
    #[error("transient parsing error: {0}")]
    TransientParsing(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Placeholder value that, when configured as the API key, switches the
/// client into mock mode for offline development.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Sentinel corp_code that the mock profile responds to with a fully
/// populated record; every other code gets a minimal stub.
pub const MOCK_SENTINEL_CORP_CODE: &str = "00126380";

/// Wraps the EDS API key so it can never leak through a derived `Debug` or
/// an accidental `tracing::debug!("{config:?}")`.
#[derive(Clone)]
pub struct RedactedKey(String);

impl RedactedKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.trim().is_empty() || self.0 == PLACEHOLDER_API_KEY
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RedactedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

#[derive(Debug, Clone)]
pub struct EdsClientConfig {
    pub base_url: String,
    pub api_key: RedactedKey,
    pub timeout: Duration,
    pub rate_per_second: u32,
}

impl Default for EdsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opendart.fss.or.kr".into(),
            api_key: RedactedKey::new(PLACEHOLDER_API_KEY),
            timeout: Duration::from_secs(30),
            rate_per_second: 10,
        }
    }
}

#[async_trait]
pub trait EdsClient: Send + Sync {
    async fn fetch_corp_code_archive(&self) -> EdsResult<Vec<CorpCodeEntry>>;
    async fn get_company_profile(&self, corp_code: &str) -> EdsResult<Option<EdsCompanyProfile>>;
    async fn search_disclosures(
        &self,
        corp_code: &str,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> EdsResult<Vec<Disclosure>>;
    async fn get_financial_statement(
        &self,
        corp_code: &str,
        business_year: i32,
        report_code: ReportCode,
        division: FsDivision,
    ) -> EdsResult<Vec<FinancialStatementRow>>;
}

/// EDS-sourced fields for a company profile. Owner linkage
/// (`headquarters_id`/`partner_id`) is not known to the client and is
/// attached downstream when the profile is merged into persistent storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdsCompanyProfile {
    pub corp_code: String,
    pub corp_name: String,
    pub corp_name_eng: Option<String>,
    pub stock_code: Option<String>,
    pub stock_name: Option<String>,
    pub ceo_name: Option<String>,
    pub market_class: Option<String>,
    pub business_number: Option<String>,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub homepage_url: Option<String>,
    pub ir_url: Option<String>,
    pub phone_number: Option<String>,
    pub fax_number: Option<String>,
    pub industry_code: Option<String>,
    pub establishment_date: Option<String>,
    pub accounting_month: Option<String>,
}

pub struct HttpEdsClient {
    http: reqwest::Client,
    config: EdsClientConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpEdsClient {
    pub fn new(config: EdsClientConfig) -> EdsResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| EdsClientError::ExternalSourceError(format!("http client build failed: {err}")))?;
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_per_second));
        Ok(Self {
            http,
            config,
            rate_limiter,
        })
    }

    fn mock_mode(&self) -> bool {
        self.config.api_key.is_placeholder()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl EdsClient for HttpEdsClient {
    async fn fetch_corp_code_archive(&self) -> EdsResult<Vec<CorpCodeEntry>> {
        self.rate_limiter.acquire().await;
        let span = debug_span!("fetch_corp_code_archive");
        async {
            let response = self
                .http
                .get(self.endpoint("corpCode.xml"))
                .query(&[("crtfc_key", self.config.api_key.expose())])
                .send()
                .await
                .map_err(|err| EdsClientError::ExternalSourceError(err.to_string()))?;
            if !response.status().is_success() {
                return Err(EdsClientError::ExternalSourceError(format!(
                    "corp-code archive download failed: {}",
                    response.status()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|err| EdsClientError::ExternalSourceError(err.to_string()))?;
            archive::decode_corp_code_archive(&bytes)
        }
        .instrument(span)
        .await
    }

    async fn get_company_profile(&self, corp_code: &str) -> EdsResult<Option<EdsCompanyProfile>> {
        if self.mock_mode() {
            return Ok(Some(mock_company_profile(corp_code)));
        }
        self.rate_limiter.acquire().await;
        let span = debug_span!("get_company_profile", corp_code);
        async {
            let response = match self
                .http
                .get(self.endpoint("company.json"))
                .query(&[
                    ("crtfc_key", self.config.api_key.expose()),
                    ("corp_code", corp_code),
                ])
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "company profile request failed, treating as empty");
                    return Ok(None);
                }
            };
            if !response.status().is_success() {
                warn!(status = %response.status(), "company profile non-2xx, treating as empty");
                return Ok(None);
            }
            let envelope: wire::CompanyProfileEnvelope = match response.json().await {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(error = %err, "company profile parse failure, treating as empty");
                    return Ok(None);
                }
            };
            if envelope.status != "000" {
                return Ok(None);
            }
            let body = envelope.body;
            Ok(Some(EdsCompanyProfile {
                corp_code: body.corp_code.unwrap_or_else(|| corp_code.to_owned()),
                corp_name: body.corp_name.unwrap_or_default(),
                corp_name_eng: non_empty(body.corp_name_eng),
                stock_code: non_empty(body.stock_code),
                stock_name: non_empty(body.stock_name),
                ceo_name: non_empty(body.ceo_nm),
                market_class: non_empty(body.corp_cls),
                business_number: non_empty(body.bizr_no),
                registration_number: non_empty(body.jurir_no),
                address: non_empty(body.adres),
                homepage_url: non_empty(body.hm_url),
                ir_url: non_empty(body.ir_url),
                phone_number: non_empty(body.phn_no),
                fax_number: non_empty(body.fax_no),
                industry_code: non_empty(body.induty_code),
                establishment_date: non_empty(body.est_dt),
                accounting_month: non_empty(body.acc_mt),
            }))
        }
        .instrument(span)
        .await
    }

    async fn search_disclosures(
        &self,
        corp_code: &str,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> EdsResult<Vec<Disclosure>> {
        self.rate_limiter.acquire().await;
        let span = debug_span!("search_disclosures", corp_code);
        async {
            let response = self
                .http
                .get(self.endpoint("list.json"))
                .query(&[
                    ("crtfc_key", self.config.api_key.expose()),
                    ("corp_code", corp_code),
                    ("bgn_de", &begin.format("%Y%m%d").to_string()),
                    ("end_de", &end.format("%Y%m%d").to_string()),
                    ("page_count", "100"),
                ])
                .send()
                .await
                .map_err(|err| EdsClientError::ExternalSourceError(err.to_string()))?;
            if !response.status().is_success() {
                return Err(EdsClientError::ExternalSourceError(format!(
                    "disclosure search failed: {}",
                    response.status()
                )));
            }
            let envelope: wire::DisclosureListEnvelope = response
                .json()
                .await
                .map_err(|err| EdsClientError::ExternalSourceError(err.to_string()))?;
            if envelope.status != "000" {
                return Ok(Vec::new());
            }
            envelope
                .list
                .into_iter()
                .map(|item| {
                    let receipt_date = NaiveDate::parse_from_str(&item.rcept_dt, "%Y%m%d")
                        .map_err(|err| {
                            EdsClientError::TransientParsing(format!(
                                "invalid rcept_dt {}: {err}",
                                item.rcept_dt
                            ))
                        })?;
                    Ok(Disclosure {
                        receipt_no: item.rcept_no,
                        corp_code: item.corp_code,
                        corp_name: item.corp_name,
                        stock_code: non_empty(item.stock_code),
                        corp_class: non_empty(item.corp_cls),
                        report_name: item.report_nm,
                        submitter_name: non_empty(item.flr_nm),
                        receipt_date,
                        remark: non_empty(item.rm),
                    })
                })
                .collect()
        }
        .instrument(span)
        .await
    }

    async fn get_financial_statement(
        &self,
        corp_code: &str,
        business_year: i32,
        report_code: ReportCode,
        division: FsDivision,
    ) -> EdsResult<Vec<FinancialStatementRow>> {
        self.rate_limiter.acquire().await;
        let span = debug_span!("get_financial_statement", corp_code, business_year);
        async {
            let response = self
                .http
                .get(self.endpoint("fnlttSinglAcntAll.json"))
                .query(&[
                    ("crtfc_key", self.config.api_key.expose()),
                    ("corp_code", corp_code),
                    ("bsns_year", &business_year.to_string()),
                    ("reprt_code", &report_code.code().to_string()),
                    ("fs_div", division.to_string().as_str()),
                ])
                .send()
                .await
                .map_err(|err| EdsClientError::ExternalSourceError(err.to_string()))?;
            if !response.status().is_success() {
                return Err(EdsClientError::ExternalSourceError(format!(
                    "financial statement fetch failed: {}",
                    response.status()
                )));
            }
            let envelope: wire::FinancialStatementEnvelope = response
                .json()
                .await
                .map_err(|err| EdsClientError::ExternalSourceError(err.to_string()))?;
            if envelope.status != "000" {
                return Ok(Vec::new());
            }
            Ok(envelope
                .list
                .into_iter()
                .map(|item| FinancialStatementRow {
                    corp_code: corp_code.to_owned(),
                    business_year,
                    report_code,
                    fs_division: division,
                    statement_division: StatementDivision::from_sj_div(&item.sj_div),
                    account_id: item.account_id,
                    account_name: item.account_nm,
                    thstrm_nm: non_empty(item.thstrm_nm),
                    thstrm_amount: non_empty(item.thstrm_amount),
                    frmtrm_nm: non_empty(item.frmtrm_nm),
                    frmtrm_amount: non_empty(item.frmtrm_amount),
                    thstrm_add_amount: non_empty(item.thstrm_add_amount),
                    frmtrm_add_amount: non_empty(item.frmtrm_add_amount),
                    bfefrmtrm_nm: non_empty(item.bfefrmtrm_nm),
                    bfefrmtrm_amount: non_empty(item.bfefrmtrm_amount),
                    currency: item.currency.unwrap_or_else(|| "KRW".into()),
                })
                .collect())
        }
        .instrument(span)
        .await
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn mock_company_profile(corp_code: &str) -> EdsCompanyProfile {
    if corp_code == MOCK_SENTINEL_CORP_CODE {
        EdsCompanyProfile {
            corp_code: corp_code.to_owned(),
            corp_name: "삼성전자(주)".into(),
            corp_name_eng: Some("Samsung Electronics Co Ltd".into()),
            stock_code: Some("005930".into()),
            stock_name: Some("삼성전자".into()),
            ceo_name: Some("한종희, 경계현".into()),
            market_class: Some("Y".into()),
            business_number: Some("1248100998".into()),
            registration_number: Some("1301110006246".into()),
            address: Some("경기도 수원시 영통구 삼성로 129".into()),
            homepage_url: Some("www.samsung.com/sec".into()),
            ir_url: Some("www.samsung.com/sec/ir".into()),
            phone_number: Some("02-2255-0114".into()),
            fax_number: Some("031-200-7538".into()),
            industry_code: Some("26410".into()),
            establishment_date: Some("19690113".into()),
            accounting_month: Some("12".into()),
        }
    } else {
        EdsCompanyProfile {
            corp_code: corp_code.to_owned(),
            corp_name: "테스트 회사명".into(),
            industry_code: Some("12345".into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn mock_mode_serves_sentinel_profile_when_key_is_placeholder() {
        let config = EdsClientConfig::default();
        let client = HttpEdsClient::new(config).unwrap();
        let profile = client
            .get_company_profile(MOCK_SENTINEL_CORP_CODE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.corp_name, "삼성전자(주)");
        assert_eq!(profile.industry_code.as_deref(), Some("26410"));
    }

    #[tokio::test]
    async fn mock_mode_serves_minimal_profile_for_other_codes() {
        let config = EdsClientConfig::default();
        let client = HttpEdsClient::new(config).unwrap();
        let profile = client
            .get_company_profile("00000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.corp_name, "테스트 회사명");
        assert_eq!(profile.industry_code.as_deref(), Some("12345"));
        assert!(profile.ceo_name.is_none());
    }

    #[test]
    fn redacted_key_never_prints_the_raw_value() {
        let key = RedactedKey::new("super-secret-key");
        assert_eq!(format!("{key:?}"), "***");
    }

    #[test]
    fn placeholder_and_blank_keys_trigger_mock_mode() {
        assert!(RedactedKey::new(PLACEHOLDER_API_KEY).is_placeholder());
        assert!(RedactedKey::new("").is_placeholder());
        assert!(RedactedKey::new("  ").is_placeholder());
        assert!(!RedactedKey::new("real-key").is_placeholder());
    }
}
