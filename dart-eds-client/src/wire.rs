use serde::Deserialize;

/// `GET /api/company.json` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct CompanyProfileEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: CompanyProfileBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompanyProfileBody {
    pub corp_code: Option<String>,
    pub corp_name: Option<String>,
    pub corp_name_eng: Option<String>,
    pub stock_name: Option<String>,
    pub stock_code: Option<String>,
    pub ceo_nm: Option<String>,
    pub corp_cls: Option<String>,
    pub jurir_no: Option<String>,
    pub bizr_no: Option<String>,
    pub adres: Option<String>,
    pub hm_url: Option<String>,
    pub ir_url: Option<String>,
    pub phn_no: Option<String>,
    pub fax_no: Option<String>,
    pub induty_code: Option<String>,
    pub est_dt: Option<String>,
    pub acc_mt: Option<String>,
}

/// `GET /api/list.json` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DisclosureListEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub list: Vec<DisclosureItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DisclosureItem {
    pub corp_code: String,
    pub corp_name: String,
    pub stock_code: Option<String>,
    pub corp_cls: Option<String>,
    pub report_nm: String,
    pub flr_nm: Option<String>,
    pub rcept_no: String,
    pub rcept_dt: String,
    pub rm: Option<String>,
}

/// `GET /api/fnlttSinglAcntAll.json` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct FinancialStatementEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub list: Vec<FinancialStatementItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinancialStatementItem {
    pub account_id: String,
    pub account_nm: String,
    pub sj_div: String,
    pub thstrm_nm: Option<String>,
    pub thstrm_amount: Option<String>,
    pub thstrm_add_amount: Option<String>,
    pub frmtrm_nm: Option<String>,
    pub frmtrm_amount: Option<String>,
    pub frmtrm_add_amount: Option<String>,
    pub bfefrmtrm_nm: Option<String>,
    pub bfefrmtrm_amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}
