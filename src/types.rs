use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tabled::Tabled;

// ---------------------------------------------------------------------------
// Raw shapes, exactly as the data sources emit them. Every field is optional
// and scalar fields that the sources encode inconsistently (string vs number)
// come in as `serde_json::Value`; the loader applies the defaulting schema.
// ---------------------------------------------------------------------------

/// One PCA (annual procurement plan) item as found in the demo fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanItem {
    pub id: Option<u64>,
    pub uorg: Option<String>,
    pub objeto: Option<String>,
    pub modalidade: Option<String>,
    pub tipo: Option<String>,
    pub estimado: Option<Value>,
    pub etapa: Option<String>,
    pub mes: Option<Value>,
    pub status: Option<String>,
}

/// One contract record from the compras.gov.br contracts endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawContract {
    #[serde(rename = "numeroContrato")]
    pub numero_contrato: Option<String>,
    #[serde(rename = "nomeRazaoSocialFornecedor")]
    pub nome_fornecedor: Option<String>,
    #[serde(rename = "niFornecedor")]
    pub ni_fornecedor: Option<String>,
    #[serde(rename = "objeto")]
    pub objeto: Option<String>,
    #[serde(rename = "nomeModalidadeCompra")]
    pub nome_modalidade: Option<String>,
    #[serde(rename = "codigoModalidadeCompra")]
    pub codigo_modalidade: Option<Value>,
    #[serde(rename = "valorGlobal")]
    pub valor_global: Option<Value>,
    #[serde(rename = "dataVigenciaInicial")]
    pub data_vigencia_inicial: Option<String>,
    #[serde(rename = "dataVigenciaFinal")]
    pub data_vigencia_final: Option<String>,
}

/// One point of the demo execution curve (cumulative fraction of the plan
/// executed, split by category).
#[derive(Debug, Clone, Deserialize)]
pub struct RawExecutionPoint {
    pub mes: Option<String>,
    pub licitado: Option<f64>,
    pub direto: Option<f64>,
}

// ---------------------------------------------------------------------------
// Clean records. Produced once at the boundary; the aggregator assumes these
// are fully typed and defaulted.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcurementCategory {
    /// Competitive bidding ("Licitação": pregão, concorrência, ...).
    Competitive,
    /// Direct award ("Direta": dispensa, inexigibilidade).
    Direct,
    /// Source did not say.
    Unspecified,
}

impl fmt::Display for ProcurementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcurementCategory::Competitive => write!(f, "Licitação"),
            ProcurementCategory::Direct => write!(f, "Direta"),
            ProcurementCategory::Unspecified => write!(f, "Não informado"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanItem {
    pub id: u64,
    pub sub_unit: String,
    pub object: String,
    pub modality: String,
    pub category: ProcurementCategory,
    pub estimated: f64,
    pub stage: String,
    /// Target month 1–12; 0 when the source value was absent or out of range.
    pub month: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contract {
    pub number: String,
    pub supplier: String,
    pub object: String,
    pub modality: String,
    pub global_value: f64,
    pub validity_start: Option<NaiveDate>,
    pub validity_end: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Derived summaries. Recomputed wholesale on every input change.
// ---------------------------------------------------------------------------

/// Inclusive year range used to filter and bucket time-series aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: i32,
    pub end: i32,
}

impl PeriodWindow {
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub total: f64,
    /// Category label → summed value, in first-seen order.
    pub by_category: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPlanPoint {
    pub month: String,
    pub competitive: f64,
    pub direct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub total_estimated: f64,
    pub competitive_value: f64,
    pub direct_value: f64,
    pub execution_rate: f64,
    pub estimated_savings: f64,
    pub by_modality: Vec<(String, f64)>,
    /// Fixed twelve-month axis, zero-filled.
    pub monthly: Vec<MonthlyPlanPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalityCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractSummary {
    pub count: usize,
    pub total_value: f64,
    pub largest_value: f64,
    pub mean_value: f64,
    pub top_suppliers: Vec<SupplierValue>,
    pub modality_counts: Vec<ModalityCount>,
    /// Sparse monthly series, window-filtered, chronological.
    pub monthly_series: Vec<SeriesPoint>,
    pub recent: Vec<Contract>,
}

// ---------------------------------------------------------------------------
// Console preview rows.
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PlanItemRow {
    #[serde(rename = "UORG")]
    #[tabled(rename = "UORG")]
    pub sub_unit: String,
    #[serde(rename = "Objeto")]
    #[tabled(rename = "Objeto")]
    pub object: String,
    #[serde(rename = "Modalidade")]
    #[tabled(rename = "Modalidade")]
    pub modality: String,
    #[serde(rename = "Tipo")]
    #[tabled(rename = "Tipo")]
    pub category: String,
    #[serde(rename = "Etapa")]
    #[tabled(rename = "Etapa")]
    pub stage: String,
    #[serde(rename = "Mês")]
    #[tabled(rename = "Mês")]
    pub month: String,
    #[serde(rename = "Estimado")]
    #[tabled(rename = "Estimado")]
    pub estimated: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BreakdownRow {
    #[serde(rename = "Categoria")]
    #[tabled(rename = "Categoria")]
    pub label: String,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyPlanRow {
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mes")]
    pub month: String,
    #[serde(rename = "Licitação")]
    #[tabled(rename = "Licitação")]
    pub competitive: String,
    #[serde(rename = "Direta")]
    #[tabled(rename = "Direta")]
    pub direct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SupplierRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Fornecedor")]
    #[tabled(rename = "Fornecedor")]
    pub supplier: String,
    #[serde(rename = "ValorTotal")]
    #[tabled(rename = "ValorTotal")]
    pub total_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyValueRow {
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mes")]
    pub period: String,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ModalityRow {
    #[serde(rename = "Modalidade")]
    #[tabled(rename = "Modalidade")]
    pub modality: String,
    #[serde(rename = "Qtde")]
    #[tabled(rename = "Qtde")]
    pub count: u64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RecentContractRow {
    #[serde(rename = "Contrato")]
    #[tabled(rename = "Contrato")]
    pub number: String,
    #[serde(rename = "Fornecedor")]
    #[tabled(rename = "Fornecedor")]
    pub supplier: String,
    #[serde(rename = "Objeto")]
    #[tabled(rename = "Objeto")]
    pub object: String,
    #[serde(rename = "Vigência")]
    #[tabled(rename = "Vigência")]
    pub validity: String,
    #[serde(rename = "Modalidade")]
    #[tabled(rename = "Modalidade")]
    pub modality: String,
    #[serde(rename = "ValorGlobal")]
    #[tabled(rename = "ValorGlobal")]
    pub global_value: String,
}
