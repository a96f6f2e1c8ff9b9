// Embedded demo fixture: the offline dataset the panel ships with, decoded
// through the same raw-struct path as live data.
use crate::types::{RawExecutionPoint, RawPlanItem};
use anyhow::{Context, Result};

static PLAN_ITEMS_JSON: &str = r#"[
  {
    "id": 1,
    "uorg": "DCL/PROPLAD",
    "objeto": "Serviços de manutenção predial e infraestrutura",
    "modalidade": "Pregão",
    "tipo": "Licitacao",
    "estimado": 1250000.0,
    "etapa": "ETP",
    "mes": 1,
    "status": "Em planejamento"
  },
  {
    "id": 2,
    "uorg": "TI/PROPLAD",
    "objeto": "Licenças de software corporativo",
    "modalidade": "Dispensa",
    "tipo": "Direta",
    "estimado": 320000.0,
    "etapa": "TR",
    "mes": 2,
    "status": "Em planejamento"
  },
  {
    "id": 3,
    "uorg": "PROAD",
    "objeto": "Material de consumo laboratorial",
    "modalidade": "Pregão",
    "tipo": "Licitacao",
    "estimado": 480000.0,
    "etapa": "Edital",
    "mes": 3,
    "status": "Publicado"
  },
  {
    "id": 4,
    "uorg": "PROPLAD",
    "objeto": "Serviços de limpeza e conservação",
    "modalidade": "Pregão",
    "tipo": "Licitacao",
    "estimado": 2800000.0,
    "etapa": "Julgamento",
    "mes": 4,
    "status": "Julgamento"
  },
  {
    "id": 5,
    "uorg": "PROPLAN",
    "objeto": "Aquisição de equipamentos de TI",
    "modalidade": "Dispensa",
    "tipo": "Direta",
    "estimado": 700000.0,
    "etapa": "Contratação",
    "mes": 5,
    "status": "Contrato assinado"
  },
  {
    "id": 6,
    "uorg": "PROGESP",
    "objeto": "Serviços de vigilância",
    "modalidade": "Pregão",
    "tipo": "Licitacao",
    "estimado": 3100000.0,
    "etapa": "Homologação",
    "mes": 6,
    "status": "Homologado"
  }
]"#;

static EXECUTION_CURVE_JSON: &str = r#"[
  { "mes": "Jan", "licitado": 0.15, "direto": 0.05 },
  { "mes": "Fev", "licitado": 0.19, "direto": 0.08 },
  { "mes": "Mar", "licitado": 0.27, "direto": 0.09 },
  { "mes": "Abr", "licitado": 0.41, "direto": 0.11 },
  { "mes": "Mai", "licitado": 0.55, "direto": 0.18 },
  { "mes": "Jun", "licitado": 0.68, "direto": 0.21 },
  { "mes": "Jul", "licitado": 0.74, "direto": 0.25 },
  { "mes": "Ago", "licitado": 0.80, "direto": 0.28 }
]"#;

pub fn plan_items() -> Result<Vec<RawPlanItem>> {
    serde_json::from_str(PLAN_ITEMS_JSON).context("fixture de itens do PCA inválida")
}

pub fn execution_curve() -> Result<Vec<RawExecutionPoint>> {
    serde_json::from_str(EXECUTION_CURVE_JSON).context("fixture de execução inválida")
}
