// Boundary normalization.
//
// Raw records arrive loosely typed (optional fields, string/number mixes).
// Everything is defaulted here, once, so the aggregator only ever sees fully
// typed records. Malformed fields degrade to zero/"unspecified" defaults;
// no record is ever dropped.
use crate::types::{Contract, PlanItem, ProcurementCategory, RawContract, RawPlanItem};
use crate::util::{json_f64, json_string, json_u32, parse_date_flex};
use tracing::debug;

pub const UNKNOWN_SUPPLIER: &str = "(sem fornecedor)";
pub const UNSPECIFIED_LABEL: &str = "Não informado";

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total: usize,
    /// Value fields that were missing or non-numeric and became 0.0.
    pub defaulted_values: usize,
    /// Label fields that were missing/blank and got a reserved default.
    pub defaulted_labels: usize,
    /// Date fields that could not be parsed.
    pub invalid_dates: usize,
}

fn clean_label(s: Option<&str>, default: &str, report: &mut LoadReport) -> String {
    match s.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            report.defaulted_labels += 1;
            default.to_string()
        }
    }
}

fn parse_category(tipo: Option<&str>) -> ProcurementCategory {
    match tipo.map(str::trim) {
        Some("Licitacao") | Some("Licitação") => ProcurementCategory::Competitive,
        Some("Direta") => ProcurementCategory::Direct,
        _ => ProcurementCategory::Unspecified,
    }
}

pub fn normalize_plan_items(raw: &[RawPlanItem]) -> (Vec<PlanItem>, LoadReport) {
    let mut report = LoadReport {
        total: raw.len(),
        ..LoadReport::default()
    };
    let items = raw
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let estimated = match json_f64(r.estimado.as_ref()) {
                Some(v) if v >= 0.0 => v,
                _ => {
                    report.defaulted_values += 1;
                    0.0
                }
            };
            // Out-of-range target months become 0: the item still counts in
            // the totals but does not land in any month bucket.
            let month = match json_u32(r.mes.as_ref()) {
                Some(m) if (1..=12).contains(&m) => m,
                _ => 0,
            };
            PlanItem {
                id: r.id.unwrap_or(i as u64 + 1),
                sub_unit: clean_label(r.uorg.as_deref(), UNSPECIFIED_LABEL, &mut report),
                object: clean_label(r.objeto.as_deref(), UNSPECIFIED_LABEL, &mut report),
                modality: clean_label(r.modalidade.as_deref(), UNSPECIFIED_LABEL, &mut report),
                category: parse_category(r.tipo.as_deref()),
                estimated,
                stage: clean_label(r.etapa.as_deref(), UNSPECIFIED_LABEL, &mut report),
                month,
                status: clean_label(r.status.as_deref(), UNSPECIFIED_LABEL, &mut report),
            }
        })
        .collect();
    debug!(
        total = report.total,
        defaulted_values = report.defaulted_values,
        defaulted_labels = report.defaulted_labels,
        "normalized plan items"
    );
    (items, report)
}

pub fn normalize_contracts(raw: &[RawContract]) -> (Vec<Contract>, LoadReport) {
    let mut report = LoadReport {
        total: raw.len(),
        ..LoadReport::default()
    };
    let contracts = raw
        .iter()
        .map(|r| {
            let global_value = match json_f64(r.valor_global.as_ref()) {
                Some(v) if v >= 0.0 => v,
                _ => {
                    report.defaulted_values += 1;
                    0.0
                }
            };
            // Supplier falls back to the tax id, mirroring the panel's
            // `nomeRazaoSocialFornecedor || niFornecedor` chain.
            let supplier = r
                .nome_fornecedor
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    r.ni_fornecedor
                        .as_deref()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                })
                .map(str::to_string)
                .unwrap_or_else(|| {
                    report.defaulted_labels += 1;
                    UNKNOWN_SUPPLIER.to_string()
                });
            let modality = r
                .nome_modalidade
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| json_string(r.codigo_modalidade.as_ref()))
                .unwrap_or_else(|| {
                    report.defaulted_labels += 1;
                    UNSPECIFIED_LABEL.to_string()
                });
            let validity_start = parse_date_flex(r.data_vigencia_inicial.as_deref());
            if validity_start.is_none() && r.data_vigencia_inicial.is_some() {
                report.invalid_dates += 1;
            }
            let validity_end = parse_date_flex(r.data_vigencia_final.as_deref());
            if validity_end.is_none() && r.data_vigencia_final.is_some() {
                report.invalid_dates += 1;
            }
            Contract {
                number: clean_label(r.numero_contrato.as_deref(), "—", &mut report),
                supplier,
                object: clean_label(r.objeto.as_deref(), UNSPECIFIED_LABEL, &mut report),
                modality,
                global_value,
                validity_start,
                validity_end,
            }
        })
        .collect();
    debug!(
        total = report.total,
        defaulted_values = report.defaulted_values,
        invalid_dates = report.invalid_dates,
        "normalized contracts"
    );
    (contracts, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_contract(value: serde_json::Value) -> RawContract {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn malformed_fields_degrade_without_error() {
        let raw: Vec<RawPlanItem> = serde_json::from_value(json!([
            {
                "id": 1,
                "uorg": "  ",
                "objeto": "Serviços de limpeza",
                "modalidade": "Pregão",
                "tipo": "Licitacao",
                "estimado": "not-a-number",
                "etapa": "ETP",
                "mes": 13,
                "status": null
            }
        ]))
        .unwrap();
        let (items, report) = normalize_plan_items(&raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].estimated, 0.0);
        assert_eq!(items[0].month, 0);
        assert_eq!(items[0].sub_unit, UNSPECIFIED_LABEL);
        assert_eq!(items[0].status, UNSPECIFIED_LABEL);
        assert_eq!(report.defaulted_values, 1);
        assert!(report.defaulted_labels >= 2);
    }

    #[test]
    fn string_encoded_values_are_accepted() {
        let raw: Vec<RawPlanItem> = serde_json::from_value(json!([
            { "estimado": "320000.00", "mes": "2", "tipo": "Direta" }
        ]))
        .unwrap();
        let (items, report) = normalize_plan_items(&raw);
        assert_eq!(items[0].estimated, 320000.0);
        assert_eq!(items[0].month, 2);
        assert_eq!(items[0].category, ProcurementCategory::Direct);
        assert_eq!(report.defaulted_values, 0);
    }

    #[test]
    fn supplier_falls_back_to_tax_id_then_placeholder() {
        let with_ni = raw_contract(json!({ "niFornecedor": "12345678000100" }));
        let bare = raw_contract(json!({}));
        let (contracts, _) = normalize_contracts(&[with_ni, bare]);
        assert_eq!(contracts[0].supplier, "12345678000100");
        assert_eq!(contracts[1].supplier, UNKNOWN_SUPPLIER);
    }

    #[test]
    fn modality_falls_back_to_numeric_code() {
        let raw = raw_contract(json!({ "codigoModalidadeCompra": 5 }));
        let (contracts, _) = normalize_contracts(&[raw]);
        assert_eq!(contracts[0].modality, "5");
    }

    #[test]
    fn contract_dates_and_values_are_lenient() {
        let raw = raw_contract(json!({
            "numeroContrato": "12/2024",
            "valorGlobal": "1,500.00",
            "dataVigenciaInicial": "2024-02-01T00:00:00",
            "dataVigenciaFinal": "bogus"
        }));
        let (contracts, report) = normalize_contracts(&[raw]);
        assert_eq!(contracts[0].global_value, 1500.0);
        assert!(contracts[0].validity_start.is_some());
        assert!(contracts[0].validity_end.is_none());
        assert_eq!(report.invalid_dates, 1);
    }
}
