// CSV/JSON exports and console previews.
//
// Two CSV paths: report files go through the `csv` crate (serde rows), and
// the flattened plan-item table keeps the panel's exact download format
// (semicolon-delimited, BOM-prefixed, free text wrapped by `quote_csv`).
use crate::types::PlanItem;
use crate::util::format_brl;
use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

const PLAN_EXPORT_HEADER: [&str; 7] = [
    "UORG",
    "Objeto",
    "Modalidade",
    "Tipo",
    "Etapa",
    "Mês",
    "Estimado",
];

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Wrap a field in quote characters, doubling any embedded quote. Applied
/// unconditionally so the output is safe regardless of delimiter, quote or
/// line-break content; `unquote_csv` inverts it exactly.
pub fn quote_csv(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 2);
    out.push('"');
    for ch in field.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

pub fn unquote_csv(field: &str) -> String {
    let inner = field
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(field);
    inner.replace("\"\"", "\"")
}

/// The flattened plan-item table the dashboard offers for download:
/// semicolon delimiter, UTF-8 BOM so spreadsheet apps pick the encoding up,
/// object text quoted.
pub fn export_plan_items(path: impl AsRef<Path>, items: &[PlanItem]) -> Result<()> {
    let mut out = String::from("\u{feff}");
    out.push_str(&PLAN_EXPORT_HEADER.join(";"));
    out.push('\n');
    for it in items {
        let row = [
            it.sub_unit.clone(),
            quote_csv(&it.object),
            it.modality.clone(),
            it.category.to_string(),
            it.stage.clone(),
            format!("{:02}", it.month),
            format!("{:.2}", it.estimated),
        ];
        out.push_str(&row.join(";"));
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(sem registros)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn plan_item_rows(items: &[PlanItem]) -> Vec<crate::types::PlanItemRow> {
    items
        .iter()
        .map(|it| crate::types::PlanItemRow {
            sub_unit: it.sub_unit.clone(),
            object: it.object.clone(),
            modality: it.modality.clone(),
            category: it.category.to_string(),
            stage: it.stage.clone(),
            month: format!("{:02}", it.month),
            estimated: format_brl(it.estimated),
        })
        .collect()
}
