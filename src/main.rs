// Entry point and high-level panel flow.
//
// The binary mirrors the two dashboards it replaces:
// - Option [1] loads data, either the embedded demo plan (Demo mode) or the
//   compras.gov.br contracts API (Live mode), printing diagnostics.
// - Option [2] aggregates the loaded records, previews the tables on the
//   console and exports CSV/JSON artifacts.
// - Option [3] switches the data mode and persists the settings file.
mod aggregate;
mod client;
mod demo;
mod export;
mod loader;
mod settings;
mod types;
mod util;

use anyhow::Result;
use client::PncpClient;
use once_cell::sync::Lazy;
use settings::{DataMode, Settings, SETTINGS_FILE};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::{
    BreakdownRow, Contract, ModalityRow, MonthlyPlanRow, MonthlyValueRow, PlanItem,
    RecentContractRow, SupplierRow,
};

// In-memory app state: load once, generate reports as often as wanted in a
// single run. A failed live fetch leaves the previous data in place.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        plan_items: None,
        contracts: None,
        settings: settings::load(SETTINGS_FILE),
    })
});

struct AppState {
    plan_items: Option<Vec<PlanItem>>,
    contracts: Option<Vec<Contract>>,
    settings: Settings,
}

/// Read a single line of input after printing the common prompt.
fn read_choice(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn prompt_back_to_menu() -> bool {
    loop {
        match read_choice("Voltar ao menu (S/N): ").to_uppercase().as_str() {
            "S" => return true,
            "N" => return false,
            _ => println!("Opção inválida. Digite S ou N."),
        }
    }
}

fn current_settings() -> Settings {
    APP_STATE.lock().unwrap().settings.clone()
}

/// Option [1]: load data according to the configured mode.
async fn handle_load() {
    let settings = current_settings();
    match settings.data_mode {
        DataMode::Demo => handle_load_demo(),
        DataMode::Live => handle_load_live(&settings).await,
    }
}

fn handle_load_demo() {
    let raw = match demo::plan_items() {
        Ok(raw) => raw,
        Err(e) => {
            error!(error = %e, "demo fixture failed to decode");
            eprintln!("Falha ao carregar dados de demonstração: {}\n", e);
            return;
        }
    };
    let (items, report) = loader::normalize_plan_items(&raw);
    println!(
        "Dados DEMO carregados: {} itens do PCA ({} campos normalizados).\n",
        util::format_int(report.total as i64),
        util::format_int((report.defaulted_values + report.defaulted_labels) as i64)
    );
    let mut state = APP_STATE.lock().unwrap();
    state.plan_items = Some(items);
}

async fn handle_load_live(settings: &Settings) {
    let client = match PncpClient::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Falha ao criar cliente HTTP: {}\n", e);
            return;
        }
    };

    if let Ok(Some(uasg)) = client.fetch_uasg(&settings.uasg).await {
        if let Some(name) = uasg.name {
            println!("UASG {} · {}", settings.uasg, name);
        }
    }

    let agency = match client.fetch_agency(&settings.cnpj).await {
        Ok(Some(agency)) => agency,
        Ok(None) => {
            eprintln!("Órgão não encontrado para o CNPJ {}.\n", settings.cnpj);
            return;
        }
        Err(e) => {
            eprintln!("Falha ao consultar o órgão: {}\n", e);
            return;
        }
    };
    let Some(code) = agency.code_string() else {
        eprintln!("Resposta do órgão sem codigoOrgao.\n");
        return;
    };
    if let Some(name) = &agency.name {
        println!("Órgão: {} (código {})", name, code);
    }

    let window = settings.window();
    info!(code = %code, start = window.start, end = window.end, "fetching contracts");
    let outcome = client.fetch_contracts_window(&code, window).await;
    let (contracts, report) = loader::normalize_contracts(&outcome.records);
    if let Some(e) = outcome.error {
        // Partial results stay on screen next to the error notice.
        eprintln!("Falha ao obter dados: {}. Resultados parciais mantidos.", e);
    }
    println!(
        "Contratos carregados: {} ({} campos normalizados, {} datas inválidas).\n",
        util::format_int(report.total as i64),
        util::format_int((report.defaulted_values + report.defaulted_labels) as i64),
        util::format_int(report.invalid_dates as i64)
    );
    if !contracts.is_empty() {
        let mut state = APP_STATE.lock().unwrap();
        state.contracts = Some(contracts);
    }
}

fn brl_breakdown_rows(groups: &[(String, f64)]) -> Vec<BreakdownRow> {
    groups
        .iter()
        .map(|(label, value)| BreakdownRow {
            label: label.clone(),
            value: util::format_brl(*value),
        })
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…", head)
    }
}

fn recent_contract_rows(contracts: &[Contract]) -> Vec<RecentContractRow> {
    let fmt_date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "—".to_string())
    };
    contracts
        .iter()
        .map(|c| RecentContractRow {
            number: c.number.clone(),
            supplier: c.supplier.clone(),
            object: truncate_chars(&c.object, 60),
            validity: format!("{} – {}", fmt_date(c.validity_start), fmt_date(c.validity_end)),
            modality: c.modality.clone(),
            global_value: util::format_brl(c.global_value),
        })
        .collect()
}

fn generate_plan_reports(items: &[PlanItem], curve_preview: bool) {
    let summary = aggregate::plan_summary(items);
    println!("Resumo do PCA");
    println!("  Valor estimado total: {}", util::format_brl(summary.total_estimated));
    println!("  Licitado:             {}", util::format_brl(summary.competitive_value));
    println!("  Contratação direta:   {}", util::format_brl(summary.direct_value));
    println!("  Execução do PCA:      {:.0}%", summary.execution_rate * 100.0);
    println!(
        "  Economia estimada:    {}\n",
        util::format_brl(summary.estimated_savings)
    );

    println!("Distribuição por modalidade:");
    export::preview_table_rows(&brl_breakdown_rows(&summary.by_modality), 8);

    println!("Planejado por mês e tipo:");
    let monthly_rows: Vec<MonthlyPlanRow> = summary
        .monthly
        .iter()
        .map(|p| MonthlyPlanRow {
            month: p.month.clone(),
            competitive: util::format_brl(p.competitive),
            direct: util::format_brl(p.direct),
        })
        .collect();
    export::preview_table_rows(&monthly_rows, 12);

    if curve_preview {
        if let Ok(curve) = demo::execution_curve() {
            println!("Execução acumulada ao longo do ano:");
            let exec_rows: Vec<MonthlyValueRow> = aggregate::execution_series(&curve)
                .into_iter()
                .map(|p| MonthlyValueRow {
                    period: p.period,
                    value: format!("{:.0}%", p.value * 100.0),
                })
                .collect();
            export::preview_table_rows(&exec_rows, 12);
        }
    }

    let query = read_choice("Filtro de busca para a tabela (enter para todos): ");
    let filtered = aggregate::filter_plan_items(items, &query);
    println!("Itens do PCA ({} registro(s)):", filtered.len());
    export::preview_table_rows(&export::plan_item_rows(&filtered), 6);

    if let Err(e) = export::write_json("pca_summary.json", &summary) {
        eprintln!("Erro ao gravar: {}", e);
    }
    if let Err(e) = export::export_plan_items("pca_itens.csv", &filtered) {
        eprintln!("Erro ao gravar: {}", e);
    }
    if let Err(e) = export::write_csv("pca_modalidades.csv", &brl_breakdown_rows(&summary.by_modality)) {
        eprintln!("Erro ao gravar: {}", e);
    }
    println!("(Exportado: pca_summary.json, pca_itens.csv, pca_modalidades.csv)\n");
}

fn generate_contract_reports(contracts: &[Contract], settings: &Settings) {
    let summary = aggregate::contract_summary(contracts, settings.window());
    let period = if settings.year_start == settings.year_end {
        settings.year_start.to_string()
    } else {
        format!("{}–{}", settings.year_start, settings.year_end)
    };
    println!("Resumo de contratos ({})", period);
    println!("  Contratos:     {}", util::format_int(summary.count as i64));
    println!("  Valor global:  {}", util::format_brl(summary.total_value));
    println!("  Maior contrato: {}", util::format_brl(summary.largest_value));
    println!("  Ticket médio:  {}\n", util::format_brl(summary.mean_value));

    println!("Top fornecedores por valor:");
    let supplier_rows: Vec<SupplierRow> = summary
        .top_suppliers
        .iter()
        .enumerate()
        .map(|(i, s)| SupplierRow {
            rank: i + 1,
            supplier: s.name.clone(),
            total_value: util::format_brl(s.value),
        })
        .collect();
    export::preview_table_rows(&supplier_rows, 8);

    println!("Modalidades (quantidade):");
    let modality_rows: Vec<ModalityRow> = summary
        .modality_counts
        .iter()
        .map(|m| ModalityRow {
            modality: m.name.clone(),
            count: m.count,
        })
        .collect();
    export::preview_table_rows(&modality_rows, 8);

    println!("Valor contratado por mês (vigência inicial):");
    let monthly_rows: Vec<MonthlyValueRow> = summary
        .monthly_series
        .iter()
        .map(|p| MonthlyValueRow {
            period: p.period.clone(),
            value: util::format_brl(p.value),
        })
        .collect();
    export::preview_table_rows(&monthly_rows, 12);

    println!("Contratos mais recentes:");
    export::preview_table_rows(&recent_contract_rows(&summary.recent), 5);

    if let Err(e) = export::write_json("contratos_summary.json", &summary) {
        eprintln!("Erro ao gravar: {}", e);
    }
    if let Err(e) = export::write_csv("contratos_top_fornecedores.csv", &supplier_rows) {
        eprintln!("Erro ao gravar: {}", e);
    }
    if let Err(e) = export::write_csv("contratos_serie_mensal.csv", &monthly_rows) {
        eprintln!("Erro ao gravar: {}", e);
    }
    println!(
        "(Exportado: contratos_summary.json, contratos_top_fornecedores.csv, contratos_serie_mensal.csv)\n"
    );
}

/// Option [2]: aggregate whatever is loaded and emit previews + exports.
fn handle_generate_reports() {
    let (plan_items, contracts, settings) = {
        let state = APP_STATE.lock().unwrap();
        (
            state.plan_items.clone(),
            state.contracts.clone(),
            state.settings.clone(),
        )
    };
    if plan_items.is_none() && contracts.is_none() {
        println!("Nenhum dado carregado. Use a opção 1 primeiro.\n");
        return;
    }
    if let Some(items) = plan_items {
        generate_plan_reports(&items, settings.data_mode == DataMode::Demo);
    }
    if let Some(contracts) = contracts {
        generate_contract_reports(&contracts, &settings);
    }
}

/// Option [3]: toggle Demo/Live and persist the settings file.
fn handle_toggle_mode() {
    let mut state = APP_STATE.lock().unwrap();
    state.settings.data_mode = match state.settings.data_mode {
        DataMode::Demo => DataMode::Live,
        DataMode::Live => DataMode::Demo,
    };
    println!("Modo de dados: {:?}\n", state.settings.data_mode);
    if let Err(e) = settings::save(SETTINGS_FILE, &state.settings) {
        eprintln!("Erro ao salvar configurações: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    loop {
        let settings = current_settings();
        println!("Painel de Contratações — UASG {}", settings.uasg);
        println!("[1] Carregar dados ({:?})", settings.data_mode);
        println!("[2] Gerar relatórios");
        println!("[3] Alternar modo Demo/Live\n");
        match read_choice("Escolha: ").as_str() {
            "1" => handle_load().await,
            "2" => {
                println!();
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Encerrando.");
                    break;
                }
            }
            "3" => handle_toggle_mode(),
            _ => println!("Opção inválida. Digite 1, 2 ou 3.\n"),
        }
    }
    Ok(())
}
