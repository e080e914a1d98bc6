//! Service health command

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_rows, yes_no, FieldRow, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Componente")]
    name: String,
    #[tabled(rename = "Estado")]
    status: String,
    #[tabled(rename = "Detalle")]
    message: String,
}

pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_rows(vec![
                FieldRow::new("Estado", color_status(report.status.as_str())),
                FieldRow::new("Versión", report.version.clone()),
                FieldRow::new("Modelo cargado", yes_no(report.modelo.cargado)),
                FieldRow::new("Tipo de modelo", report.modelo.tipo.clone()),
                FieldRow::new("Dataset disponible", yes_no(report.dataset.existe)),
                FieldRow::new("Filas válidas", report.dataset.filas.to_string()),
            ]);

            let mut components: Vec<ComponentRow> = report
                .components
                .iter()
                .map(|(name, health)| ComponentRow {
                    name: name.clone(),
                    status: color_status(health.status.as_str()),
                    message: health.message.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            components.sort_by(|a, b| a.name.cmp(&b.name));

            if !components.is_empty() {
                println!();
                print_rows(components);
            }
        }
    }

    Ok(())
}
