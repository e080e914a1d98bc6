//! Prediction command

use anyhow::Result;
use grade_core::FeatureVector;

use crate::client::ApiClient;
use crate::output::{color_level, format_grade, print_json, print_rows, FieldRow, OutputFormat};

/// Request a third-term grade prediction for one student
pub async fn predict(client: &ApiClient, features: FeatureVector, format: OutputFormat) -> Result<()> {
    let result = client.predict(&features).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_rows(vec![
                FieldRow::new("Nota estimada", format_grade(result.nota_estimada)),
                FieldRow::new("Clasificación", color_level(result.clasificacion.as_str())),
                FieldRow::new("Confianza", color_level(result.nivel_confianza.as_str())),
                FieldRow::new("Desviación entre árboles", format_grade(result.confianza_valor)),
            ]);
            println!("\n{}", result.mensaje);
        }
    }

    Ok(())
}
