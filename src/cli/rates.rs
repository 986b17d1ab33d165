//! Read side: latest rate and rate history for a currency.

use super::ui;
use crate::core::rate::is_currency_code;
use crate::core::{Rate, RateStore, StoreError};
use anyhow::{Context, Result, bail};
use comfy_table::{Cell, CellAlignment};

fn normalize_code(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if !is_currency_code(&code) {
        bail!("'{code}' is not a 3-letter currency code");
    }
    Ok(code)
}

fn rates_table(rates: &[Rate]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Value"),
        ui::header_cell("Published"),
    ]);
    for rate in rates {
        table.add_row(vec![
            Cell::new(&rate.code),
            Cell::new(&rate.value).set_alignment(CellAlignment::Right),
            Cell::new(rate.published_at.to_rfc2822()),
        ]);
    }
    table.to_string()
}

fn not_found_output(code: &str, json: bool) -> String {
    if json {
        "null".to_string()
    } else {
        ui::style_text(&format!("No rates stored for {code}"), ui::StyleType::Subtle)
    }
}

/// Renders the most recent rate for `code`. A currency without stored rates renders as
/// an absence message rather than an error; backend faults are errors.
pub async fn latest_output(store: &dyn RateStore, code: &str, json: bool) -> Result<String> {
    let code = normalize_code(code)?;
    match store.get_latest(&code).await {
        Ok(rate) if json => Ok(serde_json::to_string_pretty(&rate)?),
        Ok(rate) => Ok(rates_table(std::slice::from_ref(&rate))),
        Err(StoreError::NotFound { .. }) => Ok(not_found_output(&code, json)),
        Err(e) => Err(e).with_context(|| format!("Failed to read latest rate for {code}")),
    }
}

/// Renders every stored rate for `code`, oldest first.
pub async fn history_output(store: &dyn RateStore, code: &str, json: bool) -> Result<String> {
    let code = normalize_code(code)?;
    match store.get_all(&code).await {
        Ok(rates) if json => Ok(serde_json::to_string_pretty(&rates)?),
        Ok(rates) => Ok(format!(
            "{}\n\n{}",
            ui::style_text(&format!("History for {code}"), ui::StyleType::Title),
            rates_table(&rates)
        )),
        Err(StoreError::NotFound { .. }) => Ok(not_found_output(&code, json)),
        Err(e) => Err(e).with_context(|| format!("Failed to read rate history for {code}")),
    }
}
