//! Sales report commands.

use std::path::Path;

use chrono::{Days, NaiveDate, Utc};

use petal_gateway::models::Report;
use petal_gateway::services::ReportService;
use petal_gateway::services::reports::DEFAULT_WINDOW_DAYS;

use super::{CliError, store};

/// First day of a `days`-long window ending `today`.
fn window_start(today: NaiveDate, days: u64) -> Result<NaiveDate, CliError> {
    today
        .checked_sub_days(Days::new(days))
        .ok_or_else(|| CliError::InvalidArgument(format!("days: {days}")))
}

/// Generate a snapshot for the last `days` days.
///
/// Returns `None` when there were no orders in the window.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn generate(days: u64) -> Result<Option<Report>, CliError> {
    let today = Utc::now().date_naive();
    let start = window_start(today, days)?;
    let reports = ReportService::new(store().await?);
    Ok(reports.generate(start, today, today).await?)
}

/// Write the sales CSV for the last [`DEFAULT_WINDOW_DAYS`] days to `out`,
/// or return it when `out` is `None`.
///
/// # Errors
///
/// Returns an error if the store fails or the file cannot be written.
pub async fn export(out: Option<&Path>) -> Result<Option<String>, CliError> {
    let today = Utc::now().date_naive();
    let reports = ReportService::new(store().await?);
    let csv = reports.export_csv(today).await?;

    match out {
        Some(path) => {
            tokio::fs::write(path, csv).await?;
            tracing::info!(path = %path.display(), days = DEFAULT_WINDOW_DAYS, "Sales CSV written");
            Ok(None)
        }
        None => Ok(Some(csv)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_window_start() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            window_start(today, 30).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 30).unwrap()
        );
        assert_eq!(window_start(today, 0).unwrap(), today);
    }
}
