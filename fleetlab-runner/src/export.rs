//! CSV export of signal events for offline analysis.
//!
//! One row per signal event, flat columns, stable ordering — the shape
//! spreadsheet and notebook tooling expects.

use std::path::{Path, PathBuf};

use fleetlab_core::domain::SignalEvent;

/// Errors from CSV export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error writing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Write signal events as CSV. Returns the written path.
pub fn export_signals_csv(dir: &Path, agent: &str, signals: &[SignalEvent]) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{agent}_signals.csv"));
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut writer = csv::Writer::from_path(&path).map_err(|source| ExportError::Csv {
        path: path.display().to_string(),
        source,
    })?;

    let csv_err = |source| ExportError::Csv {
        path: path.display().to_string(),
        source,
    };

    writer
        .write_record([
            "agent",
            "ts",
            "symbol",
            "market_type",
            "severity",
            "confidence",
            "title",
        ])
        .map_err(csv_err)?;

    for signal in signals {
        writer
            .write_record([
                signal.agent.as_str(),
                &signal.ts.to_string(),
                signal.symbol.as_deref().unwrap_or(""),
                signal.market_type.as_deref().unwrap_or(""),
                signal.severity.as_str(),
                &format!("{:.4}", signal.confidence),
                signal.title.as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fleetlab_core::domain::{Finding, Severity};
    use tempfile::TempDir;

    #[test]
    fn exports_header_and_rows() {
        let tmp = TempDir::new().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let signals = vec![
            SignalEvent::from_finding(
                "momo",
                day,
                Finding::new(Severity::High, 0.82, "breakout").with_symbol("SPY"),
            ),
            SignalEvent::from_finding("momo", day, Finding::new(Severity::Low, 0.3, "quiet")),
        ];

        let path = export_signals_csv(tmp.path(), "momo", &signals).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "agent,ts,symbol,market_type,severity,confidence,title"
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("momo,2024-03-04,SPY,"));
        assert!(first.contains("high"));
        assert!(first.contains("0.8200"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn empty_signal_list_writes_header_only() {
        let tmp = TempDir::new().unwrap();
        let path = export_signals_csv(tmp.path(), "quiet", &[]).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
