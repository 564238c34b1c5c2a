use std::time::Duration;

use serde::Deserialize;

use crate::models::shipment::LabelTypeHint;

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    /// Base URL of the warehouse REST backend (e.g., "https://api.example.com/v1")
    pub api_base_url: String,

    /// Bearer token for the backend API, if the deployment requires one
    #[serde(default)]
    pub api_token: Option<String>,

    /// Store the pack queue is scoped to
    pub store_id: String,

    /// Operator claiming orders from the shared queue
    pub operator_id: String,

    /// Local print bridge WebSocket URL
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Logical name of the label printer known to the bridge
    #[serde(default)]
    pub label_printer: Option<String>,

    /// Network address of the label printer, for raw socket printing
    #[serde(default)]
    pub label_printer_ip: Option<String>,

    /// Port for raw network printing (ZPL over TCP)
    #[serde(default = "default_label_printer_port")]
    pub label_printer_port: u16,

    /// Printer-name substring that selects document (full-page) handling
    /// instead of thermal-label handling. A name heuristic, not a
    /// capability query.
    #[serde(default = "default_doc_printer_hint")]
    pub doc_printer_hint: String,

    /// Lease renewal cadence in seconds
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Timeout for correlated print-bridge calls, in milliseconds
    #[serde(default = "default_bridge_timeout_ms")]
    pub bridge_timeout_ms: u64,
}

fn default_bridge_url() -> String {
    "ws://127.0.0.1:6441".to_string()
}

fn default_label_printer_port() -> u16 {
    9100
}

fn default_doc_printer_hint() -> String {
    "epson".to_string()
}

fn default_heartbeat_secs() -> u64 {
    60
}

fn default_bridge_timeout_ms() -> u64 {
    15_000
}

impl StationConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms)
    }

    /// Label format hint sent with the label request. If the configured
    /// printer name contains `doc_printer_hint` (case-insensitive) the
    /// backend is asked for full-page documents, otherwise for thermal
    /// label markup.
    pub fn label_type_hint(&self) -> LabelTypeHint {
        let name = self.label_printer.as_deref().unwrap_or("").to_lowercase();
        if !name.is_empty() && name.contains(&self.doc_printer_hint.to_lowercase()) {
            LabelTypeHint::NormalPrinter
        } else {
            LabelTypeHint::LabelPrinter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> StationConfig {
        StationConfig {
            api_base_url: "http://localhost:3000".into(),
            api_token: None,
            store_id: "store-1".into(),
            operator_id: "op-1".into(),
            bridge_url: default_bridge_url(),
            label_printer: None,
            label_printer_ip: None,
            label_printer_port: default_label_printer_port(),
            doc_printer_hint: default_doc_printer_hint(),
            heartbeat_secs: default_heartbeat_secs(),
            bridge_timeout_ms: default_bridge_timeout_ms(),
        }
    }

    #[test]
    fn hint_defaults_to_label_printer() {
        let config = base_config();
        assert_eq!(config.label_type_hint(), LabelTypeHint::LabelPrinter);
    }

    #[test]
    fn office_printer_name_selects_document_handling() {
        let mut config = base_config();
        config.label_printer = Some("EPSON WF-3820".into());
        assert_eq!(config.label_type_hint(), LabelTypeHint::NormalPrinter);

        config.label_printer = Some("Zebra ZD420".into());
        assert_eq!(config.label_type_hint(), LabelTypeHint::LabelPrinter);
    }
}
