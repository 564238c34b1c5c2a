//! Interactive pack station runtime
//!
//! Wires the claim session, scan decoder, pick state and print
//! orchestrator together and drives them from the station's keyboard
//! stream (where the barcode scanner also types). Operator commands are
//! scanned or typed codes starting with `:`.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncReadExt;

use crate::config::StationConfig;
use crate::models::order::ClaimedOrder;
use crate::models::shipment::{BoxQuantities, BoxSize};
use crate::pick::{PickState, ScanOutcome};
use crate::scan::{Key, KeyOutcome, ScanDecoder};
use crate::services::bridge::PrintBridge;
use crate::services::claim::PackQueueClient;
use crate::services::printing::{BridgePrinter, PrintOrchestrator};
use crate::services::session::PackSession;
use crate::services::shipping::{ShippingApi, ShippingClient};

/// The order currently on the bench.
struct ActiveOrder {
    order: ClaimedOrder,
    pick: PickState,
    boxes: BoxQuantities,
}

/// What the input loop is collecting right now.
enum Mode {
    /// Keystrokes feed the scan decoder.
    Picking,
    /// A confirmation prompt is up; keystrokes build a yes/no answer and
    /// the decoder is paused.
    Confirming { answer: String },
}

pub struct Station {
    config: StationConfig,
    bridge: Arc<PrintBridge>,
    shipping: Arc<ShippingClient>,
    session: PackSession,
    decoder: ScanDecoder,
    active: Option<ActiveOrder>,
    mode: Mode,
    /// Document printer resolved from the bridge's printer list by name
    /// hint; PDFs fall back to the bridge default when none matched.
    doc_printer: Option<String>,
}

impl Station {
    pub fn new(config: StationConfig) -> Self {
        let queue = Arc::new(PackQueueClient::new(
            &config.api_base_url,
            &config.store_id,
            config.api_token.clone(),
        ));
        let shipping = Arc::new(ShippingClient::new(
            &config.api_base_url,
            &config.store_id,
            config.api_token.clone(),
        ));
        let bridge = Arc::new(PrintBridge::new(&config.bridge_url, config.bridge_timeout()));
        let session = PackSession::new(queue, &config.operator_id, config.heartbeat_interval());

        Self {
            config,
            bridge,
            shipping,
            session,
            decoder: ScanDecoder::new(),
            active: None,
            mode: Mode::Picking,
            doc_printer: None,
        }
    }

    /// Run the station until the operator quits or stdin closes.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.resolve_printer().await;
        self.claim_and_load().await;

        let mut stdin = tokio::io::stdin();
        loop {
            let byte = match stdin.read_u8().await {
                Ok(b) => b,
                Err(_) => break, // stdin closed
            };

            if matches!(self.mode, Mode::Confirming { .. }) {
                if byte == b'\n' || byte == b'\r' {
                    let answer = match std::mem::replace(&mut self.mode, Mode::Picking) {
                        Mode::Confirming { answer } => answer,
                        Mode::Picking => String::new(),
                    };
                    let yes = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
                    self.finish_confirmation(yes).await;
                } else if byte.is_ascii() && !byte.is_ascii_control() {
                    if let Mode::Confirming { answer } = &mut self.mode {
                        answer.push(byte as char);
                    }
                }
            } else {
                let key = match byte {
                    b'\n' | b'\r' => Key::Enter,
                    b'\t' => Key::Tab,
                    0x20..=0x7e => Key::Char(byte as char),
                    _ => Key::Other,
                };
                if let KeyOutcome::Finished(Some(code)) =
                    self.decoder.on_key(key, Instant::now())
                {
                    if let Some(command) = code.strip_prefix(':') {
                        let command = command.to_string();
                        if !self.handle_command(&command).await {
                            break;
                        }
                    } else {
                        self.handle_scan(&code);
                    }
                }
            }
        }
        Ok(())
    }

    /// Best-effort lease release for shutdown paths.
    pub fn teardown(&mut self) {
        self.session.release_on_teardown();
    }

    /// Check the bridge and adopt the first listed printer when none is
    /// configured.
    async fn resolve_printer(&mut self) {
        if !self.bridge.check_status().await {
            println!("Print bridge not reachable on this machine.");
            return;
        }
        match self.bridge.list_printers().await {
            Ok(printers) if printers.is_empty() => {
                println!("No printers detected on this machine.");
            }
            Ok(printers) => {
                if self.config.label_printer.is_none() {
                    tracing::info!(printer = %printers[0], "no printer configured, using first detected");
                    self.config.label_printer = Some(printers[0].clone());
                }
                let hint = self.config.doc_printer_hint.to_lowercase();
                self.doc_printer = printers
                    .iter()
                    .find(|p| p.to_lowercase().contains(&hint))
                    .cloned();
                if let Some(doc) = &self.doc_printer {
                    tracing::info!(printer = %doc, "document printer resolved");
                }
                println!(
                    "Printers detected: {} (using: {})",
                    printers.join(", "),
                    self.config.label_printer.as_deref().unwrap_or("-")
                );
            }
            Err(e) => println!("Error listing printers: {e}"),
        }
    }

    /// Claim the next order and lay it out on the bench.
    async fn claim_and_load(&mut self) {
        self.active = None;
        match self.session.claim_next().await {
            Ok(Some(order)) => {
                let status = order.canon_status();
                if !status.is_editable() {
                    tracing::warn!(order_id = order.order_id, %status, "claimed order is not in a packable state");
                    println!("Warning: order status is '{status}', expected an unprepared order.");
                }
                let pick = PickState::new(order.pick_lines());
                let boxes = order.initial_boxes();
                println!(
                    "\n=== Order {} — {} line(s), {} unit(s) ===",
                    order.order_number.as_deref().unwrap_or("?"),
                    pick.lines().len(),
                    pick.total_ordered()
                );
                for line in pick.lines() {
                    println!(
                        "  [{}] {}  sku={} ean={}  0/{}",
                        line.location, line.title, line.reference, line.barcode, line.ordered
                    );
                }
                println!("Ship to: {}", order.address_text());
                self.active = Some(ActiveOrder { order, pick, boxes });
            }
            Ok(None) => {
                println!("No orders available right now. Type :next to ask again.");
            }
            Err(e) => {
                tracing::error!(error = %e, "claim failed");
                println!("Error claiming order: {e}");
            }
        }
    }

    fn handle_scan(&mut self, code: &str) {
        let Some(active) = self.active.as_mut() else {
            println!("No order claimed. Type :next to claim one.");
            return;
        };

        match active.pick.apply_scan(code) {
            ScanOutcome::Picked { line, order_complete } => {
                let picked = &active.pick.lines()[line];
                println!("  ✓ {}  {}/{}", picked.title, picked.picked, picked.ordered);
                if order_complete {
                    self.open_confirmation();
                }
            }
            ScanOutcome::AlreadyComplete { .. } => {
                println!("  That item is already complete on every line.");
            }
            ScanOutcome::NotFound => {
                println!("  Code not found in this order: {code}");
            }
        }
    }

    /// Pause scanning and ask the operator to confirm the pack-out.
    fn open_confirmation(&mut self) {
        let Some(active) = self.active.as_ref() else { return };
        self.decoder.pause();
        println!(
            "\nOrder {} fully picked. Boxes: S={} M={} L={} (total {}).",
            active.order.order_number.as_deref().unwrap_or("?"),
            active.boxes.small,
            active.boxes.medium,
            active.boxes.large,
            active.boxes.total()
        );
        println!("Print label(s) and ship? [y/N]");
        self.mode = Mode::Confirming { answer: String::new() };
    }

    async fn finish_confirmation(&mut self, confirmed: bool) {
        self.mode = Mode::Picking;
        self.decoder.resume();
        if confirmed {
            self.ship_active().await;
        } else {
            println!("Cancelled. Scanning resumed; type :ship to confirm again.");
        }
    }

    /// Run the label print sequence for the active order.
    async fn ship_active(&mut self) {
        let Some(active) = self.active.take() else {
            println!("No order to ship.");
            return;
        };

        let sink = Arc::new(BridgePrinter::new(
            Arc::clone(&self.bridge),
            self.config.label_printer.clone(),
            self.doc_printer.clone(),
            self.config
                .label_printer_ip
                .clone()
                .map(|ip| (ip, self.config.label_printer_port)),
        ));
        let orchestrator = PrintOrchestrator::new(
            Arc::clone(&self.shipping) as Arc<dyn ShippingApi>,
            sink,
            self.config.label_type_hint(),
        );

        println!("Creating label(s)...");
        match orchestrator
            .ship_and_complete(&active.order, &active.pick, &active.boxes, &mut self.session)
            .await
        {
            Ok(summary) => {
                println!(
                    "✓ {}/{} label(s) printed, order marked shipped.",
                    summary.printed, summary.requested
                );
                self.claim_and_load().await;
            }
            Err(e) => {
                // Keep the claim and the bench, whatever failed: the
                // session still holds the lease, so the operator must be
                // able to retype :ship or :skip the order. Dropping the
                // bench here would strand the lease until the server-side
                // timeout.
                println!("Error creating/printing label: {e}");
                self.active = Some(active);
            }
        }
    }

    /// Returns false when the station should shut down.
    async fn handle_command(&mut self, command: &str) -> bool {
        let mut parts = command.split_whitespace();
        match parts.next().unwrap_or("") {
            "quit" | "q" => {
                return false;
            }
            "next" | "n" => {
                if self.active.is_some() {
                    println!("An order is already claimed; :skip it first.");
                } else {
                    self.claim_and_load().await;
                }
            }
            "skip" | "s" => {
                if self.active.take().is_some() {
                    self.session.skip().await;
                    self.claim_and_load().await;
                } else {
                    println!("No order to skip.");
                }
            }
            "ship" => {
                let ready = self.active.as_ref().map(|a| a.pick.is_complete());
                match ready {
                    Some(true) => self.open_confirmation(),
                    Some(false) => println!("Order is not fully picked yet."),
                    None => println!("No order claimed."),
                }
            }
            "boxes" | "b" => {
                let values: Vec<f64> = parts.filter_map(|p| p.parse().ok()).collect();
                match (self.active.as_mut(), values.as_slice()) {
                    (Some(active), [s, m, l]) => {
                        active.boxes.set(BoxSize::S, *s);
                        active.boxes.set(BoxSize::M, *m);
                        active.boxes.set(BoxSize::L, *l);
                        println!(
                            "Boxes: S={} M={} L={}",
                            active.boxes.small, active.boxes.medium, active.boxes.large
                        );
                    }
                    (Some(_), _) => println!("Usage: :boxes <S> <M> <L>"),
                    (None, _) => println!("No order claimed."),
                }
            }
            "printers" | "p" => {
                self.resolve_printer().await;
            }
            other => {
                println!("Unknown command :{other} (try :next :skip :ship :boxes :printers :quit)");
            }
        }
        true
    }
}
