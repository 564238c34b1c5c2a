//! Label print orchestration
//!
//! Once an order is fully picked and the operator confirms the box
//! counts, this module requests carrier labels from the backend, prints
//! whatever payload shape came back through the local bridge, marks the
//! order shipped, and completes the claim. Batches are printed strictly
//! sequentially with a short pause between labels; a single bad label
//! does not abort the rest of its batch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::labels::{looks_like_pdf, LabelPayload};
use crate::models::order::ClaimedOrder;
use crate::models::shipment::{
    AddressText, BoxQuantities, LabelItem, LabelRequest, LabelTypeHint, ShipmentMetadata,
};
use crate::pick::PickState;
use crate::services::bridge::{BridgeError, PrintBridge, ZplTarget};
use crate::services::claim::ClaimError;
use crate::services::session::PackSession;
use crate::services::shipping::{ShipError, ShippingApi};

/// Pause between labels in a batch, so the printer buffer is never
/// saturated. PDFs spool slower than raw ZPL.
const ZPL_BATCH_PAUSE: Duration = Duration::from_millis(300);
const PDF_BATCH_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("order has no identifier; cannot create a label")]
    MissingOrderId,

    #[error("no parcels (S/M/L) to create a label for")]
    NoParcels,

    #[error("the backend returned no label payload (ZPL or PDF)")]
    EmptyLabelResponse,

    #[error("none of the {requested} label(s) printed")]
    NothingPrinted { requested: usize },

    #[error(transparent)]
    Ship(#[from] ShipError),

    #[error(transparent)]
    Claim(#[from] ClaimError),
}

/// What a completed print run looked like. `printed < requested` means a
/// partial batch failure the operator may want to reprint manually.
#[derive(Debug)]
pub struct PrintSummary {
    pub printed: usize,
    pub requested: usize,
    pub shipment: ShipmentMetadata,
}

/// Output seam for label printing, so the orchestration flow can be
/// exercised against a recording fake.
#[async_trait]
pub trait LabelSink: Send + Sync {
    async fn print_zpl(&self, zpl_base64: &str) -> Result<(), BridgeError>;
    async fn print_pdf(&self, pdf_base64: &str) -> Result<(), BridgeError>;
}

/// Routes label jobs to the bridge: ZPL to the configured label printer
/// (or raw network address), PDFs to the document printer when one was
/// resolved, otherwise the bridge default.
pub struct BridgePrinter {
    bridge: Arc<PrintBridge>,
    printer: Option<String>,
    doc_printer: Option<String>,
    addr: Option<(String, u16)>,
}

impl BridgePrinter {
    pub fn new(
        bridge: Arc<PrintBridge>,
        printer: Option<String>,
        doc_printer: Option<String>,
        addr: Option<(String, u16)>,
    ) -> Self {
        Self {
            bridge,
            printer,
            doc_printer,
            addr,
        }
    }
}

#[async_trait]
impl LabelSink for BridgePrinter {
    async fn print_zpl(&self, zpl_base64: &str) -> Result<(), BridgeError> {
        let target = ZplTarget {
            printer: self.printer.clone(),
            addr: self.addr.clone(),
        };
        self.bridge.print_zpl(zpl_base64, &target).await
    }

    async fn print_pdf(&self, pdf_base64: &str) -> Result<(), BridgeError> {
        self.bridge.print_pdf(pdf_base64, self.doc_printer.as_deref()).await
    }
}

pub struct PrintOrchestrator {
    shipping: Arc<dyn ShippingApi>,
    sink: Arc<dyn LabelSink>,
    label_type: LabelTypeHint,
}

impl PrintOrchestrator {
    pub fn new(
        shipping: Arc<dyn ShippingApi>,
        sink: Arc<dyn LabelSink>,
        label_type: LabelTypeHint,
    ) -> Self {
        Self {
            shipping,
            sink,
            label_type,
        }
    }

    /// Full pack-out: request labels, print them, mark the order shipped
    /// and complete the claim.
    ///
    /// Preconditions are checked before any network call. Workflow state
    /// only advances when at least one label actually printed; zero
    /// printed labels is an error and the claim stays held so the
    /// operator can retry or skip.
    pub async fn ship_and_complete(
        &self,
        order: &ClaimedOrder,
        pick: &PickState,
        boxes: &BoxQuantities,
        session: &mut PackSession,
    ) -> Result<PrintSummary, PackError> {
        if order.order_id == 0 {
            return Err(PackError::MissingOrderId);
        }
        if boxes.total() == 0 {
            return Err(PackError::NoParcels);
        }

        let request = LabelRequest {
            order_id: order.order_id,
            order_number: order.order_number.clone(),
            address: AddressText {
                text: order.address_text(),
            },
            items: pick
                .lines()
                .iter()
                .map(|line| LabelItem {
                    sku: line.reference.clone(),
                    ean: line.barcode.clone(),
                    qty: line.ordered,
                })
                .collect(),
            boxes: boxes.clone(),
            label_type: self.label_type,
            shipping_product_id: order.shipping_product_id,
            contract_id: order.contract_id,
        };

        tracing::info!(order_id = order.order_id, parcels = boxes.total(), "requesting labels");
        let response = self.shipping.create_labels(&request).await?;
        let payload = response.payload().ok_or(PackError::EmptyLabelResponse)?;

        let (printed, requested) = self.print_payload(&payload).await;
        if printed == 0 {
            return Err(PackError::NothingPrinted { requested });
        }
        if printed < requested {
            tracing::warn!(
                order_id = order.order_id,
                printed,
                requested,
                "partial batch: some labels failed to print"
            );
        }

        let shipment = ShipmentMetadata {
            parcel_id: response.parcel_id,
            tracking_number: response.tracking_number.clone(),
            boxes: boxes.clone(),
        };
        self.shipping.mark_shipped(order.order_id, &shipment).await?;
        session.complete(&shipment).await?;

        tracing::info!(order_id = order.order_id, printed, requested, "order shipped");
        Ok(PrintSummary {
            printed,
            requested,
            shipment,
        })
    }

    /// Print one payload, returning `(printed, requested)`. Failures
    /// inside a batch are logged and the batch continues.
    async fn print_payload(&self, payload: &LabelPayload) -> (usize, usize) {
        match payload {
            LabelPayload::ZplBatch(labels) => {
                let requested = labels.len();
                let mut printed = 0;
                for (i, b64) in labels.iter().enumerate() {
                    tracing::debug!(label = i + 1, total = requested, "printing ZPL label");
                    match self.sink.print_zpl(b64).await {
                        Ok(()) => printed += 1,
                        Err(e) => {
                            tracing::error!(label = i + 1, total = requested, error = %e, "label print failed")
                        }
                    }
                    if i + 1 < requested {
                        tokio::time::sleep(ZPL_BATCH_PAUSE).await;
                    }
                }
                (printed, requested)
            }
            LabelPayload::ZplSingle(b64) => {
                // Some carriers put a PDF in the ZPL field; sniff and
                // redirect instead of feeding it to a thermal printer.
                let result = if looks_like_pdf(b64) {
                    tracing::info!("ZPL payload is a PDF in disguise, printing as document");
                    self.sink.print_pdf(b64).await
                } else {
                    self.sink.print_zpl(b64).await
                };
                match result {
                    Ok(()) => (1, 1),
                    Err(e) => {
                        tracing::error!(error = %e, "label print failed");
                        (0, 1)
                    }
                }
            }
            LabelPayload::PdfBatch(documents) => {
                let requested = documents.len();
                let mut printed = 0;
                for (i, b64) in documents.iter().enumerate() {
                    tracing::debug!(document = i + 1, total = requested, "printing PDF label");
                    match self.sink.print_pdf(b64).await {
                        Ok(()) => printed += 1,
                        Err(e) => {
                            tracing::error!(document = i + 1, total = requested, error = %e, "document print failed")
                        }
                    }
                    if i + 1 < requested {
                        tokio::time::sleep(PDF_BATCH_PAUSE).await;
                    }
                }
                (printed, requested)
            }
            LabelPayload::PdfSingle(b64) => match self.sink.print_pdf(b64).await {
                Ok(()) => (1, 1),
                Err(e) => {
                    tracing::error!(error = %e, "document print failed");
                    (0, 1)
                }
            },
        }
    }
}
