//! Canonical order status
//!
//! The backend aggregates orders from several carriers and shops, each
//! with their own raw status vocabulary. Everything is folded into four
//! canonical states; only unprepared orders are claimable for packing.

use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CanonStatus {
    Unprepared,
    Prepared,
    Finalized,
    Cancelled,
}

const UNPREPARED: &[&str] = &[
    "unfulfilled",
    "processing",
    "on hold",
    "pending",
    "pending payment",
    "to pack",
    "to prepare",
    "sin preparar",
    "por preparar",
    "created",
];

const PREPARED: &[&str] = &[
    "prepared",
    "ready to send",
    "at sorting centre",
    "fulfilled",
    "shipped",
    "enviado",
    "listo",
    "announced",
    "awaiting customer pickup",
    "delivery attempt failed",
    "parcel en route",
    "shipment picked up by driver",
    "en route to sorting center",
    "sorted",
    "driver en route",
    "delivery delayed",
    "not sorted",
    "being sorted",
    "announced: not collected",
    "error collecting",
    "unable to deliver",
    "no label",
    "being announced",
    "submitting cancellation request",
    "cancellation requested",
    "cancelled upstream",
    "parcel cancellation failed.",
    "announcement failed",
    "at customs",
    "refused by recipient",
    "returned to sender",
    "delivery method changed",
    "delivery date changed",
    "delivery address changed",
    "address invalid",
];

const FINALIZED: &[&str] = &["complete", "completed", "delivered", "finalizado", "entregado"];

const CANCELLED: &[&str] = &["cancelled", "canceled", "refunded", "failed", "anulado", "devuelto"];

impl CanonStatus {
    /// Fold a raw backend status string into a canonical state. Unknown
    /// or empty statuses count as unprepared so they stay claimable.
    pub fn from_raw(raw: &str) -> CanonStatus {
        let n = normalize(raw);
        if n.is_empty() {
            return CanonStatus::Unprepared;
        }
        if UNPREPARED.contains(&n.as_str()) {
            return CanonStatus::Unprepared;
        }
        if PREPARED.contains(&n.as_str()) {
            return CanonStatus::Prepared;
        }
        if FINALIZED.contains(&n.as_str()) {
            return CanonStatus::Finalized;
        }
        if CANCELLED.contains(&n.as_str()) {
            return CanonStatus::Cancelled;
        }

        // Decorated statuses like "processing - picking" fall back to
        // keyword matching.
        let has = |kws: &[&str]| kws.iter().any(|kw| n.contains(kw));
        if has(&["unful", "pend", "process", "hold", "pack", "prepar"]) {
            CanonStatus::Unprepared
        } else if has(&["fulfill", "ready", "sorting", "shipp", "enviado", "listo", "preparado"]) {
            CanonStatus::Prepared
        } else if has(&["complete", "deliver", "finaliz", "entreg"]) {
            CanonStatus::Finalized
        } else if has(&["cancel", "refund", "fail", "anul", "devol"]) {
            CanonStatus::Cancelled
        } else {
            CanonStatus::Unprepared
        }
    }

    /// Only unprepared orders may still be edited or claimed for packing.
    pub fn is_editable(self) -> bool {
        self == CanonStatus::Unprepared
    }
}

/// Lowercase, strip accents, fold `_`/`-` to spaces and collapse runs.
fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for ch in raw.chars() {
        let mapped = match ch {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
            'ñ' | 'Ñ' => 'n',
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        };
        if mapped == ' ' {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(mapped);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_exact_statuses() {
        assert_eq!(CanonStatus::from_raw("to_pack"), CanonStatus::Unprepared);
        assert_eq!(CanonStatus::from_raw("Ready To Send"), CanonStatus::Prepared);
        assert_eq!(CanonStatus::from_raw("delivered"), CanonStatus::Finalized);
        assert_eq!(CanonStatus::from_raw("refunded"), CanonStatus::Cancelled);
    }

    #[test]
    fn strips_accents_and_separators() {
        assert_eq!(CanonStatus::from_raw("SIN-PREPARAR"), CanonStatus::Unprepared);
        assert_eq!(CanonStatus::from_raw("Anulado"), CanonStatus::Cancelled);
    }

    #[test]
    fn decorated_statuses_use_keywords() {
        assert_eq!(CanonStatus::from_raw("processing - picking"), CanonStatus::Unprepared);
        assert_eq!(CanonStatus::from_raw("shipping soon"), CanonStatus::Prepared);
    }

    #[test]
    fn unknown_and_empty_stay_claimable() {
        assert_eq!(CanonStatus::from_raw(""), CanonStatus::Unprepared);
        assert_eq!(CanonStatus::from_raw("weird status"), CanonStatus::Unprepared);
        assert!(CanonStatus::from_raw("").is_editable());
        assert!(!CanonStatus::Prepared.is_editable());
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(CanonStatus::Unprepared.to_string(), "unprepared");
    }
}
