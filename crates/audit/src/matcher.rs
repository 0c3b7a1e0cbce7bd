//! Fuzzy column matching: raw invoice headers -> canonical fields.
//!
//! Each canonical field is compared against every raw header using its own
//! name plus a list of known synonyms. Assignment is greedy in field
//! priority order, and a header is claimed by at most one field.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{CanonicalField, ColumnMapping, DetectionResult};

/// Candidates scoring below this are discarded.
pub const MIN_SCORE: f64 = 0.40;

/// Required fields below this confidence are flagged for manual review.
pub const REVIEW_THRESHOLD: f64 = 0.80;

const CONTAINS_SCORE: f64 = 0.9;
const JACCARD_FLOOR: f64 = 0.55;
const JACCARD_CEIL: f64 = 0.90;

/// Known header spellings seen in courier exports.
pub fn synonyms(field: CanonicalField) -> &'static [&'static str] {
    match field {
        CanonicalField::Awb => &[
            "awb",
            "awb no",
            "awb number",
            "airway bill",
            "air waybill",
            "waybill",
            "waybill number",
            "tracking id",
            "tracking number",
            "tracking no",
            "consignment no",
            "consignment number",
            "docket no",
            "shipment id",
        ],
        CanonicalField::TotalBilledAmount => &[
            "total billed amount",
            "billed amount",
            "total amount",
            "invoice amount",
            "total charges",
            "net amount",
            "amount",
            "total",
            "grand total",
            "freight charges",
        ],
        CanonicalField::OrderType => &[
            "order type",
            "payment mode",
            "payment type",
            "cod prepaid",
            "shipment type",
            "mode",
        ],
        CanonicalField::BilledWeight => &[
            "billed weight",
            "charged weight",
            "chargeable weight",
            "billing weight",
            "applied weight",
            "courier weight",
        ],
        CanonicalField::ActualWeight => &[
            "actual weight",
            "declared weight",
            "dead weight",
            "physical weight",
            "seller weight",
            "entered weight",
        ],
        CanonicalField::BilledZone => &[
            "billed zone",
            "charged zone",
            "applied zone",
            "courier zone",
            "zone",
        ],
        CanonicalField::ActualZone => &[
            "actual zone",
            "expected zone",
            "correct zone",
            "declared zone",
            "seller zone",
        ],
        CanonicalField::Length => &["length", "length cm", "pkg length"],
        CanonicalField::Width => &["width", "breadth", "width cm", "pkg width"],
        CanonicalField::Height => &["height", "height cm", "pkg height"],
        CanonicalField::OriginPincode => &[
            "origin pincode",
            "pickup pincode",
            "source pincode",
            "from pincode",
            "origin pin",
        ],
        CanonicalField::DestPincode => &[
            "destination pincode",
            "dest pincode",
            "delivery pincode",
            "drop pincode",
            "to pincode",
            "customer pincode",
        ],
        CanonicalField::CodAmount => &[
            "cod amount",
            "cod value",
            "collectable amount",
            "cod charges",
        ],
        CanonicalField::ShipmentDate => &[
            "shipment date",
            "ship date",
            "pickup date",
            "booking date",
            "manifest date",
            "date",
        ],
    }
}

/// Lowercase, replace non-alphanumerics with spaces, collapse whitespace.
///
/// Punctuation becomes a word break rather than being dropped, so
/// `Billed_Weight` and `Billed Weight` share tokens for the Jaccard tier.
pub fn normalize_header(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity in [0, 1] between two header strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_header(a);
    let b = normalize_header(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return CONTAINS_SCORE;
    }

    let ta: HashSet<&str> = a.split(' ').collect();
    let tb: HashSet<&str> = b.split(' ').collect();
    let shared = ta.intersection(&tb).count();
    if shared > 0 {
        let jaccard = shared as f64 / ta.union(&tb).count() as f64;
        return JACCARD_FLOOR + jaccard * (JACCARD_CEIL - JACCARD_FLOOR);
    }

    let max_len = a.chars().count().max(b.chars().count());
    (1.0 - levenshtein(&a, &b) as f64 / max_len as f64).max(0.0)
}

/// Single-character edit distance, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Best score of `header` against the field's name and synonyms.
pub fn field_score(field: CanonicalField, header: &str) -> f64 {
    std::iter::once(field.name())
        .chain(synonyms(field).iter().copied())
        .map(|candidate| similarity(header, candidate))
        .fold(0.0, f64::max)
}

/// Surviving candidates for one field, best first. Equal scores keep the
/// header order of the invoice.
fn candidates<'a>(field: CanonicalField, headers: &'a [String]) -> Vec<(&'a str, f64)> {
    let mut scored: Vec<(&str, f64)> = headers
        .iter()
        .map(|h| (h.as_str(), field_score(field, h)))
        .filter(|(_, score)| *score >= MIN_SCORE)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Map raw headers to canonical fields.
pub fn detect_columns(headers: &[String]) -> DetectionResult {
    let (mapping, confidence, _claimed) = CanonicalField::ALL.iter().fold(
        (ColumnMapping::default(), BTreeMap::new(), BTreeSet::<&str>::new()),
        |(mut mapping, mut confidence, claimed), &field| {
            let pick = candidates(field, headers)
                .into_iter()
                .find(|(h, _)| !claimed.contains(h));

            let claimed = match pick {
                Some((header, score)) => {
                    mapping.set(field, Some(header.to_string()));
                    confidence.insert(field, score);
                    claimed.into_iter().chain(std::iter::once(header)).collect()
                }
                None => {
                    mapping.set(field, None);
                    confidence.insert(field, 0.0);
                    claimed
                }
            };
            (mapping, confidence, claimed)
        },
    );

    let low_confidence: Vec<CanonicalField> = CanonicalField::required()
        .filter(|f| {
            mapping.get(*f).is_none()
                || confidence.get(f).copied().unwrap_or(0.0) < REVIEW_THRESHOLD
        })
        .collect();

    log::debug!(
        "column detection: {} of {} fields mapped, {} need review",
        mapping.mapped().count(),
        CanonicalField::ALL.len(),
        low_confidence.len()
    );

    DetectionResult {
        needs_review: !low_confidence.is_empty(),
        mapping,
        confidence,
        low_confidence,
    }
}

/// True when every required canonical name appears verbatim as a header.
pub fn is_canonical(headers: &[String]) -> bool {
    CanonicalField::required().all(|f| headers.iter().any(|h| h == f.name()))
}

/// Mapping for invoices whose headers already use canonical names.
pub fn identity_mapping(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for field in CanonicalField::ALL {
        let header = headers.iter().find(|h| *h == field.name()).cloned();
        mapping.set(field, header);
    }
    mapping
}
