/// Reduction of anomaly lists down to "the latest anomaly of this kind"
use crate::types::{AnomalyKind, AnomalyRecord};

/// Select the record with the latest detection time.
///
/// Under equal timestamps the first record seen wins, so the result is
/// deterministic for a fixed input order. Returns `None` for an empty input.
pub fn select_latest<'a, I>(records: I) -> Option<&'a AnomalyRecord>
where
    I: IntoIterator<Item = &'a AnomalyRecord>,
{
    records.into_iter().fold(None, |latest, candidate| match latest {
        Some(current) if !candidate.is_newer_than(current) => Some(current),
        _ => Some(candidate),
    })
}

/// Keep only records of the kind's trading side and anomaly type, then select the latest.
pub fn select_latest_for<'a>(
    records: &'a [AnomalyRecord],
    kind: &AnomalyKind,
) -> Option<&'a AnomalyRecord> {
    select_latest(records.iter().filter(|record| kind.matches(record)))
}
