// Field Mapper - normalized feed records to Location attributes
// Raw wire strings become typed values here: codes are trimmed, dates are
// parsed as ISO calendar dates. A record that cannot be mapped fails the
// whole run; there is no skip-and-continue path.

use crate::error::SyncError;
use crate::schema::ExternalRecord;
use chrono::NaiveDate;

/// Register dates are plain ISO calendar dates, e.g. "1707-05-01".
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The attribute set a feed record contributes to a Location.
/// This is the unit the reconciler compares and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationAttributes {
    pub code: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Map one normalized record onto Location attributes.
///
/// `country` becomes the code (trimmed, case preserved), `name` carries
/// over, the optional dates are parsed. Empty codes and unparseable dates
/// are malformed-feed errors.
pub fn map_record(record: &ExternalRecord) -> Result<LocationAttributes, SyncError> {
    let code = record.country.trim();
    if code.is_empty() {
        return Err(SyncError::malformed(
            "feed entry has an empty country code",
        ));
    }

    Ok(LocationAttributes {
        code: code.to_string(),
        name: record.name.clone(),
        start_date: parse_date(code, "start-date", record.start_date.as_deref())?,
        end_date: parse_date(code, "end-date", record.end_date.as_deref())?,
    })
}

/// Map a whole normalized feed, preserving order. The first malformed
/// record aborts the run.
pub fn map_records(records: &[ExternalRecord]) -> Result<Vec<LocationAttributes>, SyncError> {
    records.iter().map(map_record).collect()
}

fn parse_date(
    code: &str,
    field: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, SyncError> {
    match value {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|error| {
                SyncError::malformed(format!("{code}: invalid {field} {raw:?}: {error}"))
            }),
    }
}
