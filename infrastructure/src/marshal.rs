//! Conversion between store-native documents and JSON-safe records.
//!
//! Outbound documents are rendered as relaxed extended JSON, so values with no
//! JSON counterpart keep a tagged shape: the store's generated `_id` becomes
//! `{"$oid": "..."}` and dates become `{"$date": ...}`. Plain integers, the
//! public `id` included, stay plain numbers. Inbound records are parsed the same
//! way, so tagged values turn back into native types.

use application::ApplicationError;
use bson::{Bson, Document};
use domain::{ID_FIELD, Record};

/// Field name the store uses for its own generated primary key.
pub const STORE_ID_FIELD: &str = "_id";

pub fn to_transport(mut document: Document) -> Result<Record, ApplicationError> {
    normalize_integral_id(&mut document);
    let value = Bson::Document(document).into_relaxed_extjson();
    Record::try_from(value).map_err(|e| {
        ApplicationError::Storage(format!("stored document is not a valid record: {}", e))
    })
}

pub fn from_transport(record: &Record) -> Result<Document, ApplicationError> {
    Document::try_from(record.fields().clone()).map_err(|e| {
        ApplicationError::InvalidInput(format!("record cannot be stored: {}", e))
    })
}

/// Other writers may store the public id as a whole-valued double (`1.0`);
/// the server matches it against integer filters, so it is read back as an integer.
fn normalize_integral_id(document: &mut Document) {
    if let Some(Bson::Double(id)) = document.get(ID_FIELD) {
        let id = *id;
        if id.fract() == 0.0 && id >= i64::MIN as f64 && id < i64::MAX as f64 {
            document.insert(ID_FIELD, Bson::Int64(id as i64));
        }
    }
}

/// Like [`from_transport`], minus the store-generated key, for writes that
/// must let the store keep or assign its own `_id`.
pub fn writable_document(record: &Record) -> Result<Document, ApplicationError> {
    let mut document = from_transport(record)?;
    document.remove(STORE_ID_FIELD);
    Ok(document)
}
