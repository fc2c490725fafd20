//! Canonical wire representation of a vault item.
//!
//! The record always carries the type as its canonical string name (never
//! the numeric code) and embeds the linked object under its discriminator
//! field (`file`, `vaultKey`, or `object` for kinds this client does not
//! model). Staged share entries are appended only while changes are
//! pending; they are transport-only and do not survive a round trip.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::error::VesError;
use crate::flags::StateFlags;
use crate::item::VaultItem;
use crate::item_type::ItemType;
use crate::object::{LinkedObject, VaultKey, VesFile};
use crate::share::{ShareEntry, ShareTarget};

/// Serializes the entity into its canonical wire record.
pub(crate) fn encode(item: &VaultItem) -> Value {
    let mut record = Map::new();
    record.insert("id".to_string(), json!(item.id));
    record.insert("type".to_string(), json!(item.item_type.to_string()));

    if !item.value.is_empty() || matches!(item.object, LinkedObject::None) {
        record.insert("value".to_string(), json!(BASE64.encode(&item.value)));
    }
    if let Some(meta) = &item.meta {
        record.insert("meta".to_string(), meta.clone());
    }

    match &item.object {
        LinkedObject::None => {}
        LinkedObject::File(file) => {
            record.insert("file".to_string(), file.to_record());
        }
        LinkedObject::VaultKey(key) => {
            record.insert("vaultKey".to_string(), key.to_record());
        }
        LinkedObject::Generic(value) => {
            record.insert("object".to_string(), value.clone());
        }
    }

    if item.flags.intersects(StateFlags::ADD | StateFlags::UPDATE)
        && !item.share_entries.is_empty()
    {
        let entries: Vec<Value> = item.share_entries.iter().map(encode_entry).collect();
        record.insert("entries".to_string(), Value::Array(entries));
    }

    Value::Object(record)
}

fn encode_entry(entry: &ShareEntry) -> Value {
    let mut record = Map::new();
    record.insert("vaultKey".to_string(), json!({ "id": entry.vault_key_id }));
    record.insert("op".to_string(), json!(entry.op.to_string()));
    if entry.flags.contains(StateFlags::META) {
        record.insert("meta".to_string(), json!(true));
    }
    Value::Object(record)
}

/// Decodes an entity from a wire record.
///
/// Embedded references may be full sub-records or bare numeric ids; the
/// latter decode to stubs resolved on first access. An embedded object of a
/// kind this client does not recognize falls back to
/// [`LinkedObject::Generic`] rather than failing.
pub(crate) fn decode(record: &Value) -> Result<VaultItem, VesError> {
    let fields = record
        .as_object()
        .ok_or_else(|| VesError::decode("record", "expected a JSON object"))?;

    let id = fields
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| VesError::decode("id", "missing or not a u64"))?;

    let type_name = fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| VesError::decode("type", "missing or not a string"))?;
    let item_type = ItemType::from_str(type_name)
        .map_err(|_| VesError::decode("type", format!("unknown type name `{type_name}`")))?;

    let value = match fields.get("value") {
        Some(Value::String(s)) => BASE64
            .decode(s)
            .map_err(|e| VesError::decode("value", format!("invalid base64: {e}")))?,
        Some(other) => {
            return Err(VesError::decode(
                "value",
                format!("expected base64 string, got {other}"),
            ))
        }
        None => Vec::new(),
    };

    let object = decode_object(fields)?;
    let share_targets = decode_targets(fields)?;

    let mut item = VaultItem::new();
    item.id = id;
    item.item_type = item_type;
    item.value = value;
    item.meta = fields.get("meta").cloned();
    item.object = object;
    item.share_targets = share_targets;
    // Freshly loaded: in sync with the remote store, nothing pending.
    item.flags = StateFlags::CLEAN;
    Ok(item)
}

fn decode_object(fields: &Map<String, Value>) -> Result<LinkedObject, VesError> {
    if let Some(sub) = fields.get("file") {
        return Ok(LinkedObject::File(VesFile::from_record(sub)?));
    }
    if let Some(sub) = fields.get("vaultKey") {
        return Ok(LinkedObject::VaultKey(VaultKey::from_record(sub)?));
    }
    if let Some(sub) = fields.get("object") {
        return Ok(LinkedObject::Generic(sub.clone()));
    }
    Ok(LinkedObject::None)
}

/// Decodes the server-reported recipient list (`vaultEntries`) into share
/// targets. Entries with an unparsable vault key reference are a decode
/// error; an absent list is simply an unshared item.
fn decode_targets(fields: &Map<String, Value>) -> Result<Vec<ShareTarget>, VesError> {
    let Some(raw) = fields.get("vaultEntries") else {
        return Ok(Vec::new());
    };
    let list = raw
        .as_array()
        .ok_or_else(|| VesError::decode("vaultEntries", "expected an array"))?;

    let mut targets = Vec::with_capacity(list.len());
    for entry in list {
        let key_ref = entry
            .get("vaultKey")
            .ok_or_else(|| VesError::decode("vaultEntries", "entry without vaultKey"))?;
        let key = VaultKey::from_record(key_ref)?;
        targets.push(ShareTarget::with_flags(key, StateFlags::CLEAN));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use crate::share::ShareOp;

    use super::*;

    #[test]
    fn round_trip_preserves_id_type_value_meta() {
        let mut item = VaultItem::new();
        item.set_value(b"hunter2".to_vec(), ItemType::Password).unwrap();
        item.set_meta(Some(json!({"label": "router admin"}))).unwrap();
        item.id = 321;

        let decoded = VaultItem::from_record(&item.to_record()).unwrap();
        assert_eq!(decoded.id(), 321);
        assert_eq!(decoded.item_type(), ItemType::Password);
        assert_eq!(decoded.value(), b"hunter2");
        assert_eq!(decoded.meta(), Some(&json!({"label": "router admin"})));
        // Loaded items are clean, not freshly created.
        assert_eq!(decoded.flags(), StateFlags::CLEAN);
    }

    #[test]
    fn type_is_encoded_as_string_name() {
        let mut item = VaultItem::new();
        item.set_value(b"s3cret".to_vec(), ItemType::Secret).unwrap();
        let record = item.to_record();
        assert_eq!(record["type"], "secret");
        assert!(record["type"].as_u64().is_none());
    }

    #[test]
    fn entries_present_only_while_pending() {
        let mut item = VaultItem::new();
        item.stage_entries(
            &[ShareTarget::new(VaultKey::stub(7))],
            StateFlags::META,
        )
        .unwrap();

        let record = item.to_record();
        let entries = record["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["vaultKey"]["id"], 7);
        assert_eq!(entries[0]["op"], ShareOp::Add.to_string());
        assert_eq!(entries[0]["meta"], true);

        item.mark_committed(55);
        assert!(item.to_record().get("entries").is_none());

        // Transport-only: staged entries do not survive a round trip.
        let mut staged = VaultItem::new();
        staged
            .stage_entries(&[ShareTarget::new(VaultKey::stub(7))], StateFlags::empty())
            .unwrap();
        let decoded = VaultItem::from_record(&staged.to_record()).unwrap();
        assert!(decoded.share_entries().is_empty());
    }

    #[test]
    fn polymorphic_object_resolution() {
        let record = json!({
            "id": 9,
            "type": "file",
            "file": {"id": 4, "name": "notes.txt"},
        });
        let item = decode(&record).unwrap();
        assert_eq!(item.file().unwrap().name.as_deref(), Some("notes.txt"));
        assert!(item.vault_key().is_none());

        let record = json!({"id": 9, "type": "secret", "vaultKey": 12});
        let item = decode(&record).unwrap();
        let key = item.vault_key().unwrap();
        assert_eq!(key.id, 12);
        assert!(key.is_stub());
    }

    #[test]
    fn unknown_object_kind_falls_back_to_generic() {
        let record = json!({
            "id": 3,
            "type": "string",
            "object": {"kind": "widget", "payload": [1, 2, 3]},
        });
        let item = decode(&record).unwrap();
        assert!(matches!(
            VaultItem::from_record(&item.to_record()).unwrap().file(),
            None
        ));
        match &item.object {
            LinkedObject::Generic(v) => assert_eq!(v["kind"], "widget"),
            other => panic!("expected generic object, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_fields_name_the_offender() {
        let err = decode(&json!({"type": "string"})).unwrap_err();
        assert!(matches!(err, VesError::Decode { field: "id", .. }));

        let err = decode(&json!({"id": 1})).unwrap_err();
        assert!(matches!(err, VesError::Decode { field: "type", .. }));

        let err = decode(&json!({"id": 1, "type": "blob"})).unwrap_err();
        assert!(matches!(err, VesError::Decode { field: "type", .. }));
    }

    #[test]
    fn server_entries_populate_share_targets() {
        let record = json!({
            "id": 88,
            "type": "string",
            "value": BASE64.encode(b"shared note"),
            "vaultEntries": [
                {"vaultKey": {"id": 5, "type": "current"}},
                {"vaultKey": 6},
            ],
        });
        let item = decode(&record).unwrap();
        let ids: Vec<_> = item.share_targets().iter().map(|t| t.key.id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert!(item.share_targets()[1].key.is_stub());
    }
}
