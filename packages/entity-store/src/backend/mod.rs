//! Terminal backends: the only stages that perform persistent I/O.

mod json_dir;
mod memory;

pub use json_dir::JsonDirBackend;
pub use memory::MemoryBackend;

use serde_json::Value;

use crate::{entity_uid, Entity, Error, SelectOptions, UID_FIELD};

/// Make sure an entity has a uid, generating one if needed.
pub(crate) fn assign_uid(entity: &mut Entity) -> Result<String, Error> {
    match entity.get(UID_FIELD) {
        None | Some(Value::Null) => {
            let uid = uuid::Uuid::new_v4().to_string();
            entity.insert(UID_FIELD.to_string(), Value::String(uid.clone()));
            Ok(uid)
        }
        Some(Value::String(uid)) if !uid.is_empty() => Ok(uid.clone()),
        Some(_) => Err(Error::invalid("`uid` must be a non-empty string")),
    }
}

/// Shallow merge; the uid of the target is kept.
pub(crate) fn merge(target: &mut Entity, patch: Entity) {
    for (key, value) in patch {
        if key != UID_FIELD {
            target.insert(key, value);
        }
    }
}

/// Apply predicate, offset and limit to entities in storage order.
pub(crate) fn apply_select<'a>(
    entities: impl Iterator<Item = &'a Entity>,
    options: &SelectOptions,
) -> Vec<Entity> {
    let matching = entities
        .filter(|e| options.predicate.matches(e))
        .skip(options.offset);
    match options.limit {
        Some(limit) => matching.take(limit).cloned().collect(),
        None => matching.cloned().collect(),
    }
}

pub(crate) fn uid_of(entity: &Entity) -> &str {
    entity_uid(entity).unwrap_or_default()
}
