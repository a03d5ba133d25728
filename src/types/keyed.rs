//! Collections are stored as objects keyed by push id. These helpers read
//! them back as ordered lists with the key copied into each element.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::error::Result;

pub trait Keyed {
    fn set_id(&mut self, id: String);
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapOrList<T> {
    Map(BTreeMap<String, T>),
    List(Vec<T>),
}

/// Accepts either the stored `{id: record}` form or an already-flattened list.
pub fn deserialize<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Keyed,
{
    Ok(match MapOrList::<T>::deserialize(deserializer)? {
        MapOrList::Map(map) => map
            .into_iter()
            .map(|(id, mut item)| {
                item.set_id(id);
                item
            })
            .collect(),
        MapOrList::List(list) => list,
    })
}

/// Decodes one stored record and stamps it with its key.
pub fn from_entry<T: DeserializeOwned + Keyed>(id: &str, value: Value) -> Result<T> {
    let mut item: T = serde_json::from_value(value)?;
    item.set_id(id.to_string());
    Ok(item)
}
