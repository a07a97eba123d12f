//! Canonical storage layout model, normalized from the raw solc
//! `storageLayout` artifact section.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Raw `storageLayout` section as solc emits it: an entry list plus a
/// type dictionary keyed by type identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStorageLayout {
    #[serde(default)]
    pub storage: Vec<RawStorageEntry>,
    #[serde(default)]
    pub types: Option<BTreeMap<String, RawTypeInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStorageEntry {
    pub label: String,
    pub offset: u32,
    /// Decimal digits in a string, e.g. `"12"`.
    pub slot: String,
    #[serde(rename = "type")]
    pub type_id: String,
    /// `"src/File.sol:Contract"` attribution of the declaring contract.
    #[serde(default)]
    pub contract: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTypeInfo {
    #[serde(default)]
    pub encoding: String,
    /// Human-readable type, e.g. `"uint256"` or `"uint256[50]"`.
    pub label: String,
    /// Decimal digits in a string; multi-slot types exceed 32.
    #[serde(rename = "numberOfBytes")]
    pub number_of_bytes: String,
}

/// One state variable pinned to its storage position. The primary key
/// for layout comparison is `(slot, offset)`; `label` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub slot: u64,
    pub offset: u8,
    /// Bytes occupied within the slot, clamped to 32 for multi-slot
    /// types (the canonical type string retains the full shape).
    pub length_bytes: u8,
    pub canonical_type: String,
    pub label: String,
    /// Declaring contract name, for inheritance attribution.
    pub origin: String,
    pub declaration_index: u32,
}

impl StorageEntry {
    /// A gap entry reserves future slots: its label ends in `gap`
    /// (case-insensitive) and its type is `uint256[N]`.
    pub fn is_gap(&self) -> bool {
        self.label.to_ascii_lowercase().ends_with("gap") && self.gap_capacity().is_some()
    }

    /// Declared `N` for a `uint256[N]` entry, if it has that shape.
    pub fn gap_capacity(&self) -> Option<u64> {
        let rest = self.canonical_type.strip_prefix("uint256[")?;
        let digits = rest.strip_suffix(']')?;
        digits.parse().ok()
    }
}

/// Declaration-ordered storage layout for one contract, ancestors
/// first per inheritance linearization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    pub entries: Vec<StorageEntry>,
}

impl StorageLayout {
    pub fn new(entries: Vec<StorageEntry>) -> Self {
        Self { entries }
    }

    pub fn non_gap(&self) -> impl Iterator<Item = &StorageEntry> {
        self.entries.iter().filter(|e| !e.is_gap())
    }

    pub fn gaps(&self) -> impl Iterator<Item = &StorageEntry> {
        self.entries.iter().filter(|e| e.is_gap())
    }

    pub fn entry_at(&self, slot: u64, offset: u8) -> Option<&StorageEntry> {
        self.entries
            .iter()
            .find(|e| e.slot == slot && e.offset == offset)
    }
}

/// Normalize the raw solc layout into the canonical form, enforcing
/// the layout invariants. Duplicate `(slot, offset)` keys are an error
/// rather than a silently masked finding.
pub fn normalize_layout(raw: &RawStorageLayout) -> Result<StorageLayout> {
    let types = raw.types.clone().unwrap_or_default();
    let mut entries = Vec::with_capacity(raw.storage.len());
    let mut seen_keys = HashSet::new();

    for (index, raw_entry) in raw.storage.iter().enumerate() {
        let type_info = types.get(&raw_entry.type_id).ok_or_else(|| {
            anyhow!(
                "storage entry `{}` references unknown type id `{}`",
                raw_entry.label,
                raw_entry.type_id
            )
        })?;

        let slot: u64 = raw_entry
            .slot
            .parse()
            .with_context(|| format!("bad slot `{}` for `{}`", raw_entry.slot, raw_entry.label))?;
        let offset = u8::try_from(raw_entry.offset)
            .map_err(|_| anyhow!("offset {} out of range for `{}`", raw_entry.offset, raw_entry.label))?;
        let byte_size: u64 = type_info.number_of_bytes.parse().with_context(|| {
            format!(
                "bad byte size `{}` for type `{}`",
                type_info.number_of_bytes, raw_entry.type_id
            )
        })?;
        if byte_size == 0 {
            bail!("type `{}` has zero width", raw_entry.type_id);
        }
        let length_bytes = byte_size.min(32) as u8;

        if offset as u64 + length_bytes as u64 > 32 {
            bail!(
                "entry `{}` overflows its slot: offset {} + width {}",
                raw_entry.label,
                offset,
                length_bytes
            );
        }
        if !seen_keys.insert((slot, offset)) {
            bail!(
                "layout has two entries at slot {} offset {} (second is `{}`)",
                slot,
                offset,
                raw_entry.label
            );
        }

        entries.push(StorageEntry {
            slot,
            offset,
            length_bytes,
            canonical_type: canonicalize_type(&type_info.label),
            label: raw_entry.label.clone(),
            origin: origin_name(&raw_entry.contract),
            declaration_index: index as u32,
        });
    }

    Ok(StorageLayout::new(entries))
}

/// Resolve Solidity type aliases to their canonical spellings so
/// comparisons are structural over one vocabulary.
pub fn canonicalize_type(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut word = String::new();
    for ch in label.chars() {
        if ch.is_ascii_alphanumeric() {
            word.push(ch);
        } else {
            push_word(&mut out, &word);
            word.clear();
            out.push(ch);
        }
    }
    push_word(&mut out, &word);
    out
}

fn push_word(out: &mut String, word: &str) {
    out.push_str(match word {
        "uint" => "uint256",
        "int" => "int256",
        "byte" => "bytes1",
        other => other,
    });
}

fn origin_name(contract: &str) -> String {
    contract
        .rsplit(':')
        .next()
        .unwrap_or(contract)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_from_json(value: serde_json::Value) -> RawStorageLayout {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_solc_shape() {
        let raw = raw_from_json(json!({
            "storage": [
                {"label": "value", "offset": 0, "slot": "0", "type": "t_uint256", "contract": "src/Box.sol:Box"},
                {"label": "owner", "offset": 0, "slot": "1", "type": "t_address", "contract": "src/Box.sol:Box"}
            ],
            "types": {
                "t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"},
                "t_address": {"encoding": "inplace", "label": "address", "numberOfBytes": "20"}
            }
        }));

        let layout = normalize_layout(&raw).unwrap();
        assert_eq!(layout.entries.len(), 2);
        assert_eq!(layout.entries[0].canonical_type, "uint256");
        assert_eq!(layout.entries[1].length_bytes, 20);
        assert_eq!(layout.entries[1].origin, "Box");
        assert_eq!(layout.entries[1].declaration_index, 1);
    }

    #[test]
    fn duplicate_primary_key_is_an_error() {
        let raw = raw_from_json(json!({
            "storage": [
                {"label": "a", "offset": 0, "slot": "0", "type": "t_uint256", "contract": "c"},
                {"label": "b", "offset": 0, "slot": "0", "type": "t_uint256", "contract": "c"}
            ],
            "types": {
                "t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}
            }
        }));
        assert!(normalize_layout(&raw).is_err());
    }

    #[test]
    fn slot_overflow_is_an_error() {
        let raw = raw_from_json(json!({
            "storage": [
                {"label": "a", "offset": 20, "slot": "0", "type": "t_uint256", "contract": "c"}
            ],
            "types": {
                "t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}
            }
        }));
        assert!(normalize_layout(&raw).is_err());
    }

    #[test]
    fn gap_detection_requires_shape_and_suffix() {
        let gap = StorageEntry {
            slot: 5,
            offset: 0,
            length_bytes: 32,
            canonical_type: "uint256[50]".into(),
            label: "__gap".into(),
            origin: "Base".into(),
            declaration_index: 0,
        };
        assert!(gap.is_gap());
        assert_eq!(gap.gap_capacity(), Some(50));

        let not_gap = StorageEntry {
            canonical_type: "address[50]".into(),
            ..gap.clone()
        };
        assert!(!not_gap.is_gap());

        let wrong_label = StorageEntry {
            label: "reserved".into(),
            ..gap
        };
        assert!(!wrong_label.is_gap());
    }

    #[test]
    fn aliases_canonicalize_inside_arrays() {
        assert_eq!(canonicalize_type("uint"), "uint256");
        assert_eq!(canonicalize_type("uint[2]"), "uint256[2]");
        assert_eq!(canonicalize_type("mapping(uint => int)"), "mapping(uint256 => int256)");
        assert_eq!(canonicalize_type("uint256"), "uint256");
    }
}
