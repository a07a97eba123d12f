//! Storage-layout differ: detects slot collisions, deletions, width
//! and type changes, and storage-gap erosion between the old and new
//! implementation layouts.

use crate::analyzers::{AnalysisContext, Analyzer};
use crate::artifacts::{StorageEntry, StorageLayout};
use crate::core::{Confidence, Finding, FindingLocation, Severity};
use crate::runner::STORAGE_LAYOUT;
use anyhow::Result;
use serde_json::json;

pub struct StorageLayoutAnalyzer;

impl Analyzer for StorageLayoutAnalyzer {
    fn id(&self) -> &'static str {
        STORAGE_LAYOUT
    }

    fn description(&self) -> &'static str {
        "Compares old and new storage layouts for slot corruption"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        Ok(diff_layouts(
            &ctx.resolved.old.layout,
            &ctx.resolved.new.layout,
        ))
    }
}

pub fn diff_layouts(old: &StorageLayout, new: &StorageLayout) -> Vec<Finding> {
    let mut findings = Vec::new();

    for old_entry in old.non_gap() {
        match new.entry_at(old_entry.slot, old_entry.offset).filter(|e| !e.is_gap()) {
            None => {
                // Suppress deletion when the same label reappears at a
                // higher slot: that shift is reported as an insertion.
                let moved = new
                    .non_gap()
                    .any(|e| e.label == old_entry.label && e.slot > old_entry.slot);
                if !moved {
                    findings.push(variable_deleted(old_entry));
                }
            }
            Some(new_entry) => {
                if new_entry.length_bytes != old_entry.length_bytes {
                    findings.push(width_changed(old_entry, new_entry));
                } else if new_entry.canonical_type != old_entry.canonical_type {
                    findings.push(type_changed(old_entry, new_entry));
                } else if new_entry.label != old_entry.label {
                    findings.push(renamed(old_entry, new_entry));
                }
            }
        }
    }

    let max_old_slot = old.non_gap().map(|e| e.slot).max().unwrap_or(0);
    let mut appended: Vec<&StorageEntry> = Vec::new();

    for new_entry in new.non_gap() {
        if old
            .entry_at(new_entry.slot, new_entry.offset)
            .filter(|e| !e.is_gap())
            .is_some()
        {
            continue;
        }
        if new_entry.slot <= max_old_slot {
            findings.push(inserted_in_middle(new_entry, max_old_slot));
        } else {
            appended.push(new_entry);
        }
    }

    if !appended.is_empty() {
        findings.push(appended_variables(&appended));
    }

    // A gap reserves capacity against any future variable, regardless
    // of where the new variable lands relative to the gap.
    let appended_count = appended.len() as u64;
    for old_gap in old.gaps() {
        match new.gaps().find(|g| g.slot == old_gap.slot) {
            None => findings.push(gap_removed(old_gap)),
            Some(new_gap) => {
                let old_capacity = old_gap.gap_capacity().unwrap_or(0);
                let new_capacity = new_gap.gap_capacity().unwrap_or(0);
                if new_capacity + appended_count < old_capacity {
                    findings.push(gap_insufficient(
                        old_gap,
                        new_gap,
                        appended_count,
                        old_capacity - new_capacity - appended_count,
                    ));
                }
            }
        }
    }

    findings
}

fn entry_location(entry: &StorageEntry) -> FindingLocation {
    FindingLocation::storage(entry.slot, entry.offset)
}

fn variable_deleted(entry: &StorageEntry) -> Finding {
    Finding::new(
        "STOR-001",
        Severity::Critical,
        Confidence::High,
        format!("State variable `{}` was deleted", entry.label),
        format!(
            "`{}` ({}) occupied slot {} offset {} in the old layout but has no counterpart \
             in the new layout; every later variable shifts and reads corrupted data",
            entry.label, entry.canonical_type, entry.slot, entry.offset
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("label", entry.label.as_str())
    .with_detail("canonical_type", entry.canonical_type.as_str())
    .with_detail("origin", entry.origin.as_str())
    .with_location(entry_location(entry))
    .with_remediation("never remove state variables; deprecate them in place instead")
}

fn width_changed(old: &StorageEntry, new: &StorageEntry) -> Finding {
    Finding::new(
        "STOR-003",
        Severity::Critical,
        Confidence::High,
        format!("Width of `{}` changed", old.label),
        format!(
            "slot {} offset {} held {} bytes (`{}`) and now holds {} bytes (`{}`); packed \
             neighbors will read garbage",
            old.slot, old.offset, old.length_bytes, old.canonical_type, new.length_bytes,
            new.canonical_type
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("old_type", old.canonical_type.as_str())
    .with_detail("new_type", new.canonical_type.as_str())
    .with_detail("old_length_bytes", old.length_bytes)
    .with_detail("new_length_bytes", new.length_bytes)
    .with_location(entry_location(old))
    .with_remediation("keep the declared width of existing variables unchanged")
}

fn type_changed(old: &StorageEntry, new: &StorageEntry) -> Finding {
    Finding::new(
        "STOR-004",
        Severity::Critical,
        Confidence::High,
        format!("Type of `{}` changed", old.label),
        format!(
            "slot {} offset {} changed type from `{}` to `{}` at the same width; the raw \
             bytes will be reinterpreted under different semantics",
            old.slot, old.offset, old.canonical_type, new.canonical_type
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("old_type", old.canonical_type.as_str())
    .with_detail("new_type", new.canonical_type.as_str())
    .with_location(entry_location(old))
    .with_remediation("keep the type of existing variables unchanged across upgrades")
}

fn renamed(old: &StorageEntry, new: &StorageEntry) -> Finding {
    Finding::new(
        "STOR-010",
        Severity::Low,
        Confidence::High,
        format!("Variable `{}` renamed to `{}`", old.label, new.label),
        format!(
            "slot {} offset {} kept its type (`{}`) but the label changed; verify the rename \
             is intentional and not two different variables swapping places",
            old.slot, old.offset, old.canonical_type
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("old_label", old.label.as_str())
    .with_detail("new_label", new.label.as_str())
    .with_location(entry_location(old))
    .with_remediation("confirm the rename preserves the variable's meaning")
}

fn inserted_in_middle(entry: &StorageEntry, max_old_slot: u64) -> Finding {
    Finding::new(
        "STOR-002",
        Severity::Critical,
        Confidence::High,
        format!("Variable `{}` inserted into existing layout", entry.label),
        format!(
            "`{}` ({}) appears at slot {} offset {}, at or below the old layout's last \
             occupied slot {}; every variable after it shifts into foreign slots",
            entry.label, entry.canonical_type, entry.slot, entry.offset, max_old_slot
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("label", entry.label.as_str())
    .with_detail("canonical_type", entry.canonical_type.as_str())
    .with_detail("max_old_slot", max_old_slot)
    .with_location(entry_location(entry))
    .with_remediation("append new variables after all existing ones, or consume a storage gap")
}

fn appended_variables(appended: &[&StorageEntry]) -> Finding {
    let labels: Vec<&str> = appended.iter().map(|e| e.label.as_str()).collect();
    let first = appended[0];
    Finding::new(
        "STOR-009",
        Severity::Medium,
        Confidence::High,
        format!("{} new variable(s) appended to the layout", appended.len()),
        format!(
            "new variables [{}] were appended after the old layout's last slot; appended \
             storage is layout-safe but starts uninitialized and deserves review",
            labels.join(", ")
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("appended", json!(labels))
    .with_detail("count", appended.len() as u64)
    .with_location(entry_location(first))
    .with_remediation("initialize appended variables in a reinitializer before first use")
}

fn gap_removed(old_gap: &StorageEntry) -> Finding {
    Finding::new(
        "STOR-008",
        Severity::High,
        Confidence::High,
        format!("Storage gap `{}` removed", old_gap.label),
        format!(
            "the gap at slot {} reserved {} slot(s) in the old layout and is gone from the \
             new one; future base-contract additions will collide with descendants",
            old_gap.slot,
            old_gap.gap_capacity().unwrap_or(0)
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("label", old_gap.label.as_str())
    .with_detail("capacity", old_gap.gap_capacity().unwrap_or(0))
    .with_location(entry_location(old_gap))
    .with_remediation("keep the gap declaration, shrinking it only by the number of slots consumed")
}

fn gap_insufficient(
    old_gap: &StorageEntry,
    new_gap: &StorageEntry,
    appended_count: u64,
    shortfall: u64,
) -> Finding {
    Finding::new(
        "STOR-007",
        Severity::High,
        Confidence::High,
        format!("Storage gap `{}` shrank more than variables were added", old_gap.label),
        format!(
            "the gap at slot {} went from {} to {} slot(s) while only {} variable(s) were \
             appended; {} reserved slot(s) leaked and descendants may collide",
            old_gap.slot,
            old_gap.gap_capacity().unwrap_or(0),
            new_gap.gap_capacity().unwrap_or(0),
            appended_count,
            shortfall
        ),
    )
    .with_analyzer(STORAGE_LAYOUT)
    .with_detail("old_capacity", old_gap.gap_capacity().unwrap_or(0))
    .with_detail("new_capacity", new_gap.gap_capacity().unwrap_or(0))
    .with_detail("appended_count", appended_count)
    .with_detail("shortfall", shortfall)
    .with_location(entry_location(old_gap))
    .with_remediation("shrink gaps by exactly the number of newly consumed slots")
}
