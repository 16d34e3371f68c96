//!
//! Sentinel-padded script tables. A guard lists the distinct locking scripts of
//! the asset types it conserves, left-packed, with every unused slot `i` holding
//! the placeholder `SCRIPT_TABLE_SENTINELS[i]`.
//!

use crate::{
    constants::{GUARD_TOKEN_TYPE_MAX, SCRIPT_TABLE_SENTINELS},
    error::CovenantError,
    result::CovenantResult,
};
use cat_consensus_core::tx::ScriptPublicKey;

pub type ScriptTable = [ScriptPublicKey; GUARD_TOKEN_TYPE_MAX];

pub fn sentinel_script(slot: usize) -> ScriptPublicKey {
    ScriptPublicKey::from_vec(SCRIPT_TABLE_SENTINELS[slot].to_vec())
}

fn is_sentinel(script: &ScriptPublicKey) -> bool {
    SCRIPT_TABLE_SENTINELS.iter().any(|sentinel| script.script() == sentinel)
}

/// Left-packs `scripts` into a table, padding with placeholders.
pub fn build_script_table(scripts: &[ScriptPublicKey]) -> CovenantResult<ScriptTable> {
    if scripts.is_empty() || scripts.len() > GUARD_TOKEN_TYPE_MAX {
        return Err(CovenantError::InvalidScriptTable("unsupported number of types"));
    }
    let table = std::array::from_fn(|slot| scripts.get(slot).cloned().unwrap_or_else(|| sentinel_script(slot)));
    active_type_count(&table)?;
    Ok(table)
}

/// Number of real scripts in the table. Real entries must be left-packed, distinct
/// and never placeholders; every slot past them must hold its own placeholder.
pub fn active_type_count(table: &ScriptTable) -> CovenantResult<usize> {
    let active = table.iter().take_while(|script| !is_sentinel(script)).count();
    if active == 0 {
        return Err(CovenantError::InvalidScriptTable("no active type"));
    }
    for (slot, script) in table.iter().enumerate().skip(active) {
        if script.script() != SCRIPT_TABLE_SENTINELS[slot] {
            return Err(CovenantError::InvalidScriptTable("real script after a placeholder"));
        }
    }
    for i in 0..active {
        for j in i + 1..active {
            if table[i] == table[j] {
                return Err(CovenantError::InvalidScriptTable("duplicate script"));
            }
        }
    }
    Ok(active)
}

/// Position of `script` among the real entries of the table.
pub fn script_index(table: &ScriptTable, script: &ScriptPublicKey) -> Option<usize> {
    table.iter().take_while(|entry| !is_sentinel(entry)).position(|entry| entry == script)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(byte: u8) -> ScriptPublicKey {
        ScriptPublicKey::from_vec(vec![0x51, 0x20].into_iter().chain([byte; 32]).collect())
    }

    #[test]
    fn test_table_validation() {
        let table = build_script_table(&[script(1), script(2)]).unwrap();
        assert_eq!(active_type_count(&table), Ok(2));
        assert_eq!(table[2], sentinel_script(2));
        assert_eq!(script_index(&table, &script(2)), Some(1));
        assert_eq!(script_index(&table, &sentinel_script(3)), None);

        assert!(build_script_table(&[]).is_err());
        assert!(build_script_table(&[script(1), script(1)]).is_err());

        // gap before a real script
        let gap = [script(1), sentinel_script(1), script(3), sentinel_script(3)];
        assert!(active_type_count(&gap).is_err());

        // placeholder in the wrong slot
        let shifted = [script(1), sentinel_script(2), sentinel_script(2), sentinel_script(3)];
        assert!(active_type_count(&shifted).is_err());

        let full = [script(1), script(2), script(3), script(4)];
        assert_eq!(active_type_count(&full), Ok(4));
        assert!(build_script_table(&[script(1), script(2), script(3), script(4), script(5)]).is_err());
    }
}
