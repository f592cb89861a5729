use std::path::Path;

use anyhow::{anyhow, Result};
use ns_core::Deadline;

use crate::types::{ReferenceStore, RemoteState};

/// Shared behavioral suite for `ReferenceStore` implementations.
pub fn run_reference_store_contract(store: &dyn ReferenceStore, sample: &Path, max_polls: u32) -> Result<()> {
    let deadline = Deadline::none();
    let uploaded = store.upload(sample, deadline)?;
    if uploaded.handle.is_empty() || uploaded.locator.is_empty() {
        return Err(anyhow!("upload must return a handle and a locator"));
    }

    let mut state = uploaded.state.clone();
    let mut polls = 0;
    while state == RemoteState::Processing {
        if polls >= max_polls {
            return Err(anyhow!("file still processing after {max_polls} polls"));
        }
        state = store.status(&uploaded.handle, deadline)?.state;
        polls += 1;
    }

    if !store.is_live(&uploaded.handle, deadline) {
        return Err(anyhow!("freshly uploaded handle {} is not live", uploaded.handle));
    }
    if store.is_live("files/does-not-exist", deadline) {
        return Err(anyhow!("unknown handle reported live"));
    }
    Ok(())
}
