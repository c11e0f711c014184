//! Fuzz target for census CSV parsing and derived-column projection.

#![no_main]

use ad_core::census::DerivedCountProjector;
use ad_core::forecast::DEFAULT_COLUMNS;
use ad_core::table::Table;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(table) = Table::from_reader(data) else {
        return;
    };
    for smooth in [true, false] {
        let projector = DerivedCountProjector::new(DEFAULT_COLUMNS, smooth);
        let _ = projector.project_table(&table);
    }
});
