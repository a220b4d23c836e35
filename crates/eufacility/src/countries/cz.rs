//! Czechia. Everything else comes from the sidecar, including the combined
//! `GPS` coordinate column.

use crate::facility::CountryOverride;

pub(super) fn healthcare() -> CountryOverride {
    CountryOverride::new("CZ")
}
