//! Detail screen core: single-note load/edit/save lifecycle.

pub mod session;
