//! List screen core: search/favorites composition over live queries.

pub mod coordinator;
