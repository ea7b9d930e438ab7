//! Process-wide stores of heavy data, shared between scenes by handle.

pub mod images;
