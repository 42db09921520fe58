pub mod check;
pub mod claim;
pub mod fetch;
pub mod out;
pub mod transition;
