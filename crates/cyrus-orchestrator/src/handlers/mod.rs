pub mod created;
pub mod data_change;
pub mod prompted;
pub mod unassigned;
