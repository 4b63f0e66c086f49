//! Command implementations, one module per subcommand.

pub mod add;
pub mod analyze;
pub mod components;
pub mod features;
pub mod list;
pub mod separate;
pub mod slices;
