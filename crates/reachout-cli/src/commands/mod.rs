mod check;
mod migrate;

pub use check::CheckCommand;
pub use migrate::MigrateCommand;
