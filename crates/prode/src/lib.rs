// Library root: the prediction pool application around prode-core.
//
// Config, bracket template loading, SQLite persistence, CSV import and text
// reports. The binary in main.rs is a thin command dispatcher over `app::Pool`.

pub mod app;
pub mod config;
pub mod db;
pub mod import;
pub mod report;
pub mod template;
