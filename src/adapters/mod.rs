// Adapters layer: concrete implementations for the file, table and HTTP boundaries.

pub mod csv_file;
pub mod delimited;
pub mod http;
pub mod table;
