pub mod auth;
pub mod excel;
pub mod importer;
pub mod search;
