pub mod auth;
pub mod db;
pub mod models;
pub mod openfoodfacts;
pub mod remote;
pub mod sync;
