pub mod auth;
pub mod clients;
pub mod health;
pub mod invoices;
pub mod metrics;
pub mod opportunities;
pub mod orders;
pub mod payments;
pub mod products;
pub mod quotes;
pub mod settings;
pub mod stats;
pub mod tools;
pub mod users;
