pub mod clients;
pub mod invoices;
pub mod opportunities;
pub mod orders;
pub mod payments;
pub mod products;
pub mod quotes;
pub mod settings;
pub mod stats;
pub mod tools;
pub mod users;

pub use clients::*;
pub use invoices::*;
pub use opportunities::*;
pub use orders::*;
pub use payments::*;
pub use products::*;
pub use quotes::*;
pub use settings::*;
pub use stats::*;
pub use tools::*;
pub use users::*;
