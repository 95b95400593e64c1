pub mod response;

pub use response::{ApiResponse, ListResponse};
