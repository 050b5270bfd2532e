pub mod error;
pub mod query;
pub mod supabase;

pub use error::{is_conflict, DatabaseError};
pub use query::Query;
pub use supabase::SupabaseClient;
