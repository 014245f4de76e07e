//! Policy stages that sit between callers and a terminal backend.

mod max_limit;
mod owner_scoped;
mod read_only;
mod validate;

pub use max_limit::{clamp_limit, MaxLimit};
pub use owner_scoped::OwnerScoped;
pub use read_only::ReadOnly;
pub use validate::Validate;
