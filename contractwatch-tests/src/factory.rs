mod contracts;
mod headers;
mod logs;
mod providers;

pub use contracts::*;
pub use headers::*;
pub use logs::*;
pub use providers::*;
