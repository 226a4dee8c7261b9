pub mod inflate;
pub mod stored;

pub use inflate::{inflate_stored, InflateError};
pub use stored::{stored_zlib_len, write_stored_zlib};
