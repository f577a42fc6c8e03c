pub mod http;
pub(crate) mod url;
