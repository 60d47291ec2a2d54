pub mod ls;
pub mod sweep;
pub mod url;
