pub mod bank_lv;
pub mod feed;
pub mod stub;

pub use feed::ParseError;
