pub mod convert;
pub mod parse;
pub mod restart;
pub mod result;
pub mod show;
pub mod status;
