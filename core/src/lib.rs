pub mod annotation;
pub mod clock;
pub mod error;
pub mod flow;
pub mod guard;
pub mod model;
pub mod notice;
pub mod sanitize;
pub mod selection;
pub mod session;
pub mod store;
