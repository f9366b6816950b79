pub mod request;

pub use request::{AmCredentialFactory, AmCredentialRequest};
