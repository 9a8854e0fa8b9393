pub mod oauth;
pub mod verifier;
