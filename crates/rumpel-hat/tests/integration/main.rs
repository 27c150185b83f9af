//! Integration tests for rumpel-hat
//!
//! Uses wiremock to simulate a HAT and its satellite services and
//! verifies end-to-end behavior of token validation, note records,
//! file uploads, data plug checks and offer claims.

mod common;

mod test_data_plugs;
mod test_files;
mod test_notes;
mod test_token;
