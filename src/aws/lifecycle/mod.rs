//! Resource lifecycle helpers for the AWS backend.

mod cleanup;
mod create;
mod seed;
mod wait;
