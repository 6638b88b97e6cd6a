//! Integration tests for Sumi-Trawl
//!
//! These tests use wiremock to stand up mock sites and drive the crawler and
//! the batch pipeline end-to-end against them.

mod common;
mod crawler_tests;
mod image_tests;
mod pipeline_tests;
