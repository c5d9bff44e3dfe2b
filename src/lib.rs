// PII Detector - Personal data classifier for public-records requests
// Copyright (c) 2025 PII Detector Contributors
// Licensed under the MIT License

//! # PII Detector
//!
//! Flags free-text access-to-information requests (Portuguese, Brazilian
//! public administration) that contain personal data and therefore should
//! not be published.
//!
//! ## Overview
//!
//! Each request is split into overlapping word fragments and checked by
//! independent detectors:
//! - **email**, **cpf**, **telefone** and **rg** through validated patterns
//! - **endereco** through address keywords followed by a number or CEP
//! - **nome** through a weighted-token scorer backed by a persistent weight
//!   table, optionally enriched by name lexicons and remote services
//!
//! An aggregation policy turns the per-field signals into `nao_publico` and
//! names the dominant detector.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Run orchestration, verdict cache, evidence log and report
//! - [`detection`] - Fragmenter, detectors, name scorer and aggregator
//! - [`evaluation`] - Precision, recall and F1 against a gold standard
//! - [`adapters`] - CSV input/output and HTTP clients
//! - [`domain`] - Records, flags, evidence and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pii_detector::config::load_config;
//! use pii_detector::core::ClassificationEngine;
//! use pii_detector::domain::Record;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("pii-detector.toml")?;
//!     let engine = ClassificationEngine::from_config(&config)?;
//!
//!     let record = Record::with_text("1", "Meu CPF é 529.982.247-25");
//!     let classification = engine.classify_one(&record).await?;
//!
//!     assert!(classification.flags.nao_publico);
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through `tracing`; install a subscriber with
//! [`logging::init_logging`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod detection;
pub mod domain;
pub mod evaluation;
pub mod logging;
