//! Content-to-PDF rendering pipeline.
//!
//! A validated [`model::Document`] (text and image blocks plus page
//! geometry) is preprocessed, flowed across pages by the layout engine and
//! serialized into PDF bytes:
//!
//! ```no_run
//! use pdf_compose::model::{Block, Document, PageSpec};
//! use pdf_compose::pipeline::Renderer;
//!
//! let document = Document::new(PageSpec::default())
//!     .with_block(Block::text("Hello, PDF!"));
//! let rendered = Renderer::default().render(&document)?;
//! std::fs::write("hello.pdf", &rendered.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The pipeline is a pure, synchronous transformation with no I/O of its
//! own; HTTP transport, worker lifecycle and timeouts belong to the service
//! boundary that embeds this crate.

pub mod error;
pub mod fonts;
pub mod images;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod writer;
