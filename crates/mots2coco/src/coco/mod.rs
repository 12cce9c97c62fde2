// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # COCO Document Support
//!
//! The output side of a MOTS conversion: the serde model of a COCO instance
//! document, JSON/ZIP writers and readers, and a structural verifier.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mots2coco::coco::{CocoReader, verify_document};
//!
//! let document = CocoReader::new().read_json("annotations/train.json")?;
//! let report = verify_document(&document);
//! println!("{}", report);
//! # Ok::<(), mots2coco::Error>(())
//! ```

mod reader;
mod types;
mod verify;
mod writer;

pub use types::{
    CocoAnnotation, CocoCategory, CocoCompressedRle, CocoDocument, CocoImage, CocoIndex,
};

pub use reader::{CocoReadOptions, CocoReader};
pub use verify::{VerificationReport, verify_document};
pub use writer::{CocoWriteOptions, CocoWriter, ZIP_ANNOTATIONS_ENTRY};
