// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-codec — External codec bridge.
//
// Optional decode capabilities (HEIC/HEIF today) live outside the process and
// are acquired on first use. The registry guarantees one acquisition per
// resource no matter how many conversions ask for it at once.

pub mod command;
pub mod registry;
pub mod traits;

pub use command::{CommandCodec, CommandCodecLoader};
pub use registry::{CodecRegistry, CodecState};
pub use traits::{CodecLoadError, CodecLoader, ExternalCodec, ExternalCodecError};
