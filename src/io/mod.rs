// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff (input/output, reading/writing) for reflection files and the
//! lists that point to them.

mod manifest;
mod reference;
pub mod xds_ascii;

pub use manifest::{read_path_list, ManifestError};
pub use reference::{read_reference, ReferenceError};
