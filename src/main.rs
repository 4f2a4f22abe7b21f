//! # photosift CLI
//!
//! Command-line interface for the photo sifter.
//!
//! ## Usage
//! ```bash
//! photosift scan ~/Pictures
//! photosift resolve ~/Pictures --keep ~/Pictures/2023/IMG_0001.jpg
//! photosift organize ~/Incoming --into ~/Library --apply
//! ```

mod cli;

use photo_sifter::Result;

fn main() -> Result<()> {
    cli::run()
}
