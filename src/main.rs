//! # photo-search CLI
//!
//! Command-line interface for the PixaBay photo search client.
//!
//! ## Usage
//! ```bash
//! photo-search search "red panda" --pages 2
//! photo-search search fruits --output json
//! ```

mod cli;

use photo_search::Result;

fn main() -> Result<()> {
    photo_search::init_tracing();
    cli::run()
}
