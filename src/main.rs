//! Binary entry point for `refhash-build`.
//!
//! Handles post-parse dispatch between the two top-level operating modes:
//! building a hash table from a reference FASTA (`--build-hash-table`), or
//! decompressing an already-built `hash_table.cmp` in place (`--ht-uncompress`,
//! paired with `--ref-dir`). All resources are released by Rust's RAII; there
//! is no explicit cleanup section.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use refhash::options::BuildArgs;
use refhash::{diag, display, displaylevel};

fn run(args: BuildArgs) -> Result<(), refhash::BuildError> {
    displaylevel!(
        3,
        "*** refhash-build {} ***\n",
        env!("CARGO_PKG_VERSION")
    );

    if args.ht_uncompress {
        let ref_dir = args
            .ref_dir
            .as_deref()
            .ok_or_else(|| refhash::BuildError::Validation("--ht-uncompress requires --ref-dir".into()))?;
        let prefix = args.output_file_prefix.as_deref().ok_or_else(|| {
            refhash::BuildError::Validation("--ht-uncompress requires --output-file-prefix".into())
        })?;
        let num_threads = if args.ht_num_threads > 0 {
            args.ht_num_threads
        } else {
            refhash::config::default_num_threads()
        };
        return refhash::run_uncompress(Path::new(ref_dir), prefix, num_threads);
    }

    let config = refhash::resolve(&args)?;
    if config.dump_int_params {
        displaylevel!(2, "{:#?}\n", config);
    }
    refhash::run_build(&config)
}

fn main() -> ExitCode {
    let args = BuildArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diag::set_display_level(diag::display_level().max(1));
            display!("refhash-build: {e}\n");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
