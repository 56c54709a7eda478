//! kontext CLI entry point
//!
//! Thin wrapper that delegates to the library.

use clap::Parser;

fn main() {
    // Configure miette for error reporting on stderr
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))
    .ok();

    let cli = kontext::Cli::parse();

    if let Err(e) = kontext::run(cli) {
        let report = miette::Report::msg(format!("{e:#}"));
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}
