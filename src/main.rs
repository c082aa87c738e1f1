fn main() {
    #[cfg(feature = "cli")]
    savestream::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("savestream: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
