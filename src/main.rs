fn main() {
    if let Err(err) = ch_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
